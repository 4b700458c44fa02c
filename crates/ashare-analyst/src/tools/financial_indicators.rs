//! Financial indicators tool

use super::{MarketData, no_data, num, parse_symbol, symbol_schema};
use crate::api::{FinancialRow, TickerInfo};
use crate::error::StockError;
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

/// Most recent reporting periods handed to the model
pub const MAX_PERIODS: usize = 4;

const NOTE_FALLBACK: &str = "财务指标来自yfinance备用接口（akshare失败），仅提供最新数据";

pub struct FinancialIndicatorsTool {
    market: Arc<MarketData>,
}

impl FinancialIndicatorsTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }

    async fn indicators(&self, code: &str) -> AgentResult<Value> {
        let primary_error = match self.market.primary.financial_indicators(code).await {
            Ok(rows) if !rows.is_empty() => {
                let records: Vec<Value> = latest_periods(rows).iter().map(record).collect();
                return Ok(json!({
                    "symbol": code,
                    "count": records.len(),
                    "financial_indicators": records,
                }));
            }
            Ok(_) => StockError::unavailable(code, "no reporting periods"),
            Err(e) => e,
        };

        warn!(code, error = %primary_error, "Primary financials failed, using secondary provider");
        match self.market.fallback.ticker_info(code).await {
            Some(info) => Ok(from_secondary(code, &info)),
            None => Err(no_data(code, "financial indicators", &primary_error)),
        }
    }
}

/// Newest first, at most [`MAX_PERIODS`]
pub fn latest_periods(mut rows: Vec<FinancialRow>) -> Vec<FinancialRow> {
    rows.sort_by(|a, b| b.report_date.cmp(&a.report_date));
    rows.truncate(MAX_PERIODS);
    rows
}

fn record(row: &FinancialRow) -> Value {
    json!({
        "date": row.report_date,
        "roe": num(row.roe),
        "gross_margin": num(row.gross_margin),
        "net_profit_growth": num(row.net_profit_growth),
        "total_revenue": num(row.total_revenue),
        "net_profit": num(row.net_profit),
    })
}

fn from_secondary(code: &str, info: &TickerInfo) -> Value {
    json!({
        "symbol": code,
        "count": 1,
        "financial_indicators": [{
            "date": "",
            "roe": num(info.f64("returnOnEquity")),
            "gross_margin": num(info.f64("grossMargins")),
            "net_profit_growth": 0.0,
            "total_revenue": num(info.f64("totalRevenue")),
            "net_profit": num(info.f64("netIncomeToCommon")),
        }],
        "note": NOTE_FALLBACK,
    })
}

#[async_trait]
impl Tool for FinancialIndicatorsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        self.indicators(&code).await
    }

    fn name(&self) -> &str {
        "get_financial_indicators"
    }

    fn description(&self) -> &str {
        "获取A股上市公司最近四个报告期的主要财务指标：净资产收益率、毛利率、净利润增长率、营业收入、净利润"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
