//! Risk indicators tool

use super::{MarketData, num, parse_symbol, symbol_schema};
use crate::api::TickerInfo;
use crate::error::StockError;
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

const NOTE: &str = "风险指标数据来自yfinance接口";

pub struct RiskIndicatorsTool {
    market: Arc<MarketData>,
}

impl RiskIndicatorsTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }
}

/// 52-week range as a percentage of the low
pub fn range_volatility(high: Option<f64>, low: Option<f64>) -> Option<f64> {
    match (high, low) {
        (Some(high), Some(low)) if high != low && low != 0.0 => Some((high - low) / low * 100.0),
        _ => None,
    }
}

fn risk_value(code: &str, info: &TickerInfo) -> Value {
    let high = info.f64("fiftyTwoWeekHigh");
    let low = info.f64("fiftyTwoWeekLow");
    json!({
        "symbol": code,
        "beta": num(info.f64("beta")),
        "debt_to_equity": num(info.f64("debtToEquity")),
        "current_ratio": num(info.f64("currentRatio")),
        "quick_ratio": num(info.f64("quickRatio")),
        "total_debt": num(info.f64("totalDebt")),
        "earnings_growth": num(info.f64("earningsGrowth")),
        "revenue_growth": num(info.f64("revenueGrowth")),
        "volatility_percent": num(range_volatility(high, low)),
        "fifty_two_week_high": num(high),
        "fifty_two_week_low": num(low),
        "note": NOTE,
    })
}

#[async_trait]
impl Tool for RiskIndicatorsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        match self.market.fallback.ticker_info(&code).await {
            Some(info) => Ok(risk_value(&code, &info)),
            None => Err(StockError::unavailable(
                &code,
                "risk indicators: the secondary provider returned nothing",
            )
            .into()),
        }
    }

    fn name(&self) -> &str {
        "get_risk_indicators"
    }

    fn description(&self) -> &str {
        "获取A股股票的风险指标：贝塔系数、资产负债比、流动比率、速动比率、总负债、盈利与营收增长率、52周波动幅度"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
