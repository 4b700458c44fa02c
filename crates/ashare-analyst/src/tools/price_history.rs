//! Recent price history tool

use super::{MarketData, no_data, num, parse_symbol, symbol_schema};
use crate::api::{DailyBar, HistoryRange};
use crate::error::StockError;
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

/// Sessions handed to the model
pub const MAX_SESSIONS: usize = 30;

const NOTE_FALLBACK: &str = "价格历史数据来自yfinance备用接口（akshare失败）";

pub struct PriceHistoryTool {
    market: Arc<MarketData>,
}

impl PriceHistoryTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }

    async fn history(&self, code: &str) -> AgentResult<Value> {
        let primary_error = match self.market.primary.daily_history(code, MAX_SESSIONS).await {
            Ok(bars) if !bars.is_empty() => {
                let bars = recent_sessions(bars);
                let latest = bars.first().map(|b| b.close);
                return Ok(history_value(code, &bars, latest));
            }
            Ok(_) => StockError::unavailable(code, "no sessions"),
            Err(e) => e,
        };

        warn!(code, error = %primary_error, "Primary history failed, using secondary provider");
        let Some(bars) = self.market.fallback.history(code, HistoryRange::OneMonth).await else {
            return Err(no_data(code, "price history", &primary_error));
        };
        let bars = recent_sessions(bars);
        let latest = self
            .market
            .fallback
            .ticker_info(code)
            .await
            .and_then(|info| info.first_f64(&["regularMarketPrice", "currentPrice"]))
            .or_else(|| bars.first().map(|b| b.close));

        let mut out = history_value(code, &bars, latest);
        out["note"] = json!(NOTE_FALLBACK);
        Ok(out)
    }
}

/// Newest first, at most [`MAX_SESSIONS`]
pub fn recent_sessions(mut bars: Vec<DailyBar>) -> Vec<DailyBar> {
    bars.sort_by(|a, b| b.date.cmp(&a.date));
    bars.truncate(MAX_SESSIONS);
    bars
}

fn history_value(code: &str, bars: &[DailyBar], latest_price: Option<f64>) -> Value {
    let records: Vec<Value> = bars
        .iter()
        .map(|bar| {
            json!({
                "date": bar.date,
                "open": bar.open,
                "close": bar.close,
                "high": bar.high,
                "low": bar.low,
                "volume": bar.volume,
                "change_percent": num(bar.change_percent),
            })
        })
        .collect();
    json!({
        "symbol": code,
        "count": records.len(),
        "price_history": records,
        "latest_price": num(latest_price),
    })
}

#[async_trait]
impl Tool for PriceHistoryTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        self.history(&code).await
    }

    fn name(&self) -> &str {
        "get_price_history"
    }

    fn description(&self) -> &str {
        "获取A股股票最近30个交易日的价格历史（日期、开盘、收盘、最高、最低、成交量、涨跌幅）"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
