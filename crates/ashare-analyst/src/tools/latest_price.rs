//! Latest quote tool

use super::{MarketData, num, parse_symbol, symbol_schema};
use crate::api::{DailyBar, HistoryRange, TickerInfo};
use crate::error::StockError;
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

const NOTE: &str = "实时价格数据来自yfinance接口";
const NOTE_PRIMARY: &str = "yfinance接口不可用，价格数据来自akshare日线数据";

const SHORT_WINDOW: usize = 50;
const LONG_WINDOW: usize = 200;

/// Quote, volume, beta and moving averages
pub struct LatestPriceTool {
    market: Arc<MarketData>,
}

impl LatestPriceTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }

    async fn latest(&self, code: &str) -> AgentResult<Value> {
        if let Some(info) = self.market.fallback.ticker_info(code).await {
            let closes = self
                .market
                .fallback
                .history(code, HistoryRange::OneYear)
                .await
                .map(|bars| closes(&bars))
                .unwrap_or_default();
            return Ok(from_ticker(code, &info, &closes));
        }

        warn!(code, "Secondary quote unavailable, using primary daily bars");
        let bars = self
            .market
            .primary
            .daily_history(code, LONG_WINDOW)
            .await
            .map_err(|e| {
                StockError::unavailable(code, format!("latest price: no quote from either provider ({e})"))
            })?;
        let Some(last) = bars.last() else {
            return Err(StockError::unavailable(code, "latest price: no sessions").into());
        };
        let closes = closes(&bars);

        Ok(json!({
            "symbol": code,
            "latest_price": last.close,
            "change_percent": num(last.change_percent),
            "volume": last.volume,
            "beta": 0.0,
            "avg_volume": num(average(bars.iter().map(|b| b.volume))),
            "market_cap": 0.0,
            "moving_average_50": num(moving_average(&closes, SHORT_WINDOW)),
            "moving_average_200": num(moving_average(&closes, LONG_WINDOW)),
            "note": NOTE_PRIMARY,
        }))
    }
}

fn from_ticker(code: &str, info: &TickerInfo, closes: &[f64]) -> Value {
    let price = info.first_f64(&["regularMarketPrice", "currentPrice"]);
    let ma50 = moving_average(closes, SHORT_WINDOW).or_else(|| info.f64("fiftyDayAverage"));
    let ma200 = moving_average(closes, LONG_WINDOW).or_else(|| info.f64("twoHundredDayAverage"));

    json!({
        "symbol": code,
        "latest_price": num(price),
        "change_percent": num(change_percent(info, price)),
        "volume": num(info.first_f64(&["regularMarketVolume", "volume"])),
        "beta": num(info.f64("beta")),
        "avg_volume": num(info.f64("averageVolume")),
        "market_cap": num(info.f64("marketCap")),
        "moving_average_50": num(ma50),
        "moving_average_200": num(ma200),
        "note": NOTE,
    })
}

/// Percent change against the previous close
///
/// `regularMarketChangePercent` arrives as a fraction from quoteSummary.
fn change_percent(info: &TickerInfo, price: Option<f64>) -> Option<f64> {
    let pct = match (price, info.f64("previousClose")) {
        (Some(price), Some(prev)) if prev != 0.0 => Some((price - prev) / prev * 100.0),
        _ => info.f64("regularMarketChangePercent").map(|f| f * 100.0),
    };
    pct.map(round2)
}

fn closes(bars: &[DailyBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Mean of the last `window` closes; `None` with fewer closes than that
pub fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    average(closes[closes.len() - window..].iter().copied()).map(round2)
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl Tool for LatestPriceTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        self.latest(&code).await
    }

    fn name(&self) -> &str {
        "get_latest_price"
    }

    fn description(&self) -> &str {
        "获取A股股票的最新行情：最新价、涨跌幅、成交量、平均成交量、贝塔系数、总市值，以及50日和200日均线"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FakeFallback, FakePrimary, market_data, ticker_info};

    #[test]
    fn test_moving_average() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(moving_average(&closes, 4), Some(8.5));
        assert_eq!(moving_average(&closes, 10), Some(5.5));
        assert_eq!(moving_average(&closes, 11), None);
        assert_eq!(moving_average(&closes, 0), None);
    }

    #[test]
    fn test_change_percent_sources() {
        let info = ticker_info(json!({"previousClose": 100.0, "regularMarketChangePercent": 0.5}));
        assert_eq!(change_percent(&info, Some(102.0)), Some(2.0));
        assert_eq!(change_percent(&info, None), Some(50.0));
        assert_eq!(change_percent(&TickerInfo::default(), Some(1.0)), None);
    }

    #[tokio::test]
    async fn test_secondary_quote_with_history_averages() {
        let tool = LatestPriceTool::new(market_data(FakePrimary::moutai(), FakeFallback::moutai()));
        let out = tool.execute(json!({"symbol": "600519"})).await.unwrap();

        assert_eq!(out["latest_price"], 1520.5);
        assert_eq!(out["change_percent"], 1.37);
        assert_eq!(out["volume"], 2_800_000.0);
        assert_eq!(out["beta"], 0.82);
        // 250 fixture closes from 1400 to 1649
        assert_eq!(out["moving_average_50"], 1624.5);
        assert_eq!(out["moving_average_200"], 1549.5);
        assert_eq!(out["note"], NOTE);
    }

    #[tokio::test]
    async fn test_averages_from_info_without_history() {
        let fallback = FakeFallback {
            history: None,
            ..FakeFallback::moutai()
        };
        let tool = LatestPriceTool::new(market_data(FakePrimary::moutai(), fallback));
        let out = tool.execute(json!({"symbol": "600519"})).await.unwrap();

        assert_eq!(out["moving_average_50"], 1480.0);
        assert_eq!(out["moving_average_200"], 1550.0);
    }

    #[tokio::test]
    async fn test_primary_bars_when_secondary_down() {
        let tool = LatestPriceTool::new(market_data(FakePrimary::moutai(), FakeFallback::failing()));
        let out = tool.execute(json!({"symbol": "600519"})).await.unwrap();

        assert_eq!(out["latest_price"], 1459.0);
        assert_eq!(out["moving_average_50"], 1434.5);
        assert_eq!(out["moving_average_200"], 0.0);
        assert_eq!(out["note"], NOTE_PRIMARY);
    }

    #[tokio::test]
    async fn test_no_quote_anywhere() {
        let tool = LatestPriceTool::new(market_data(FakePrimary::failing(), FakeFallback::failing()));
        assert!(tool.execute(json!({"symbol": "600519"})).await.is_err());
    }
}
