//! Market valuation tool

use super::industry::industry_averages;
use super::{MarketData, info_map, info_str, no_data, num, parse_symbol, symbol_schema};
use crate::api::{SpotRow, TickerInfo, value_as_f64};
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const NOTE_WITH_RATIOS: &str = "PE和PB数据来自yfinance备用接口（若akshare不可用）";
const NOTE_WITHOUT_RATIOS: &str =
    "PE和PB数据暂时不可用，如需完整估值数据请检查网络连接或使用其他数据源";
const NOTE_FALLBACK: &str = "数据来自yfinance备用接口（akshare失败），经过重试机制获取";

/// Share of market cap assumed to float when the provider gives no float
const FLOAT_RATIO_ESTIMATE: f64 = 0.7;

/// Price, PE/PB, EPS, market cap and industry averages for one symbol
pub struct MarketValuationTool {
    market: Arc<MarketData>,
}

impl MarketValuationTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }

    async fn valuation(&self, code: &str) -> AgentResult<Value> {
        match self.market.primary.individual_info(code).await {
            Ok(items) => Ok(self.from_primary(code, &info_map(&items)).await),
            Err(e) => {
                warn!(code, error = %e, "Primary info failed, using secondary provider");
                match self.market.fallback.ticker_info(code).await {
                    Some(info) => Ok(self.from_secondary(code, &info).await),
                    None => Err(no_data(code, "market valuation", &e)),
                }
            }
        }
    }

    async fn from_primary(&self, code: &str, info: &serde_json::Map<String, Value>) -> Value {
        let spot = match self.market.primary.spot_table().await {
            Ok(rows) => filter_spot(&rows, code).cloned(),
            Err(e) => {
                warn!(code, error = %e, "Spot table unavailable");
                None
            }
        };
        let ticker = self.market.fallback.ticker_info(code).await;
        debug!(code, spot = spot.is_some(), ticker = ticker.is_some(), "Valuation sources");

        let from_ticker = |key: &str| ticker.as_ref().and_then(|t| t.f64(key));
        let pe_ttm = spot.as_ref().and_then(|s| s.pe_ttm).or_else(|| from_ticker("trailingPE"));
        let pb = spot.as_ref().and_then(|s| s.pb).or_else(|| from_ticker("priceToBook"));
        let latest_price = spot
            .as_ref()
            .and_then(|s| s.latest_price)
            .or_else(|| info.get("最新").and_then(value_as_f64));
        let name = spot
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| info_str(info, "股票简称"));

        let industry = info_str(info, "行业");
        let averages = industry_averages(self.market.primary.as_ref(), code, &industry).await;

        let note = if pe_ttm.is_some() && pb.is_some() {
            NOTE_WITH_RATIOS
        } else {
            NOTE_WITHOUT_RATIOS
        };

        json!({
            "symbol": code,
            "name": name,
            "latest_price": num(latest_price),
            "pe_ttm": num(pe_ttm),
            "pb": num(pb),
            "eps_ttm": num(from_ticker("trailingEps")),
            "eps_forward": num(from_ticker("forwardEps")),
            "market_cap": num(info.get("总市值").and_then(value_as_f64)),
            "circulating_market_cap": num(info.get("流通市值").and_then(value_as_f64)),
            "industry_averages": averages,
            "note": note,
        })
    }

    async fn from_secondary(&self, code: &str, info: &TickerInfo) -> Value {
        let price = info.first_f64(&["regularMarketPrice", "currentPrice"]);
        let market_cap = info.f64("marketCap");
        let circulating = match (info.f64("floatShares"), price) {
            (Some(shares), Some(price)) => Some(shares * price),
            _ => market_cap.map(|cap| cap * FLOAT_RATIO_ESTIMATE),
        };
        let industry = info.first_str(&["industry", "sector"]).unwrap_or_default();
        let averages = industry_averages(self.market.primary.as_ref(), code, industry).await;

        json!({
            "symbol": code,
            "name": info.first_str(&["longName", "shortName"]).unwrap_or_default(),
            "latest_price": num(price),
            "pe_ttm": num(info.f64("trailingPE")),
            "pb": num(info.f64("priceToBook")),
            "eps_ttm": num(info.f64("trailingEps")),
            "eps_forward": num(info.f64("forwardEps")),
            "market_cap": num(market_cap),
            "circulating_market_cap": num(circulating),
            "industry_averages": averages,
            "note": NOTE_FALLBACK,
        })
    }
}

/// The spot row for `code`; the provider only serves the whole market
pub fn filter_spot<'a>(rows: &'a [SpotRow], code: &str) -> Option<&'a SpotRow> {
    rows.iter().find(|row| row.code == code)
}

#[async_trait]
impl Tool for MarketValuationTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        self.valuation(&code).await
    }

    fn name(&self) -> &str {
        "get_market_valuation"
    }

    fn description(&self) -> &str {
        "获取A股股票的估值数据：最新价、市盈率(TTM)、市净率、每股收益、总市值、流通市值，\
         以及所属行业的平均估值与成长性指标"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
