//! Data-fetch tools exposed to the analyst model
//!
//! Every tool takes `{ "symbol": "<six-digit code>" }` and returns a flat
//! JSON object ready to drop into the conversation. A tool fails only when
//! the symbol is malformed or when neither provider produced any data.

pub mod company_info;
pub mod financial_indicators;
pub mod industry;
pub mod latest_price;
pub mod market_valuation;
pub mod price_history;
pub mod risk_indicators;

pub use company_info::CompanyInfoTool;
pub use financial_indicators::FinancialIndicatorsTool;
pub use latest_price::LatestPriceTool;
pub use market_valuation::MarketValuationTool;
pub use price_history::PriceHistoryTool;
pub use risk_indicators::RiskIndicatorsTool;

use crate::api::symbol::validate_code;
use crate::api::{InfoItem, PrimaryProvider};
use crate::error::StockError;
use crate::retry::RetryingFallback;
use ashare_llm::tools::schema;
use ashare_tools::{Tool, ToolRegistry};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Both providers, shared by every tool
pub struct MarketData {
    pub primary: Arc<dyn PrimaryProvider>,
    pub fallback: RetryingFallback,
}

impl MarketData {
    pub fn new(primary: Arc<dyn PrimaryProvider>, fallback: RetryingFallback) -> Self {
        Self { primary, fallback }
    }
}

/// The six market-data tools, in the order the prompt lists them
pub fn market_tools(market: &Arc<MarketData>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(MarketValuationTool::new(market.clone())),
        Arc::new(CompanyInfoTool::new(market.clone())),
        Arc::new(FinancialIndicatorsTool::new(market.clone())),
        Arc::new(PriceHistoryTool::new(market.clone())),
        Arc::new(LatestPriceTool::new(market.clone())),
        Arc::new(RiskIndicatorsTool::new(market.clone())),
    ]
}

/// Registry holding every market-data tool
pub fn market_registry(market: &Arc<MarketData>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    for tool in market_tools(market) {
        registry.register(tool);
    }
    registry
}

#[derive(Debug, Deserialize)]
struct SymbolParams {
    symbol: String,
}

/// Extract and validate the `symbol` argument
pub(crate) fn parse_symbol(params: Value) -> ashare_core::Result<String> {
    let params: SymbolParams = serde_json::from_value(params).map_err(|e| {
        ashare_core::Error::InvalidInput(format!("Invalid parameters: {e}"))
    })?;
    Ok(validate_code(&params.symbol)?.to_string())
}

/// Input schema shared by all tools
pub(crate) fn symbol_schema() -> Value {
    schema::object(
        json!({ "symbol": schema::pattern("六位A股股票代码，例如 600519", "^[0-9]{6}$") }),
        vec!["symbol"],
    )
}

/// Label/value table as a map; missing values become `""`
pub(crate) fn info_map(items: &[InfoItem]) -> Map<String, Value> {
    items
        .iter()
        .map(|item| {
            let value = if item.value.is_null() {
                json!("")
            } else {
                item.value.clone()
            };
            (item.item.clone(), value)
        })
        .collect()
}

/// String form of a label in the info map
pub(crate) fn info_str(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Numbers the model receives; missing figures read as 0
pub(crate) fn num(value: Option<f64>) -> Value {
    json!(value.unwrap_or(0.0))
}

/// Error for "both providers came back empty"
pub(crate) fn no_data(code: &str, what: &str, primary_error: &StockError) -> ashare_core::Error {
    StockError::unavailable(
        code,
        format!("{what}: primary provider failed ({primary_error}) and the secondary provider returned nothing"),
    )
    .into()
}
