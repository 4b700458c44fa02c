//! Market data providers
//!
//! The primary provider ([`EastmoneyClient`]) serves the A-share tables the
//! tools are built from. The secondary provider ([`YahooClient`]) fills
//! gaps and is always called through [`crate::retry::RetryingFallback`].
//!
//! Both sit behind traits so the tools can be exercised with fixtures.

pub mod eastmoney;
pub mod symbol;
pub mod yahoo;

pub use eastmoney::EastmoneyClient;
pub use symbol::Exchange;
pub use yahoo::YahooClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One label/value pair of the per-symbol info table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoItem {
    pub item: String,
    pub value: Value,
}

impl InfoItem {
    pub fn new(item: impl Into<String>, value: Value) -> Self {
        Self {
            item: item.into(),
            value,
        }
    }
}

/// One row of the full-market spot table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRow {
    pub code: String,
    pub name: String,
    pub latest_price: Option<f64>,
    pub pe_ttm: Option<f64>,
    pub pb: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Key ratios for one reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRow {
    /// `YYYY-MM-DD`
    pub report_date: String,
    pub roe: Option<f64>,
    pub gross_margin: Option<f64>,
    pub net_profit_growth: Option<f64>,
    pub total_revenue: Option<f64>,
    pub net_profit: Option<f64>,
}

/// One daily session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// `YYYY-MM-DD`
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub change_percent: Option<f64>,
}

/// Peer-group comparison tables for a symbol's industry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerTables {
    pub growth: Vec<Map<String, Value>>,
    pub valuation: Vec<Map<String, Value>>,
}

/// Flattened ticker info from the secondary provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickerInfo(pub Map<String, Value>);

impl TickerInfo {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_f64)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// First numeric value among `keys`
    pub fn first_f64(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.f64(k))
    }

    /// First string value among `keys`
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.str(k))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stub payload Yahoo returns for symbols it has no data for
    pub fn is_degenerate(&self) -> bool {
        self.0.len() <= 1 && self.0.contains_key("trailingPegRatio")
    }
}

/// How far back a history request reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRange {
    OneMonth,
    OneYear,
}

impl HistoryRange {
    pub fn days(self) -> i64 {
        match self {
            Self::OneMonth => 31,
            Self::OneYear => 366,
        }
    }
}

/// Primary A-share data source
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    /// Label/value info table for one symbol
    async fn individual_info(&self, code: &str) -> Result<Vec<InfoItem>>;

    /// Spot quotes for the whole market; there is no per-symbol query
    async fn spot_table(&self) -> Result<Vec<SpotRow>>;

    /// Financial indicators, in whatever order the provider returns them
    async fn financial_indicators(&self, code: &str) -> Result<Vec<FinancialRow>>;

    /// Forward-adjusted daily bars, oldest first
    async fn daily_history(&self, code: &str, sessions: usize) -> Result<Vec<DailyBar>>;

    async fn industry_comparison(&self, code: &str) -> Result<PeerTables>;
}

/// Secondary, general-purpose market data source
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    async fn ticker_info(&self, code: &str) -> Result<TickerInfo>;

    /// Daily bars, oldest first
    async fn history(&self, code: &str, range: HistoryRange) -> Result<Vec<DailyBar>>;
}

/// Numeric value from a JSON number or a numeric string
///
/// Providers send `"-"` or `""` for missing figures; those map to `None`.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
