//! Per-run context
//!
//! A small key-value store handed to [`crate::Agent::process`]. The analyst
//! records the stock code and the model it used; callers may add their own
//! entries.

use std::collections::HashMap;

/// Well-known context keys
pub mod keys {
    /// Six-digit A-share code being analysed
    pub const STOCK_CODE: &str = "stock_code";
    /// Model identifier used for the run
    pub const MODEL: &str = "model";
    /// Report date (`YYYYMMDD`)
    pub const REPORT_DATE: &str = "report_date";
}

/// Context passed to agents during execution
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stock_code(&self) -> Option<&str> {
        self.get(keys::STOCK_CODE).and_then(|v| v.as_str())
    }

    pub fn set_stock_code(&mut self, code: impl Into<String>) {
        self.insert(keys::STOCK_CODE, serde_json::json!(code.into()));
    }

    pub fn model(&self) -> Option<&str> {
        self.get(keys::MODEL).and_then(|v| v.as_str())
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.insert(keys::MODEL, serde_json::json!(model.into()));
    }

    pub fn report_date(&self) -> Option<&str> {
        self.get(keys::REPORT_DATE).and_then(|v| v.as_str())
    }

    pub fn set_report_date(&mut self, date: impl Into<String>) {
        self.insert(keys::REPORT_DATE, serde_json::json!(date.into()));
    }

    /// Insert a value into the context
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value from the context
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
