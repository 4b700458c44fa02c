//! Error types for the analyst

use thiserror::Error;

/// Errors raised by configuration, data fetching and report rendering
#[derive(Debug, Error)]
pub enum StockError {
    /// Provider answered but reported a failure
    #[error("API error: {0}")]
    ApiError(String),

    /// Stock code is not a six-digit A-share code
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// No usable API key in the environment, env file or settings
    #[error("API key not configured: set {env_var} in the environment or config/.env")]
    MissingApiKey { env_var: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A single PDF engine failed; the renderer moves on to the next one
    #[error("PDF engine {engine} failed: {reason}")]
    PdfEngine { engine: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for analyst operations
pub type Result<T> = std::result::Result<T, StockError>;

impl StockError {
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

impl From<StockError> for ashare_core::Error {
    fn from(err: StockError) -> Self {
        ashare_core::Error::ProcessingFailed(err.to_string())
    }
}

impl From<ashare_core::Error> for StockError {
    fn from(err: ashare_core::Error) -> Self {
        StockError::Other(err.to_string())
    }
}

impl From<ashare_llm::LLMError> for StockError {
    fn from(err: ashare_llm::LLMError) -> Self {
        StockError::Other(format!("LLM error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::InvalidSymbol("60051".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: 60051");

        let err = StockError::unavailable("600519", "empty spot table");
        assert_eq!(
            err.to_string(),
            "Data not available for 600519: empty spot table"
        );

        let err = StockError::MissingApiKey {
            env_var: "OPENROUTER_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_error_conversion() {
        let err: ashare_core::Error = StockError::ApiError("push2 down".to_string()).into();
        match err {
            ashare_core::Error::ProcessingFailed(msg) => assert!(msg.contains("API error")),
            _ => panic!("Expected ProcessingFailed variant"),
        }
    }
}
