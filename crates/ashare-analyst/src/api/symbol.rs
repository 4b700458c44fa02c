//! A-share code handling
//!
//! Codes are six digits. Each provider spells the exchange differently:
//! Eastmoney quote APIs use a market prefix (`1.600519`), its datacenter
//! uses a suffix (`600519.SH`), F10 pages a prefix (`SH600519`) and Yahoo
//! its own suffix (`600519.SS`).

use crate::error::{Result, StockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
}

impl Exchange {
    /// Codes starting with 6 trade in Shanghai, everything else in Shenzhen
    pub fn of(code: &str) -> Self {
        if code.starts_with('6') {
            Self::Shanghai
        } else {
            Self::Shenzhen
        }
    }

    fn market_id(self) -> u8 {
        match self {
            Self::Shanghai => 1,
            Self::Shenzhen => 0,
        }
    }

    fn short(self) -> &'static str {
        match self {
            Self::Shanghai => "SH",
            Self::Shenzhen => "SZ",
        }
    }

    fn yahoo_suffix(self) -> &'static str {
        match self {
            Self::Shanghai => "SS",
            Self::Shenzhen => "SZ",
        }
    }
}

/// Trim and check that `code` is six ASCII digits
pub fn validate_code(code: &str) -> Result<&str> {
    let code = code.trim();
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(StockError::InvalidSymbol(format!(
            "{code} (expected a six-digit A-share code)"
        )))
    }
}

/// `1.600519` / `0.000001`
pub fn secid(code: &str) -> String {
    format!("{}.{code}", Exchange::of(code).market_id())
}

/// `600519.SH` / `000001.SZ`
pub fn secucode(code: &str) -> String {
    format!("{code}.{}", Exchange::of(code).short())
}

/// `SH600519` / `SZ000001`
pub fn f10_code(code: &str) -> String {
    format!("{}{code}", Exchange::of(code).short())
}

/// `600519.SS` / `000001.SZ`
pub fn yahoo_symbol(code: &str) -> String {
    format!("{code}.{}", Exchange::of(code).yahoo_suffix())
}
