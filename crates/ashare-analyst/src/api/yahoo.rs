//! Yahoo Finance client (secondary provider)
//!
//! Ticker info comes from the `quoteSummary` endpoint, which needs a session
//! cookie and a crumb. Module values arrive as `{ "raw": .., "fmt": .. }`
//! and are flattened into a single key/value map. Price history goes
//! through `yahoo_finance_api`.

use super::symbol::yahoo_symbol;
use super::{DailyBar, FallbackProvider, HistoryRange, TickerInfo};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;
use yahoo_finance_api as yahoo;

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary/";
const SUMMARY_MODULES: &str =
    "assetProfile,summaryDetail,financialData,defaultKeyStatistics,price,quoteType";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// China Standard Time, used to date daily bars
const CST_OFFSET_SECS: i64 = 8 * 3600;

pub struct YahooClient {
    http: Client,
    crumb: Mutex<Option<String>>,
}

impl YahooClient {
    /// Create a client; `proxy` routes the `quoteSummary` traffic
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(timeout);
        if let Some(proxy) = proxy {
            debug!(proxy, "Routing Yahoo requests through proxy");
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            http: builder.build()?,
            crumb: Mutex::new(None),
        })
    }

    /// Cached crumb, fetched on first use
    async fn crumb(&self) -> Result<String> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters; the page itself is a 404
        if let Err(e) = self.http.get(COOKIE_URL).send().await {
            debug!(error = %e, "Cookie request failed, trying crumb anyway");
        }

        let response = self.http.get(CRUMB_URL).send().await?;
        let status = response.status();
        let crumb = response.text().await?.trim().to_string();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(StockError::YahooFinanceError(format!(
                "Could not obtain crumb (HTTP {status})"
            )));
        }

        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn reset_crumb(&self) {
        *self.crumb.lock().await = None;
    }
}

#[async_trait]
impl FallbackProvider for YahooClient {
    #[instrument(skip(self))]
    async fn ticker_info(&self, code: &str) -> Result<TickerInfo> {
        let symbol = yahoo_symbol(code);
        let crumb = self.crumb().await?;

        let url = Url::parse(SUMMARY_URL)
            .and_then(|base| base.join(&symbol))
            .map_err(|e| StockError::YahooFinanceError(format!("Bad URL: {e}")))?;
        let response = self
            .http
            .get(url)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "Crumb rejected, will refresh on next call");
            self.reset_crumb().await;
        }
        let body: Value = response.json().await?;
        flatten_quote_summary(&symbol, &body)
    }

    #[instrument(skip(self))]
    async fn history(&self, code: &str, range: HistoryRange) -> Result<Vec<DailyBar>> {
        let symbol = yahoo_symbol(code);
        let connector =
            yahoo::YahooConnector::new().map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(range.days());
        let response = connector
            .get_quote_history(&symbol, start, end)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let mut bars: Vec<DailyBar> = quotes
            .iter()
            .filter_map(|q| {
                let ts = i64::try_from(q.timestamp).ok()?;
                let date = DateTime::from_timestamp(ts + CST_OFFSET_SECS, 0)?
                    .format("%Y-%m-%d")
                    .to_string();
                Some(DailyBar {
                    date,
                    open: q.open,
                    close: q.close,
                    high: q.high,
                    low: q.low,
                    volume: q.volume as f64,
                    change_percent: None,
                })
            })
            .collect();
        fill_change_percent(&mut bars);
        Ok(bars)
    }
}

/// Flatten every module of a `quoteSummary` answer into one map
///
/// `{raw, fmt}` pairs keep `raw`; nested objects without `raw` and arrays
/// (company officers and the like) are dropped. When two modules share a
/// key the first one wins.
pub fn flatten_quote_summary(symbol: &str, body: &Value) -> Result<TickerInfo> {
    let Some(modules) = body
        .pointer("/quoteSummary/result/0")
        .and_then(Value::as_object)
    else {
        let reason = body
            .pointer("/quoteSummary/error/description")
            .and_then(Value::as_str)
            .unwrap_or("no result");
        return Err(StockError::YahooFinanceError(format!("{symbol}: {reason}")));
    };

    let mut flat = Map::new();
    for fields in modules.values().filter_map(Value::as_object) {
        for (key, value) in fields {
            if let Some(value) = flatten_value(value) {
                flat.entry(key.clone()).or_insert(value);
            }
        }
    }
    Ok(TickerInfo(flat))
}

fn flatten_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::Object(obj) => obj
            .get("raw")
            .or_else(|| obj.get("fmt"))
            .filter(|v| !v.is_null())
            .cloned(),
        scalar => Some(scalar.clone()),
    }
}

/// Day-over-day close change, in percent
fn fill_change_percent(bars: &mut [DailyBar]) {
    for i in 1..bars.len() {
        let prev = bars[i - 1].close;
        if prev > 0.0 {
            bars[i].change_percent = Some((bars[i].close - prev) / prev * 100.0);
        }
    }
}
