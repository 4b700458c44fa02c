//! Eastmoney client (primary provider)
//!
//! Uses the public JSON endpoints behind quote.eastmoney.com, the same ones
//! akshare scrapes. Every request carries a browser `User-Agent` and a
//! `Referer`, without which several endpoints answer with empty data.

use super::symbol::{f10_code, secid, secucode};
use super::{DailyBar, FinancialRow, InfoItem, PeerTables, PrimaryProvider, SpotRow, value_as_f64};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const SPOT_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const DATACENTER_URL: &str = "https://datacenter-web.eastmoney.com/api/data/v1/get";
const INDUSTRY_URL: &str =
    "https://emweb.securities.eastmoney.com/PC_HSF10/IndustryAnalysis/PageAjax";

const QUOTE_REFERER: &str = "https://quote.eastmoney.com";
const DATA_REFERER: &str = "https://data.eastmoney.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Shanghai/Shenzhen A shares, including STAR and ChiNext boards
const A_SHARE_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";
const SPOT_PAGE_SIZE: usize = 100;
/// Hard stop for pagination in case `total` is missing or wrong
const SPOT_MAX_PAGES: usize = 100;
/// Sort key for paging; codes do not move between pages during trading
const SPOT_SORT_FIELD: &str = "f12";

const INDICATOR_COLUMNS: &str =
    "SECUCODE,SECURITY_CODE,REPORT_DATE,WEIGHTAVG_ROE,XSMLL,GSJLRTBZZ,TOTALOPERATEREVE,PARENTNETPROFIT";
const INDICATOR_PAGE_SIZE: usize = 12;

/// Info table fields: (request field, Chinese label)
const INFO_FIELDS: [(&str, &str); 9] = [
    ("f57", "股票代码"),
    ("f58", "股票简称"),
    ("f84", "总股本"),
    ("f85", "流通股"),
    ("f127", "行业"),
    ("f116", "总市值"),
    ("f117", "流通市值"),
    ("f189", "上市时间"),
    ("f43", "最新"),
];

/// HTTP client for the Eastmoney endpoints
#[derive(Debug, Clone)]
pub struct EastmoneyClient {
    client: Client,
}

impl EastmoneyClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn get_json(&self, base: &str, params: &[(&str, &str)], referer: &str) -> Result<Value> {
        let url = Url::parse_with_params(base, params)
            .map_err(|e| StockError::ApiError(format!("Bad URL {base}: {e}")))?;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, referer)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockError::ApiError(format!("{base} returned HTTP {status}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PrimaryProvider for EastmoneyClient {
    #[instrument(skip(self))]
    async fn individual_info(&self, code: &str) -> Result<Vec<InfoItem>> {
        let fields = INFO_FIELDS.map(|(f, _)| f).join(",");
        let secid = secid(code);
        let body = self
            .get_json(
                QUOTE_URL,
                &[
                    ("fltt", "2"),
                    ("invt", "2"),
                    ("secid", secid.as_str()),
                    ("fields", fields.as_str()),
                ],
                QUOTE_REFERER,
            )
            .await?;
        parse_individual_info(code, &body)
    }

    #[instrument(skip(self))]
    async fn spot_table(&self) -> Result<Vec<SpotRow>> {
        let page_size = SPOT_PAGE_SIZE.to_string();
        let mut rows = Vec::new();

        for page in 1..=SPOT_MAX_PAGES {
            let page_no = page.to_string();
            let body = self
                .get_json(
                    SPOT_URL,
                    &[
                        ("pn", page_no.as_str()),
                        ("pz", page_size.as_str()),
                        ("po", "0"),
                        ("np", "1"),
                        ("fltt", "2"),
                        ("invt", "2"),
                        ("fid", SPOT_SORT_FIELD),
                        ("fs", A_SHARE_FILTER),
                        ("fields", "f2,f9,f12,f14,f20,f23"),
                    ],
                    QUOTE_REFERER,
                )
                .await?;

            let (page_rows, total) = parse_spot_page(&body);
            let fetched = page_rows.len();
            rows.extend(page_rows);
            if spot_paging_done(fetched, rows.len(), total) {
                break;
            }
        }

        if rows.is_empty() {
            return Err(StockError::ApiError("Spot table is empty".to_string()));
        }
        info!(rows = rows.len(), "Fetched full-market spot table");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn financial_indicators(&self, code: &str) -> Result<Vec<FinancialRow>> {
        let filter = format!("(SECUCODE=\"{}\")", secucode(code));
        let page_size = INDICATOR_PAGE_SIZE.to_string();
        let body = self
            .get_json(
                DATACENTER_URL,
                &[
                    ("reportName", "RPT_DMSK_FN_INDICATOR"),
                    ("columns", INDICATOR_COLUMNS),
                    ("filter", filter.as_str()),
                    ("pageNumber", "1"),
                    ("pageSize", page_size.as_str()),
                    ("sortColumns", "REPORT_DATE"),
                    ("sortTypes", "-1"),
                    ("source", "WEB"),
                    ("client", "WEB"),
                ],
                DATA_REFERER,
            )
            .await?;
        parse_financial_indicators(code, &body)
    }

    #[instrument(skip(self))]
    async fn daily_history(&self, code: &str, sessions: usize) -> Result<Vec<DailyBar>> {
        let secid = secid(code);
        let limit = sessions.to_string();
        let body = self
            .get_json(
                KLINE_URL,
                &[
                    ("secid", secid.as_str()),
                    ("fields1", "f1,f2,f3,f4,f5,f6"),
                    ("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61"),
                    ("klt", "101"),
                    ("fqt", "1"),
                    ("lmt", limit.as_str()),
                    ("end", "20500101"),
                ],
                QUOTE_REFERER,
            )
            .await?;
        parse_klines(code, &body)
    }

    #[instrument(skip(self))]
    async fn industry_comparison(&self, code: &str) -> Result<PeerTables> {
        let f10 = f10_code(code);
        let body = self
            .get_json(INDUSTRY_URL, &[("code", f10.as_str())], QUOTE_REFERER)
            .await?;
        parse_peer_tables(code, &body)
    }
}

/// `data` of a `stock/get` answer as label/value pairs
pub fn parse_individual_info(code: &str, body: &Value) -> Result<Vec<InfoItem>> {
    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| StockError::unavailable(code, "quote endpoint returned no data"))?;

    Ok(INFO_FIELDS
        .iter()
        .map(|(field, label)| {
            let value = data.get(*field).cloned().unwrap_or(Value::Null);
            let value = match (*field, &value) {
                // Listing date arrives as an integer such as 20010827
                ("f189", Value::Number(n)) => Value::String(n.to_string()),
                (_, Value::String(s)) if s == "-" => Value::Null,
                _ => value,
            };
            InfoItem::new(*label, value)
        })
        .collect())
}

/// Whether `spot_table` has seen the whole market
///
/// An empty page always ends paging. Without a reported total the next page
/// is requested until one comes back empty.
fn spot_paging_done(fetched: usize, collected: usize, total: Option<usize>) -> bool {
    fetched == 0 || total.is_some_and(|total| collected >= total)
}

/// Rows of one `clist/get` page and the total row count it reports, if any
pub fn parse_spot_page(body: &Value) -> (Vec<SpotRow>, Option<usize>) {
    let data = body.get("data");
    let total = data
        .and_then(|d| d.get("total"))
        .and_then(Value::as_u64)
        .map(|t| usize::try_from(t).unwrap_or(usize::MAX));

    // `diff` is an array when np=1, an index-keyed object otherwise
    let rows: Vec<&Value> = match data.and_then(|d| d.get("diff")) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(items)) => items.values().collect(),
        _ => Vec::new(),
    };

    let rows = rows
        .into_iter()
        .filter_map(|row| {
            let code = row.get("f12").and_then(Value::as_str)?.to_string();
            Some(SpotRow {
                code,
                name: row
                    .get("f14")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                latest_price: row.get("f2").and_then(value_as_f64),
                pe_ttm: row.get("f9").and_then(value_as_f64),
                pb: row.get("f23").and_then(value_as_f64),
                market_cap: row.get("f20").and_then(value_as_f64),
            })
        })
        .collect();

    (rows, total)
}

/// Rows of a datacenter `RPT_DMSK_FN_INDICATOR` answer
pub fn parse_financial_indicators(code: &str, body: &Value) -> Result<Vec<FinancialRow>> {
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        return Err(StockError::unavailable(code, format!("financial indicators: {message}")));
    }

    let rows = body
        .pointer("/result/data")
        .and_then(Value::as_array)
        .ok_or_else(|| StockError::unavailable(code, "financial indicators: no rows"))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let date = row.get("REPORT_DATE").and_then(Value::as_str)?;
            let num = |key: &str| row.get(key).and_then(value_as_f64);
            Some(FinancialRow {
                report_date: date.chars().take(10).collect(),
                roe: num("WEIGHTAVG_ROE"),
                gross_margin: num("XSMLL"),
                net_profit_growth: num("GSJLRTBZZ"),
                total_revenue: num("TOTALOPERATEREVE"),
                net_profit: num("PARENTNETPROFIT"),
            })
        })
        .collect())
}

/// Bars of a `kline/get` answer
///
/// Each line reads `date,open,close,high,low,volume,amount,amplitude,
/// change%,change,turnover`.
pub fn parse_klines(code: &str, body: &Value) -> Result<Vec<DailyBar>> {
    let lines = body
        .pointer("/data/klines")
        .and_then(Value::as_array)
        .ok_or_else(|| StockError::unavailable(code, "kline endpoint returned no data"))?;

    Ok(lines
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').collect();
            let num = |i: usize| cols.get(i).and_then(|c| c.parse::<f64>().ok());
            Some(DailyBar {
                date: (*cols.first()?).to_string(),
                open: num(1)?,
                close: num(2)?,
                high: num(3)?,
                low: num(4)?,
                volume: num(5).unwrap_or_default(),
                change_percent: num(8),
            })
        })
        .collect())
}

/// Growth (`czxbj`) and valuation (`gzbj`) peer tables of the F10 page
pub fn parse_peer_tables(code: &str, body: &Value) -> Result<PeerTables> {
    let table = |key: &str| -> Vec<Map<String, Value>> {
        body.get(key)
            .and_then(|t| t.get("data"))
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
            .unwrap_or_default()
    };

    let tables = PeerTables {
        growth: table("czxbj"),
        valuation: table("gzbj"),
    };
    if tables.growth.is_empty() && tables.valuation.is_empty() {
        return Err(StockError::unavailable(code, "industry comparison tables are empty"));
    }
    Ok(tables)
}
