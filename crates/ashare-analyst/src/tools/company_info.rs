//! Company profile tool

use super::{MarketData, info_map, info_str, no_data, num, parse_symbol, symbol_schema};
use crate::api::TickerInfo;
use ashare_core::Result as AgentResult;
use ashare_tools::Tool;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::warn;

const NOTE_WITH_SCOPE: &str = "公司基本信息来自akshare接口，经营范围来自yfinance接口";
const NOTE_PRIMARY: &str = "公司信息来自akshare接口";
const NOTE_FALLBACK: &str = "公司信息来自yfinance备用接口（akshare失败），经过重试机制获取，\
                             请注意部分字段为英文，请在报告中翻译为中文";

/// Name, industry, listing date and business scope for one symbol
///
/// Fields the primary provider has no source for (introduction, legal
/// representative, registered address) are present as `""`.
pub struct CompanyInfoTool {
    market: Arc<MarketData>,
}

impl CompanyInfoTool {
    pub fn new(market: Arc<MarketData>) -> Self {
        Self { market }
    }

    async fn company_info(&self, code: &str) -> AgentResult<Value> {
        match self.market.primary.individual_info(code).await {
            Ok(items) => {
                let info = info_map(&items);
                let scope = self.market.fallback.business_summary(code).await;
                Ok(from_primary(code, info, scope))
            }
            Err(e) => {
                warn!(code, error = %e, "Primary info failed, using secondary provider");
                match self.market.fallback.ticker_info(code).await {
                    Some(info) => Ok(from_secondary(code, info)),
                    None => Err(no_data(code, "company info", &e)),
                }
            }
        }
    }
}

fn from_primary(code: &str, info: Map<String, Value>, business_scope: Option<String>) -> Value {
    let note = if business_scope.is_some() {
        NOTE_WITH_SCOPE
    } else {
        NOTE_PRIMARY
    };
    json!({
        "symbol": code,
        "company_name": info_str(&info, "股票简称"),
        "industry": info_str(&info, "行业"),
        "company_introduction": "",
        "listing_date": info_str(&info, "上市时间"),
        "legal_representative": "",
        "registered_address": "",
        "business_scope": business_scope.unwrap_or_default(),
        "full_info": info,
        "note": note,
    })
}

fn from_secondary(code: &str, info: TickerInfo) -> Value {
    let summary = info.str("longBusinessSummary").unwrap_or_default().to_string();
    json!({
        "symbol": code,
        "company_name": info.first_str(&["longName", "shortName"]).unwrap_or_default(),
        "industry": info.first_str(&["industry", "sector"]).unwrap_or_default(),
        "company_introduction": summary,
        "listing_date": listing_date(&info).unwrap_or_default(),
        "legal_representative": "",
        "registered_address": "",
        "business_scope": summary,
        "description": summary,
        "total_employees": num(info.f64("fullTimeEmployees")),
        "weighted_shares_outstanding": num(info.f64("sharesOutstanding")),
        "full_info": info,
        "note": NOTE_FALLBACK,
    })
}

/// First trading day as `YYYY-MM-DD`, in China Standard Time
fn listing_date(info: &TickerInfo) -> Option<String> {
    let secs = info
        .f64("firstTradeDateMilliseconds")
        .map(|ms| ms / 1000.0)
        .or_else(|| info.f64("firstTradeDateEpochUtc"))?;
    let utc = DateTime::from_timestamp(secs as i64, 0)?;
    let cst = FixedOffset::east_opt(8 * 3600)?;
    Some(utc.with_timezone(&cst).format("%Y-%m-%d").to_string())
}

#[async_trait]
impl Tool for CompanyInfoTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let code = parse_symbol(params)?;
        self.company_info(&code).await
    }

    fn name(&self) -> &str {
        "get_company_info"
    }

    fn description(&self) -> &str {
        "获取A股上市公司的基本信息：公司名称、所属行业、上市日期、经营范围等"
    }

    fn input_schema(&self) -> Value {
        symbol_schema()
    }
}
