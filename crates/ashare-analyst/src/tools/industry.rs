//! Industry averages from the peer comparison tables
//!
//! Both peer tables carry one aggregate row whose `CORRE_SECURITY_NAME` is
//! `行业平均`. Metrics are looked up by the raw `PageAjax` field codes; absent
//! metrics read as 0. A failed fetch still yields the full set of keys, all
//! 0, with `data_source = "error"`.

use super::num;
use crate::api::{PeerTables, PrimaryProvider, value_as_f64};
use serde_json::{Map, Value, json};
use tracing::warn;

const AVERAGE_LABEL: &str = "行业平均";

/// (output key, `czxbj` fields to try)
const GROWTH_METRICS: [(&str, &[&str]); 6] = [
    // 基本每股收益增长率-3年复合 / -TTM
    ("eps_growth_3y_avg", &["MGSYZZL_3Y"]),
    ("eps_growth_ttm_avg", &["MGSYZZL_TTM"]),
    // 营业收入增长率
    ("revenue_growth_3y_avg", &["YYSRZZL_3Y"]),
    ("revenue_growth_ttm_avg", &["YYSRZZL_TTM"]),
    // 净利润增长率
    ("net_profit_growth_3y_avg", &["JLRZZL_3Y"]),
    ("net_profit_growth_ttm_avg", &["JLRZZL_TTM"]),
];

/// (output key, `gzbj` fields to try)
const VALUATION_METRICS: [(&str, &[&str]); 5] = [
    ("pe_ttm_avg", &["PE_TTM"]),
    ("pb_mrq_avg", &["PB_MRQ"]),
    ("ps_ttm_avg", &["PS_TTM"]),
    ("peg_avg", &["PEG"]),
    // Enterprise multiple, EV/EBITDA of the last annual report
    ("ev_ebitda_avg", &["QYBS"]),
];

/// The aggregate row of a peer table
pub fn average_row(rows: &[Map<String, Value>]) -> Option<&Map<String, Value>> {
    rows.iter().find(|row| {
        row.values()
            .any(|v| v.as_str().is_some_and(|s| s.trim() == AVERAGE_LABEL))
    })
}

fn metric(row: Option<&Map<String, Value>>, fields: &[&str]) -> Option<f64> {
    let row = row?;
    fields
        .iter()
        .find_map(|field| row.get(*field).and_then(value_as_f64))
}

/// Industry averages extracted from fetched peer tables
pub fn extract_averages(code: &str, industry: &str, tables: &PeerTables) -> Value {
    let growth = average_row(&tables.growth);
    let valuation = average_row(&tables.valuation);

    let mut out = Map::new();
    out.insert("industry".to_string(), json!(industry));
    for (key, fields) in GROWTH_METRICS {
        out.insert(key.to_string(), num(metric(growth, fields)));
    }
    for (key, fields) in VALUATION_METRICS {
        out.insert(key.to_string(), num(metric(valuation, fields)));
    }
    out.insert("data_source".to_string(), json!("eastmoney"));
    out.insert(
        "note".to_string(),
        json!(format!("行业均值数据来自东方财富同行比较数据，基于{code}所在行业")),
    );
    Value::Object(out)
}

/// Every metric 0, marked as an error
pub fn placeholder_averages(industry: &str, reason: &str) -> Value {
    let mut out = Map::new();
    out.insert("industry".to_string(), json!(industry));
    for (key, _) in GROWTH_METRICS.iter().chain(VALUATION_METRICS.iter()) {
        out.insert((*key).to_string(), json!(0.0));
    }
    out.insert("data_source".to_string(), json!("error"));
    out.insert(
        "note".to_string(),
        json!(format!("获取行业均值数据失败: {reason}，返回默认值")),
    );
    Value::Object(out)
}

/// Fetch the peer tables and reduce them to industry averages
pub async fn industry_averages(primary: &dyn PrimaryProvider, code: &str, industry: &str) -> Value {
    match primary.industry_comparison(code).await {
        Ok(tables) => extract_averages(code, industry, &tables),
        Err(e) => {
            warn!(code, error = %e, "Industry comparison unavailable");
            placeholder_averages(industry, &e.to_string())
        }
    }
}
