//! Console progress while the agent runs

use ashare_runtime::ExecutorEventHandler;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Prints each tool call as it happens
pub struct ConsoleEvents;

fn tool_label(name: &str) -> &str {
    match name {
        "get_company_info" => "公司基本信息",
        "get_market_valuation" => "市场估值数据",
        "get_financial_indicators" => "财务指标",
        "get_price_history" => "价格历史",
        "get_latest_price" => "实时股价",
        "get_risk_indicators" => "风险指标",
        other => other,
    }
}

#[async_trait]
impl ExecutorEventHandler for ConsoleEvents {
    async fn on_step(&self, step: usize, max_steps: usize) {
        debug!(step, max_steps, "Model call");
    }

    async fn on_tool_start(&self, _id: &str, name: &str, input: &Value) {
        let symbol = input.get("symbol").and_then(Value::as_str).unwrap_or("");
        println!("  → 获取{} {symbol}", tool_label(name));
    }

    async fn on_tool_done(
        &self,
        _id: &str,
        name: &str,
        result: Result<&Value, &str>,
        duration_ms: u64,
    ) {
        match result {
            Ok(_) => println!("  ✓ {} ({duration_ms} ms)", tool_label(name)),
            Err(e) => println!("  ✗ {} 获取失败: {e}", tool_label(name)),
        }
    }

    async fn on_error(&self, error: &str) {
        println!("  ✗ 模型调用失败: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_labels() {
        assert_eq!(tool_label("get_latest_price"), "实时股价");
        assert_eq!(tool_label("unknown_tool"), "unknown_tool");
    }
}
