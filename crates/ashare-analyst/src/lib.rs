//! A-share financial analyst
//!
//! Fetches Chinese A-share data, lets an LLM agent write a Chinese
//! analysis report from it, and renders the report to PDF/HTML/Markdown.
//!
//! - [`api`]: the primary (Eastmoney) and secondary (Yahoo Finance) providers
//! - [`retry`]: bounded retry around every secondary-provider call
//! - [`tools`]: the six data-fetch tools the model can call
//! - [`analyst`]: the agent tying the model, prompt and tools together
//! - [`report`]: Markdown → HTML → PDF with engine fallback
//! - [`config`]: YAML settings with environment overrides
//!
//! # Example
//!
//! ```rust,ignore
//! use ashare_analyst::{AnalystAgent, MarketData, ReportRenderer, Settings};
//!
//! let settings = Settings::load("config/settings.yaml")?;
//! let agent = AnalystAgent::new(&settings, provider, &market);
//! let report = agent.analyze("600519").await?;
//! let outcome = ReportRenderer::new(&settings.report.output_dir)
//!     .render(&report, "600519")
//!     .await?;
//! ```

pub mod analyst;
pub mod api;
pub mod config;
pub mod error;
pub mod prompts;
pub mod report;
pub mod retry;
pub mod tools;

#[cfg(test)]
mod fixtures;

pub use analyst::AnalystAgent;
pub use api::{EastmoneyClient, YahooClient};
pub use config::Settings;
pub use error::{Result, StockError};
pub use report::{RenderOutcome, ReportPaths, ReportRenderer, save_markdown_only};
pub use retry::{RetryPolicy, RetryingFallback};
pub use tools::MarketData;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FakeEngine, FakeFallback, FakePrimary, ScriptedLlm, market_data};
    use std::sync::Arc;

    const TOOLS: [&str; 6] = [
        "get_company_info",
        "get_market_valuation",
        "get_financial_indicators",
        "get_price_history",
        "get_latest_price",
        "get_risk_indicators",
    ];

    fn scripted_run(report: &str) -> Arc<ScriptedLlm> {
        let mut script: Vec<_> = TOOLS
            .iter()
            .enumerate()
            .map(|(i, name)| ScriptedLlm::tool_call(&format!("call_{i}"), name, "600519"))
            .collect();
        script.push(ScriptedLlm::text(report));
        Arc::new(ScriptedLlm::new(script))
    }

    #[tokio::test]
    async fn test_end_to_end_600519() {
        let report_md = "# 贵州茅台(600519)分析报告\n\n## 1. 公司概况\n\n酿酒行业龙头。\n\n## 5. 投资建议\n\n持有。\n";
        let llm = scripted_run(report_md);
        let market = market_data(FakePrimary::moutai(), FakeFallback::moutai());
        let agent = AnalystAgent::new(&Settings::default(), llm.clone(), &market);

        let report = agent.analyze("600519").await.unwrap();
        assert_eq!(report, report_md);
        // six tool rounds plus the final answer
        assert_eq!(llm.requests().len(), 7);

        let dir = tempfile::tempdir().unwrap();
        let engines = FakeEngine::chain(1, true);
        let renderer = ReportRenderer::with_engines(dir.path(), FakeEngine::as_dyn(&engines));
        let outcome = renderer.render(&report, "600519").await.unwrap();

        let today = chrono::Local::now().format("%Y%m%d").to_string();
        let stem = format!("Report_600519_{today}");
        assert!(outcome.paths.markdown.ends_with(format!("{stem}.md")));
        assert!(outcome.paths.html.ends_with(format!("{stem}.html")));
        assert!(outcome.paths.pdf.ends_with(format!("{stem}.pdf")));
        assert!(outcome.paths.markdown.exists());
        assert!(outcome.paths.html.exists());
        assert!(outcome.pdf().unwrap().exists());
        assert_eq!(outcome.engine.as_deref(), Some("engine-1"));
    }

    #[tokio::test]
    async fn test_end_to_end_with_primary_down() {
        let llm = scripted_run("# 报告\n");
        let market = market_data(FakePrimary::failing(), FakeFallback::moutai());
        let agent = AnalystAgent::new(&Settings::default(), llm.clone(), &market);

        assert_eq!(agent.analyze("600519").await.unwrap(), "# 报告\n");

        // every tool answered from the secondary provider, none errored
        let last = llm.requests().pop().unwrap();
        let errors = last
            .messages
            .iter()
            .filter_map(|m| match &m.content {
                Some(ashare_llm::MessageContent::Blocks(blocks)) => Some(blocks),
                _ => None,
            })
            .flatten()
            .filter(|b| matches!(b, ashare_llm::ContentBlock::ToolResult { is_error: Some(true), .. }))
            .count();
        assert_eq!(errors, 0);
    }
}
