//! The analyst agent
//!
//! Wraps an [`AgentExecutor`] with the fixed system prompt and the six
//! market-data tools. Which tools run, and in what order, is left to the
//! model; the agent only validates the code and hands back the Markdown.

use crate::api::symbol::validate_code;
use crate::config::Settings;
use crate::prompts::{EXHAUSTED_PROMPT, SYSTEM_PROMPT, render_task};
use crate::tools::{MarketData, market_registry};
use ashare_core::{Agent, Context, Result};
use ashare_llm::LLMProvider;
use ashare_runtime::{AgentExecutor, ExecutorConfig, ExecutorEventHandler};
use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::info;

/// Turns a six-digit code into a Markdown analysis report
pub struct AnalystAgent {
    executor: AgentExecutor,
}

impl AnalystAgent {
    pub fn new(
        settings: &Settings,
        provider: Arc<dyn LLMProvider>,
        market: &Arc<MarketData>,
    ) -> Self {
        let params = &settings.model.parameters;
        let config = ExecutorConfig {
            max_steps: settings.model.max_steps,
            model: settings.model.model_name.clone(),
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            max_tokens: params.max_tokens,
            temperature: Some(params.temperature),
            top_p: Some(params.top_p),
            exhausted_prompt: EXHAUSTED_PROMPT.to_string(),
        };
        let registry = Arc::new(market_registry(market));
        Self {
            executor: AgentExecutor::new(provider, registry, config),
        }
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.executor = self.executor.with_event_handler(handler);
        self
    }

    pub fn model(&self) -> &str {
        &self.executor.config().model
    }

    /// Analyse one stock with a fresh context
    pub async fn analyze(&self, code: &str) -> Result<String> {
        let mut context = Context::new();
        self.process(code.to_string(), &mut context).await
    }
}

#[async_trait]
impl Agent for AnalystAgent {
    async fn process(&self, input: String, context: &mut Context) -> Result<String> {
        let code = validate_code(&input)?;
        let today = Local::now().date_naive();
        let task = render_task(code, &today.format("%Y-%m-%d").to_string())?;

        info!(code, model = %self.model(), "Starting analysis");
        let report = self.executor.run(task).await?;
        info!(code, chars = report.chars().count(), "Analysis finished");

        context.set_stock_code(code);
        context.set_model(self.model());
        context.set_report_date(today.format("%Y%m%d").to_string());
        Ok(report)
    }

    fn name(&self) -> &str {
        "a-share-analyst"
    }
}
