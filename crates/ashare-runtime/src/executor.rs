//! Agent executor for running the tool-calling loop
//!
//! Each step sends the conversation and the registered tools to the model:
//! 1. `EndTurn` returns the model's text.
//! 2. `ToolUse` runs the requested tools, appends their results and loops.
//! 3. `MaxTokens` returns the truncated text.
//!
//! When the step budget runs out the executor makes one last call without
//! tools, asking the model to answer with what it has.

use ashare_core::Result;
use ashare_llm::{CompletionRequest, ContentBlock, LLMProvider, Message, StopReason};
use ashare_tools::ToolRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_EXHAUSTED_PROMPT: &str = "The tool-call budget is exhausted. Using only the data \
     gathered so far, write the final answer now without calling any tools.";

/// Callbacks fired while the executor runs
///
/// All methods default to no-ops.
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    /// A model call is about to be made (`step` counts from 1)
    async fn on_step(&self, _step: usize, _max_steps: usize) {}

    async fn on_tool_start(&self, _id: &str, _name: &str, _input: &Value) {}

    async fn on_tool_done(
        &self,
        _id: &str,
        _name: &str,
        _result: std::result::Result<&Value, &str>,
        _duration_ms: u64,
    ) {
    }

    /// The model produced its final answer
    async fn on_complete(&self, _result: &str) {}

    /// The model provider failed and the run is aborting
    async fn on_error(&self, _error: &str) {}
}

/// Handler that ignores every event
pub struct NoOpEventHandler;

#[async_trait]
impl ExecutorEventHandler for NoOpEventHandler {}

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of tool-enabled model calls
    pub max_steps: usize,

    pub model: String,

    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    pub temperature: Option<f32>,

    pub top_p: Option<f32>,

    /// User message appended for the final tool-less call
    pub exhausted_prompt: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            model: "deepseek/deepseek-chat".to_string(),
            system_prompt: None,
            max_tokens: 4000,
            temperature: Some(0.1),
            top_p: Some(0.9),
            exhausted_prompt: DEFAULT_EXHAUSTED_PROMPT.to_string(),
        }
    }
}

/// Runs the loop: model → tool calls → execution → model
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
    event_handler: Arc<dyn ExecutorEventHandler>,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
            event_handler: Arc::new(NoOpEventHandler),
        }
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the loop for a single user message and return the final text
    pub async fn run(&self, user_message: String) -> Result<String> {
        self.run_conversation(vec![Message::user(user_message)])
            .await
    }

    /// Run the loop starting from an existing conversation
    pub async fn run_conversation(&self, mut conversation: Vec<Message>) -> Result<String> {
        let handler = self.event_handler.as_ref();
        let max_steps = self.config.max_steps;

        for step in 1..=max_steps {
            info!(step, max_steps, "Agent step started");
            handler.on_step(step, max_steps).await;

            let response = self.complete(&conversation, true).await?;
            conversation.push(response.message.clone());

            match response.stop_reason {
                StopReason::EndTurn => {
                    let text = response.message.text().unwrap_or_default().to_string();
                    info!(step, response_length = text.len(), "Agent completed");
                    handler.on_complete(&text).await;
                    return Ok(text);
                }

                StopReason::ToolUse => {
                    let results = self.execute_tools(&response.message).await;
                    if results.is_empty() {
                        warn!(step, "Tool use reported but no tool calls present");
                        let text = response.message.text().unwrap_or_default().to_string();
                        handler.on_complete(&text).await;
                        return Ok(text);
                    }
                    debug!(result_count = results.len(), "Continuing with tool results");
                    conversation.extend(results);
                }

                StopReason::MaxTokens => {
                    warn!(step, "Response truncated at max_tokens");
                    let text = response.message.text().unwrap_or_default().to_string();
                    handler.on_complete(&text).await;
                    return Ok(text);
                }
            }
        }

        warn!(max_steps, "Step budget exhausted, requesting final answer without tools");
        conversation.push(Message::user(self.config.exhausted_prompt.clone()));
        let response = self.complete(&conversation, false).await?;
        let text = response.message.text().unwrap_or_default().to_string();
        handler.on_complete(&text).await;
        Ok(text)
    }

    async fn complete(
        &self,
        conversation: &[Message],
        with_tools: bool,
    ) -> Result<ashare_llm::CompletionResponse> {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .max_tokens(self.config.max_tokens);
        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(top_p) = self.config.top_p {
            builder = builder.top_p(top_p);
        }
        if with_tools {
            builder = builder.tools(self.tool_registry.definitions());
        }
        let request = builder.build();

        info!(
            model = %self.config.model,
            message_count = conversation.len(),
            tool_count = request.tools.as_ref().map_or(0, Vec::len),
            "Sending request to LLM"
        );

        match self.provider.complete(request).await {
            Ok(response) => {
                info!(
                    stop_reason = ?response.stop_reason,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM response received"
                );
                Ok(response)
            }
            Err(e) => {
                let message = format!("LLM request failed: {e}");
                warn!(provider = self.provider.name(), error = %e, "LLM request failed");
                self.event_handler.on_error(&message).await;
                Err(ashare_core::Error::ProcessingFailed(message))
            }
        }
    }

    /// Execute every tool call in an assistant message, in order
    ///
    /// Failures, including unknown tool names, become error results for the
    /// model to read; they never abort the run.
    async fn execute_tools(&self, message: &Message) -> Vec<Message> {
        let handler = self.event_handler.as_ref();
        let mut results = Vec::new();

        for block in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            let input_preview: String = input.to_string().chars().take(200).collect();
            info!(tool_name = %name, tool_id = %id, input = %input_preview, "Executing tool");
            handler.on_tool_start(id, name, input).await;

            let start = Instant::now();
            let outcome = match self.tool_registry.get(name) {
                Some(tool) => tool.execute(input.clone()).await,
                None => Err(ashare_core::Error::ProcessingFailed(format!(
                    "Tool not found: {name}"
                ))),
            };
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(value) => {
                    let text = value.to_string();
                    info!(
                        tool_name = %name,
                        duration_ms,
                        result_length = text.len(),
                        "Tool execution succeeded"
                    );
                    handler.on_tool_done(id, name, Ok(&value), duration_ms).await;
                    results.push(Message::tool_result(id.clone(), text));
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(tool_name = %name, duration_ms, error = %error, "Tool execution failed");
                    handler.on_tool_done(id, name, Err(&error), duration_ms).await;
                    results.push(Message::tool_error(id.clone(), format!("Error: {error}")));
                }
            }
        }

        results
    }
}
