//! OpenRouter provider
//!
//! OpenRouter exposes the OpenAI chat-completions protocol at
//! `https://openrouter.ai/api/v1`. Any OpenAI-compatible endpoint works by
//! changing the base URL.
//!
//! ```no_run
//! use ashare_llm::{CompletionRequest, LLMProvider, Message};
//! use ashare_llm::providers::{OpenRouterConfig, OpenRouterProvider};
//!
//! # async fn run() -> ashare_llm::Result<()> {
//! let provider = OpenRouterProvider::with_config(OpenRouterConfig::new("sk-or-..."))?;
//! let request = CompletionRequest::builder("deepseek/deepseek-chat")
//!     .add_message(Message::user("你好"))
//!     .max_tokens(100)
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_APP_TITLE: &str = "A-Share Financial Analyst";

/// Configuration for the OpenRouter provider
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,

    /// Base URL, without the `/chat/completions` suffix
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sent as `X-Title` for OpenRouter's app attribution
    pub app_title: Option<String>,

    /// Sent as `HTTP-Referer` for OpenRouter's app attribution
    pub referer: Option<String>,
}

impl OpenRouterConfig {
    /// Create a config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENROUTER_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            app_title: Some(DEFAULT_APP_TITLE.to_string()),
            referer: None,
        }
    }

    /// Set a custom base URL (any OpenAI-compatible endpoint)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// Chat-completion provider for OpenRouter and other OpenAI-compatible APIs
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenRouterConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenRouterConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let wire_request = ChatRequest {
            model: request.model.clone(),
            messages: build_chat_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            tools: request.tools.as_deref().map(convert_tools),
        };

        debug!(
            message_count = wire_request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&wire_request);
        if let Some(title) = &self.config.app_title {
            builder = builder.header("X-Title", title);
        }
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                402 => LLMError::InsufficientCredits(error_text),
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        parse_chat_response(body)
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

// Wire request types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunction,
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

// Wire response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    /// OpenRouter reports some upstream failures with HTTP 200 and this field
    #[serde(default)]
    error: Option<ChatErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseToolCall {
    id: String,
    function: ChatResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ChatResponseFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// Conversion functions

/// System prompt goes first, then the converted conversation
fn build_chat_messages(system: Option<String>, messages: Vec<Message>) -> Vec<ChatMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);
    if let Some(sys) = system {
        result.push(ChatMessage::text("system", sys));
    }
    for msg in messages {
        result.extend(convert_message(msg));
    }
    result
}

/// One of our messages may expand into several wire messages, since every
/// tool result becomes its own `role = "tool"` message.
fn convert_message(msg: Message) -> Vec<ChatMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    match msg.content {
        Some(MessageContent::Text(text)) => vec![ChatMessage::text(role, text)],
        Some(MessageContent::Blocks(blocks)) => convert_blocks(role, blocks),
        None => vec![ChatMessage::text(role, String::new())],
    }
}

fn convert_blocks(role: &'static str, blocks: Vec<ContentBlock>) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ChatToolCall {
                    id,
                    tool_type: "function",
                    function: ChatFunctionCall {
                        name,
                        arguments: input.to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => messages.push(ChatMessage {
                role: "tool",
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
        }
    }

    if !texts.is_empty() || !tool_calls.is_empty() {
        let content = if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        };
        messages.insert(
            0,
            ChatMessage {
                role,
                content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            },
        );
    }

    messages
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<ChatTool> {
    tools
        .iter()
        .map(|tool| ChatTool {
            tool_type: "function",
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

fn parse_chat_response(body: ChatResponse) -> Result<CompletionResponse> {
    if let Some(err) = body.error {
        return Err(LLMError::RequestFailed(err.message));
    }

    let usage = body.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

    let finish_reason = choice.finish_reason.unwrap_or_default();
    debug!(
        finish_reason = %finish_reason,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "Received chat completion"
    );

    let message = parse_response_message(choice.message)?;
    let mut stop_reason = map_stop_reason(&finish_reason);
    // Some upstream models report "stop" while still returning tool calls
    if message.has_tool_uses() {
        stop_reason = StopReason::ToolUse;
    }

    Ok(CompletionResponse {
        message,
        stop_reason,
        usage,
    })
}

fn parse_response_message(msg: ChatResponseMessage) -> Result<Message> {
    let mut blocks = Vec::new();

    if let Some(content) = msg.content.filter(|c| !c.is_empty()) {
        blocks.push(ContentBlock::Text { text: content });
    }

    for call in msg.tool_calls.unwrap_or_default() {
        let input: serde_json::Value = if call.function.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                LLMError::UnexpectedResponse(format!("Failed to parse tool arguments: {e}"))
            })?
        };

        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text {
            text: String::new(),
        });
    }

    Ok(Message {
        role: Role::Assistant,
        content: Some(MessageContent::Blocks(blocks)),
    })
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "stop" | "" => StopReason::EndTurn,
        other => {
            debug!("Unknown finish reason: {}", other);
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenRouterProvider::new("sk-or-test").unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.config().api_base, "https://openrouter.ai/api/v1");
        assert_eq!(provider.config().timeout_secs, 120);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenRouterProvider::new("  ");
        assert!(matches!(result, Err(LLMError::ConfigurationError(_))));
    }

    #[test]
    fn test_custom_base_trims_trailing_slash() {
        let config = OpenRouterConfig::new("k")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30);
        assert_eq!(config.api_base, "http://localhost:1234/v1");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_system_message_first() {
        let messages = build_chat_messages(
            Some("你是一位专业的A股金融分析师".to_string()),
            vec![Message::user("分析 600519")],
        );

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content.as_deref(), Some("分析 600519"));
    }

    #[test]
    fn test_assistant_tool_use_conversion() {
        let msg = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "get_price_history".to_string(),
                input: json!({"symbol": "600519"}),
            }])),
        };

        let wire = convert_message(msg);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "assistant");
        assert!(wire[0].content.is_none());
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "get_price_history");
        assert_eq!(calls[0].function.arguments, r#"{"symbol":"600519"}"#);
    }

    #[test]
    fn test_tool_results_become_tool_messages() {
        let msg = Message {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::ToolResult {
                    tool_use_id: "call_1".to_string(),
                    content: "{}".to_string(),
                    is_error: None,
                },
                ContentBlock::ToolResult {
                    tool_use_id: "call_2".to_string(),
                    content: "Error: timeout".to_string(),
                    is_error: Some(true),
                },
            ])),
        };

        let wire = convert_message(msg);
        assert_eq!(wire.len(), 2);
        assert!(wire.iter().all(|m| m.role == "tool"));
        assert_eq!(wire[1].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn test_tool_definition_conversion() {
        let tools = convert_tools(&[ToolDefinition::new(
            "get_company_info",
            "获取公司基本信息",
            json!({"type": "object"}),
        )]);
        assert_eq!(tools[0].tool_type, "function");
        assert_eq!(tools[0].function.name, "get_company_info");
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_company_info", "arguments": "{\"symbol\":\"600519\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20}
        }))
        .unwrap();

        let response = parse_chat_response(body).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.usage.total(), 120);
        match &response.message.tool_uses()[0] {
            ContentBlock::ToolUse { id, input, .. } => {
                assert_eq!(id, "call_9");
                assert_eq!(input["symbol"], "600519");
            }
            _ => panic!("Expected tool use"),
        }
    }

    #[test]
    fn test_tool_calls_override_stop_finish_reason() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "c",
                        "type": "function",
                        "function": {"name": "get_latest_price", "arguments": ""}
                    }]
                },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        let response = parse_chat_response(body).unwrap();
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.usage.total(), 0);
    }

    #[test]
    fn test_error_body_with_ok_status() {
        let body: ChatResponse = serde_json::from_value(json!({
            "error": {"message": "upstream overloaded", "code": 502}
        }))
        .unwrap();

        let err = parse_chat_response(body).unwrap_err();
        assert!(err.to_string().contains("upstream overloaded"));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(map_stop_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_stop_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_stop_reason("content_filter"), StopReason::EndTurn);
    }
}
