//! Chat-completion layer for the A-share analyst
//!
//! This crate provides provider-agnostic types for talking to a hosted LLM:
//!
//! - Message types, including tool-use and tool-result blocks
//! - Completion request/response types
//! - Tool definitions for function calling
//! - The [`LLMProvider`] trait
//! - An OpenRouter provider speaking the OpenAI chat-completions protocol

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
