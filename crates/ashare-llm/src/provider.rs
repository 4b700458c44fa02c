//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for chat-completion providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for the given conversation
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g. "openrouter")
    fn name(&self) -> &str;
}
