//! Core Agent trait definition

use crate::{Context, Result};
use async_trait::async_trait;

/// Trait implemented by anything that turns an input string into a result string
///
/// The analyst takes a stock code and returns a Markdown report; the
/// context carries per-run values such as the code and the model used.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process input and return output
    async fn process(&self, input: String, context: &mut Context) -> Result<String>;

    /// Get the agent's name
    fn name(&self) -> &str;
}
