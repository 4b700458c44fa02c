//! Tool trait definition

use ashare_core::Result;
use ashare_llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;

/// A function the model can call
///
/// Each tool provides a name, a description the model reads to decide when
/// to call it, and a JSON schema for its input. An `Err` from
/// [`Tool::execute`] is handed back to the model as an error result; it
/// never ends the run.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with the model-supplied input
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name within a registry
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the input
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "symbol": { "type": "string", "pattern": "^[0-9]{6}$" }
    ///     },
    ///     "required": ["symbol"]
    /// });
    /// assert_eq!(schema["required"][0], "symbol");
    /// ```
    fn input_schema(&self) -> Value;

    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}
