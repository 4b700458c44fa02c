//! Tool definition types for LLM tool use

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition sent to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the tool in the registry)
    pub name: String,

    pub description: String,

    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Helpers to build JSON schemas for tool inputs
pub mod schema {
    use serde_json::{Value, json};

    /// Object schema with the given properties
    ///
    /// ```
    /// use ashare_llm::tools::schema;
    /// use serde_json::json;
    ///
    /// let schema = schema::object(
    ///     json!({ "symbol": schema::string("股票代码") }),
    ///     vec!["symbol"],
    /// );
    /// assert_eq!(schema["required"][0], "symbol");
    /// ```
    pub fn object(properties: Value, required: Vec<&str>) -> Value {
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn string(description: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
        })
    }

    /// String constrained by a regular expression
    pub fn pattern(description: &str, pattern: &str) -> Value {
        json!({
            "type": "string",
            "description": description,
            "pattern": pattern,
        })
    }
}
