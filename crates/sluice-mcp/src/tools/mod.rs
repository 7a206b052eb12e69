//! Tool trait, result types, and the tool registry.

pub mod arithmetic;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use arithmetic::AddTwoNumbers;
pub use weather::GetWeather;

/// Tool metadata advertised by `tools/list`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the `arguments` object.
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// Result of `tools/call`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Output blocks.
    pub content: Vec<ContentBlock>,
    /// Set when the tool itself failed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Failed result carrying the error message as text.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Tool failure.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments do not match the tool's input schema.
    #[error("Invalid arguments for tool {tool}: {message}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Deserialization diagnostic.
        message: String,
    },

    /// The tool ran and failed.
    #[error("{0}")]
    Execution(String),
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Metadata for `tools/list`.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the client-supplied arguments object.
    async fn call(&self, arguments: Value) -> Result<CallToolResult, ToolError>;
}

/// Deserialize a tool's arguments, mapping failures to [`ToolError::InvalidArguments`].
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_owned(),
        message: e.to_string(),
    })
}

/// Tools in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the tools sluice ships with.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(AddTwoNumbers);
        reg.register(GetWeather);
        reg
    }

    /// Register a tool; a tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.definition().name;
        let tool: Arc<dyn Tool> = Arc::new(tool);
        if let Some(slot) = self.tools.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = tool;
        } else {
            self.tools.push((name, tool));
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| Arc::clone(t))
    }

    /// Definitions of every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, t)| t.definition()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
