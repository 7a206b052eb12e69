//! Protocol method handlers and shared parameter helpers.

pub mod lifecycle;
pub mod tools;

use serde_json::Value;

use crate::errors::McpError;
use crate::registry::MethodRegistry;

/// Register every built-in method on `registry`.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("initialize", lifecycle::InitializeHandler);
    registry.register("notifications/initialized", lifecycle::InitializedHandler);
    registry.register("ping", lifecycle::PingHandler);
    registry.register("tools/list", tools::ListToolsHandler);
    registry.register("tools/call", tools::CallToolHandler);
}

/// Extract a required parameter.
pub fn require_param<'a>(params: Option<&'a Value>, key: &str) -> Result<&'a Value, McpError> {
    params
        .and_then(|p| p.get(key))
        .ok_or_else(|| McpError::InvalidParams {
            message: format!("Missing required parameter '{key}'"),
        })
}

/// Extract a required string parameter.
pub fn require_string_param(params: Option<&Value>, key: &str) -> Result<String, McpError> {
    require_param(params, key)?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| McpError::InvalidParams {
            message: format!("Parameter '{key}' must be a string"),
        })
}
