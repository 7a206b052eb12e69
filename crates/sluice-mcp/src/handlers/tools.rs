//! Tool handlers: list and call.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::context::SessionContext;
use crate::errors::McpError;
use crate::handlers::require_string_param;
use crate::registry::MethodHandler;
use crate::tools::{CallToolResult, ToolError};

/// `tools/list`: every registered tool definition.
pub struct ListToolsHandler;

#[async_trait]
impl MethodHandler for ListToolsHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &SessionContext) -> Result<Value, McpError> {
        Ok(json!({ "tools": ctx.tools.definitions() }))
    }
}

/// `tools/call`: run a tool by name.
///
/// An unknown tool or malformed arguments is a protocol error; a tool that
/// runs and fails yields a result with `isError` set.
pub struct CallToolHandler;

#[async_trait]
impl MethodHandler for CallToolHandler {
    #[instrument(skip_all, fields(method = "tools/call", session_id = %ctx.session_id, tool))]
    async fn handle(&self, params: Option<Value>, ctx: &SessionContext) -> Result<Value, McpError> {
        let name = require_string_param(params.as_ref(), "name")?;
        let _ = tracing::Span::current().record("tool", name.as_str());
        let arguments = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .cloned()
            .unwrap_or_else(|| json!({}));

        let tool = ctx.tools.get(&name).ok_or_else(|| McpError::InvalidParams {
            message: format!("Tool {name} not found"),
        })?;

        let result = match tool.call(arguments).await {
            Ok(result) => result,
            Err(err @ ToolError::InvalidArguments { .. }) => {
                return Err(McpError::InvalidParams {
                    message: err.to_string(),
                });
            }
            Err(ToolError::Execution(message)) => {
                warn!(tool = name, error = %message, "tool execution failed");
                CallToolResult::error(message)
            }
        };

        serde_json::to_value(result).map_err(|e| McpError::Internal {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;

    #[tokio::test]
    async fn list_returns_builtins() {
        let ctx = make_test_context();
        let result = ListToolsHandler.handle(None, &ctx).await.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "addTwoNumbers");
        assert!(tools[0]["inputSchema"]["properties"]["a"].is_object());
    }

    #[tokio::test]
    async fn call_add() {
        let ctx = make_test_context();
        let result = CallToolHandler
            .handle(
                Some(json!({"name": "addTwoNumbers", "arguments": {"a": 1, "b": 2}})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "3");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn call_weather() {
        let ctx = make_test_context();
        let result = CallToolHandler
            .handle(
                Some(json!({"name": "get_weather", "arguments": {"city": "Lima"}})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "The weather in Lima is rainy");
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let ctx = make_test_context();
        let err = CallToolHandler
            .handle(Some(json!({"name": "nope"})), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidParams { .. }));
        assert_eq!(err.to_string(), "Tool nope not found");
    }

    #[tokio::test]
    async fn bad_arguments_are_invalid_params() {
        let ctx = make_test_context();
        let err = CallToolHandler
            .handle(Some(json!({"name": "addTwoNumbers", "arguments": {"a": 1}})), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidParams { .. }));
    }

    struct Broken;

    #[async_trait]
    impl crate::tools::Tool for Broken {
        fn definition(&self) -> crate::tools::ToolDefinition {
            crate::tools::ToolDefinition {
                name: "broken".into(),
                description: None,
                input_schema: json!({"type": "object"}),
            }
        }

        async fn call(&self, _arguments: Value) -> Result<CallToolResult, ToolError> {
            Err(ToolError::Execution("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn execution_failure_is_error_result() {
        let mut tools = crate::tools::ToolRegistry::new();
        tools.register(Broken);
        let ctx = SessionContext::new(
            "s1",
            crate::context::ServerInfo::new("sluice", "test"),
            std::sync::Arc::new(tools),
        );
        let result = CallToolHandler
            .handle(Some(json!({"name": "broken"})), &ctx)
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "disk on fire");
    }

    #[tokio::test]
    async fn name_required() {
        let ctx = make_test_context();
        assert!(CallToolHandler.handle(Some(json!({})), &ctx).await.is_err());
    }
}
