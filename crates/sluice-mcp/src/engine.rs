//! Engine entry point: one [`McpSession`] per transport session.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::context::{ServerInfo, SessionContext};
use crate::errors::McpError;
use crate::handlers;
use crate::registry::MethodRegistry;
use crate::tools::ToolRegistry;
use crate::types::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse};

/// Shared protocol engine.
///
/// Holds the method table and tool set; each stream gets its own
/// [`McpSession`] with independent handshake state.
#[derive(Clone)]
pub struct McpEngine {
    registry: Arc<MethodRegistry>,
    tools: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl McpEngine {
    /// Engine exposing `tools`.
    pub fn new(server_info: ServerInfo, tools: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(build_registry(MethodRegistry::HANDLER_TIMEOUT)),
            tools: Arc::new(tools),
            server_info,
        }
    }

    /// Engine exposing the built-in tools.
    pub fn with_builtin_tools(server_info: ServerInfo) -> Self {
        Self::new(server_info, ToolRegistry::with_builtins())
    }

    /// Override the per-method handler timeout.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.registry = Arc::new(build_registry(timeout));
        self
    }

    /// Identity reported during `initialize`.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Exposed tools.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start a protocol session bound to `session_id`.
    pub fn session(&self, session_id: &str) -> McpSession {
        McpSession {
            registry: Arc::clone(&self.registry),
            ctx: SessionContext::new(
                session_id,
                self.server_info.clone(),
                Arc::clone(&self.tools),
            ),
        }
    }
}

fn build_registry(timeout: Duration) -> MethodRegistry {
    let mut registry = MethodRegistry::new().with_timeout(timeout);
    handlers::register_all(&mut registry);
    registry
}

/// Protocol state for one stream.
pub struct McpSession {
    registry: Arc<MethodRegistry>,
    ctx: SessionContext,
}

enum Incoming {
    Request(JsonRpcRequest),
    Response,
}

impl McpSession {
    /// Session state (handshake results, session ID).
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Handle one raw message.
    ///
    /// - `Err` when the payload is not a JSON-RPC 2.0 message at all
    /// - `Ok(None)` for notifications and client responses
    /// - `Ok(Some(_))` for requests, including method-level errors
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<Option<JsonRpcResponse>, McpError> {
        match parse_message(payload)? {
            Incoming::Request(request) => Ok(self.registry.dispatch(request, &self.ctx).await),
            Incoming::Response => {
                debug!(session_id = %self.ctx.session_id, "ignoring client response");
                Ok(None)
            }
        }
    }
}

fn parse_message(payload: &[u8]) -> Result<Incoming, McpError> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| McpError::Parse {
        message: e.to_string(),
    })?;
    let Value::Object(obj) = value else {
        return Err(invalid("expected a JSON object"));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid("jsonrpc must be \"2.0\""));
    }

    if obj.contains_key("method") {
        let request: JsonRpcRequest =
            serde_json::from_value(Value::Object(obj)).map_err(|e| invalid(&e.to_string()))?;
        return Ok(Incoming::Request(request));
    }
    if is_response(&obj) {
        return Ok(Incoming::Response);
    }
    Err(invalid("message has neither method nor result"))
}

fn is_response(obj: &Map<String, Value>) -> bool {
    obj.contains_key("id") && (obj.contains_key("result") || obj.contains_key("error"))
}

fn invalid(message: &str) -> McpError {
    McpError::InvalidRequest {
        message: message.to_owned(),
    }
}
