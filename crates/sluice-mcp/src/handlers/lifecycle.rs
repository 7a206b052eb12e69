//! Lifecycle handlers: initialize, initialized, ping.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::context::{ClientInfo, SessionContext};
use crate::errors::McpError;
use crate::handlers::require_string_param;
use crate::registry::MethodHandler;

/// Newest protocol revision this server speaks.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";

/// Every protocol revision this server accepts, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05", "2024-10-07"];

/// Pick the version to answer with: the client's if supported, otherwise ours.
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// `initialize`: version negotiation and capability exchange.
pub struct InitializeHandler;

#[async_trait]
impl MethodHandler for InitializeHandler {
    #[instrument(skip_all, fields(method = "initialize", session_id = %ctx.session_id))]
    async fn handle(&self, params: Option<Value>, ctx: &SessionContext) -> Result<Value, McpError> {
        let requested = require_string_param(params.as_ref(), "protocolVersion")?;
        let client = params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| serde_json::from_value::<ClientInfo>(c.clone()).ok());

        let version = negotiate_version(&requested);
        info!(
            requested,
            negotiated = version,
            client = client.as_ref().map_or("unknown", |c| c.name.as_str()),
            "session initializing"
        );
        ctx.record_initialize(version.to_owned(), client);

        Ok(json!({
            "protocolVersion": version,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": ctx.server_info,
        }))
    }
}

/// `notifications/initialized`: client finished the handshake.
pub struct InitializedHandler;

#[async_trait]
impl MethodHandler for InitializedHandler {
    async fn handle(&self, _params: Option<Value>, ctx: &SessionContext) -> Result<Value, McpError> {
        ctx.mark_initialized();
        debug!(session_id = %ctx.session_id, "session initialized");
        Ok(Value::Null)
    }
}

/// `ping`: liveness check, answered with an empty object.
pub struct PingHandler;

#[async_trait]
impl MethodHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _ctx: &SessionContext) -> Result<Value, McpError> {
        Ok(json!({}))
    }
}
