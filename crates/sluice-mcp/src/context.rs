//! Per-session protocol state shared with method handlers.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::tools::ToolRegistry;

/// Name and version reported to clients during `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Implementation name.
    pub name: String,
    /// Implementation version.
    pub version: String,
}

impl ServerInfo {
    /// Build from name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Client identity captured from `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client implementation name.
    pub name: String,
    /// Client implementation version.
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Default)]
struct Negotiated {
    protocol_version: Option<String>,
    client: Option<ClientInfo>,
    initialized: bool,
}

/// State for a single protocol session.
///
/// One context exists per stream; handlers receive it by reference.
pub struct SessionContext {
    /// Transport session ID this protocol session is bound to.
    pub session_id: String,
    /// Identity reported to the client.
    pub server_info: ServerInfo,
    /// Tools exposed through `tools/list` and `tools/call`.
    pub tools: Arc<ToolRegistry>,
    negotiated: Mutex<Negotiated>,
}

impl SessionContext {
    /// Create a fresh, uninitialized context.
    pub fn new(
        session_id: impl Into<String>,
        server_info: ServerInfo,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            server_info,
            tools,
            negotiated: Mutex::new(Negotiated::default()),
        }
    }

    /// Record the outcome of `initialize`.
    pub fn record_initialize(&self, protocol_version: String, client: Option<ClientInfo>) {
        let mut n = self.negotiated.lock();
        n.protocol_version = Some(protocol_version);
        n.client = client;
    }

    /// Mark the session as initialized (client sent `notifications/initialized`).
    pub fn mark_initialized(&self) {
        self.negotiated.lock().initialized = true;
    }

    /// Whether the client completed the initialize handshake.
    pub fn is_initialized(&self) -> bool {
        self.negotiated.lock().initialized
    }

    /// Negotiated protocol version, once `initialize` has run.
    pub fn protocol_version(&self) -> Option<String> {
        self.negotiated.lock().protocol_version.clone()
    }

    /// Client identity, once `initialize` has run.
    pub fn client_info(&self) -> Option<ClientInfo> {
        self.negotiated.lock().client.clone()
    }
}
