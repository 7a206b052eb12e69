//! Inbound router: client message → matching stream.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::debug;

use crate::metrics::SSE_MESSAGES_ROUTED_TOTAL;
use crate::sse::consumer::Acknowledgment;
use crate::sse::error::SessionError;
use crate::sse::registry::SessionRegistry;

/// One client-to-server message as received over HTTP.
#[derive(Clone, Debug)]
pub struct InboundEnvelope {
    /// `sessionId` query value, if any.
    pub session_id: Option<String>,
    /// Request body, uninterpreted.
    pub payload: Bytes,
}

/// Stateless demultiplexer over the registry.
pub struct InboundRouter {
    registry: Arc<SessionRegistry>,
}

impl InboundRouter {
    /// Route against `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `envelope` to its stream. Never retries.
    pub async fn route(&self, envelope: InboundEnvelope) -> Result<Acknowledgment, SessionError> {
        let result = self.route_inner(envelope).await;
        let outcome = match &result {
            Ok(_) => "delivered",
            Err(err) => err.kind(),
        };
        counter!(SSE_MESSAGES_ROUTED_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn route_inner(&self, envelope: InboundEnvelope) -> Result<Acknowledgment, SessionError> {
        let InboundEnvelope {
            session_id,
            payload,
        } = envelope;

        let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
            return Err(SessionError::MissingSessionId);
        };
        let Some(handle) = self.registry.lookup(&session_id) else {
            return Err(SessionError::UnknownSession { session_id });
        };

        debug!(session_id, bytes = payload.len(), "routing message");
        handle.deliver(payload).await
    }
}
