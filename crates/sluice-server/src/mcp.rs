//! Binds each stream to a protocol session.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sluice_core::SessionId;
use sluice_mcp::{McpEngine, McpSession};
use tracing::debug;

use crate::sse::{
    Acknowledgment, ConsumerError, ConsumerFactory, SseEvent, StreamConsumer, StreamHandle,
};

/// Creates one [`McpConsumer`] per stream from a shared engine.
pub struct McpConsumerFactory {
    engine: McpEngine,
}

impl McpConsumerFactory {
    /// Serve streams with `engine`.
    pub fn new(engine: McpEngine) -> Self {
        Self { engine }
    }
}

impl ConsumerFactory for McpConsumerFactory {
    fn create(&self, id: &SessionId) -> Arc<dyn StreamConsumer> {
        Arc::new(McpConsumer {
            session: self.engine.session(id),
        })
    }
}

/// Feeds payloads to a protocol session and answers on the stream.
pub struct McpConsumer {
    session: McpSession,
}

#[async_trait]
impl StreamConsumer for McpConsumer {
    async fn consume(
        &self,
        payload: Bytes,
        handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        let response = match self.session.handle_payload(&payload).await {
            Ok(response) => response,
            Err(err) if err.is_malformed_message() => {
                debug!(session_id = %handle.id(), error = %err, "rejecting malformed message");
                return Ok(Acknowledgment::rejected(format!("Invalid message: {err}")));
            }
            Err(err) => return Err(ConsumerError::Internal(err.to_string())),
        };

        if let Some(response) = response {
            let data = serde_json::to_string(&response)
                .map_err(|e| ConsumerError::Internal(e.to_string()))?;
            handle.emit(SseEvent::message(data)).await?;
        }
        Ok(Acknowledgment::accepted())
    }
}
