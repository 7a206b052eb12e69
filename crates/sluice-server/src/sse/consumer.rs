//! Downstream consumer boundary.
//!
//! The transport never interprets payloads. Each stream is bound to one
//! [`StreamConsumer`] created by a [`ConsumerFactory`]; the consumer decides
//! what a payload means and may answer on the stream through the handle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use sluice_core::SessionId;

use crate::sse::handle::{EmitError, StreamHandle};

/// Synchronous answer to a `POST`, produced by the consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgment {
    /// HTTP status.
    pub status: StatusCode,
    /// Plain-text body.
    pub body: String,
}

impl Acknowledgment {
    /// Arbitrary status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `202 Accepted`.
    pub fn accepted() -> Self {
        Self::new(StatusCode::ACCEPTED, "Accepted")
    }

    /// `400` with a client-facing explanation.
    pub fn rejected(body: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }
}

impl IntoResponse for Acknowledgment {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

/// Consumer failure.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// The stream closed while the consumer was writing to it.
    #[error("stream closed during delivery")]
    StreamClosed,

    /// Delivery exceeded its time budget.
    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl From<EmitError> for ConsumerError {
    fn from(err: EmitError) -> Self {
        match err {
            EmitError::Closed => Self::StreamClosed,
            EmitError::Full => Self::Internal(err.to_string()),
        }
    }
}

/// Handles payloads routed to one stream.
#[async_trait]
pub trait StreamConsumer: Send + Sync {
    /// Process one payload. Events for the client go through `handle`.
    async fn consume(
        &self,
        payload: Bytes,
        handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError>;
}

/// Creates the consumer bound to a new stream.
pub trait ConsumerFactory: Send + Sync {
    /// Consumer for the session `id`.
    fn create(&self, id: &SessionId) -> Arc<dyn StreamConsumer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_is_202() {
        let ack = Acknowledgment::accepted();
        assert_eq!(ack.status, StatusCode::ACCEPTED);
        assert_eq!(ack.body, "Accepted");
    }

    #[test]
    fn rejected_is_400() {
        assert_eq!(
            Acknowledgment::rejected("Invalid message: x").status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn emit_errors_map() {
        assert!(matches!(
            ConsumerError::from(EmitError::Closed),
            ConsumerError::StreamClosed
        ));
        assert!(matches!(
            ConsumerError::from(EmitError::Full),
            ConsumerError::Internal(_)
        ));
    }
}
