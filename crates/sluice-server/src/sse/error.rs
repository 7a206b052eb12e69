//! Transport error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info};

use crate::sse::consumer::ConsumerError;

/// Every failure the transport reports to a caller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A new stream could not be set up; nothing stays registered.
    #[error("Failed to initialize SSE transport: {reason}")]
    TransportInitialization {
        /// Why the stream could not be set up.
        reason: String,
    },

    /// `POST` arrived without a (non-empty) `sessionId`.
    #[error("Missing sessionId query parameter")]
    MissingSessionId,

    /// No routable stream under this ID.
    #[error("No active transport found for the given session ID, or session has expired.")]
    UnknownSession {
        /// The ID the client sent.
        session_id: String,
    },

    /// The stream left `OPEN` before or during delivery.
    #[error("Session is no longer accepting messages")]
    HandleClosed {
        /// The closing session.
        session_id: String,
    },

    /// An ID collided with a live entry.
    #[error("session {session_id} is already registered")]
    DuplicateSession {
        /// The colliding ID.
        session_id: String,
    },

    /// The downstream consumer failed unexpectedly.
    #[error("{operation} failed for session {session_id}: {source}")]
    Consumer {
        /// The affected session.
        session_id: String,
        /// Transport operation that was running.
        operation: &'static str,
        /// Underlying consumer failure.
        source: ConsumerError,
    },
}

impl SessionError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSessionId => StatusCode::BAD_REQUEST,
            Self::UnknownSession { .. } => StatusCode::NOT_FOUND,
            Self::HandleClosed { .. } => StatusCode::CONFLICT,
            Self::TransportInitialization { .. }
            | Self::DuplicateSession { .. }
            | Self::Consumer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransportInitialization { .. } => "transport_initialization",
            Self::MissingSessionId => "missing_session_id",
            Self::UnknownSession { .. } => "unknown_session",
            Self::HandleClosed { .. } => "handle_closed",
            Self::DuplicateSession { .. } => "duplicate_session",
            Self::Consumer { .. } => "consumer_error",
        }
    }

    /// Text sent to the client. Internal faults are not described.
    fn client_message(&self) -> String {
        match self {
            Self::DuplicateSession { .. } | Self::Consumer { .. } => {
                "Internal Server Error".to_owned()
            }
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            Self::MissingSessionId => debug!("message without sessionId rejected"),
            Self::UnknownSession { session_id } => {
                debug!(session_id, "message for unknown session");
            }
            Self::HandleClosed { session_id } => {
                info!(session_id, "message for closing session rejected");
            }
            Self::TransportInitialization { reason } => {
                error!(reason, "failed to initialize stream");
            }
            Self::DuplicateSession { session_id } => {
                error!(session_id, "duplicate session id");
            }
            Self::Consumer {
                session_id,
                operation,
                source,
            } => error!(session_id, operation, error = %source, "consumer failed"),
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), self.client_message()).into_response()
    }
}
