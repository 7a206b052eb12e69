//! JSON-RPC error codes and the engine error type.

use crate::types::JsonRpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error type returned by handlers and the engine.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Payload is not valid JSON.
    #[error("Parse error: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// Payload is JSON but not a JSON-RPC 2.0 message.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What is wrong with the message.
        message: String,
    },

    /// No handler registered for the method.
    #[error("Method not found: {method}")]
    MethodNotFound {
        /// The requested method.
        method: String,
    },

    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Unexpected failure inside a handler.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl McpError {
    /// Numeric JSON-RPC code for this variant.
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse { .. } => PARSE_ERROR,
            Self::InvalidRequest { .. } => INVALID_REQUEST,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::InvalidParams { .. } => "invalid_params",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Whether the error means the payload never reached a handler.
    ///
    /// The transport answers these with a client error instead of a
    /// JSON-RPC response on the stream.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::InvalidRequest { .. })
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> JsonRpcErrorBody {
        JsonRpcErrorBody {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}
