//! # sluice-mcp
//!
//! Model Context Protocol engine served behind each sluice stream.
//!
//! - JSON-RPC 2.0 wire types and error codes
//! - Async method registry with per-call timeout and metrics
//! - Lifecycle methods (`initialize`, `notifications/initialized`, `ping`)
//! - Tool registry with `tools/list` and `tools/call`
//! - [`McpEngine`] / [`McpSession`]: one protocol session per stream

#![deny(unsafe_code)]

pub mod context;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod tools;
pub mod types;

pub use context::{ServerInfo, SessionContext};
pub use engine::{McpEngine, McpSession};
pub use errors::McpError;
pub use types::{JsonRpcRequest, JsonRpcResponse, RequestId};
