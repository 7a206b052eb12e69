//! # sluice-server
//!
//! Axum HTTP server for the session-multiplexed SSE transport.
//!
//! - `GET <stream path>` opens a stream and announces its message endpoint
//! - `POST <message path>?sessionId=` routes a message to its stream
//! - Lifecycle supervision with exactly-once teardown on disconnect
//! - Protocol engine adapter, health and Prometheus endpoints
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod mcp;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod sse;

pub use config::ServerConfig;
pub use mcp::McpConsumerFactory;
pub use server::SluiceServer;
pub use shutdown::{DrainOutcome, ShutdownCoordinator};
