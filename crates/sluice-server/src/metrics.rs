//! Prometheus metrics recorder and `/metrics` rendering.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric names; protocol-level ones live with the engine.

/// Streams opened (counter).
pub const SSE_STREAMS_OPENED_TOTAL: &str = "sse_streams_opened_total";
/// Streams torn down (counter, labels: reason).
pub const SSE_STREAMS_CLOSED_TOTAL: &str = "sse_streams_closed_total";
/// Streams currently open (gauge).
pub const SSE_STREAMS_ACTIVE: &str = "sse_streams_active";
/// Inbound messages by routing outcome (counter, labels: outcome).
pub const SSE_MESSAGES_ROUTED_TOTAL: &str = "sse_messages_routed_total";
/// Time spent in one delivery (histogram).
pub const SSE_DELIVER_DURATION_SECONDS: &str = "sse_deliver_duration_seconds";

pub use sluice_mcp::metrics::{
    MCP_ERRORS_TOTAL, MCP_REQUEST_DURATION_SECONDS, MCP_REQUESTS_TOTAL,
};
