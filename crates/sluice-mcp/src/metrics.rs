//! Metric names recorded by the method registry.

/// Protocol requests (counter, labels: method).
pub const MCP_REQUESTS_TOTAL: &str = "mcp_requests_total";
/// Protocol errors (counter, labels: method, error_type).
pub const MCP_ERRORS_TOTAL: &str = "mcp_errors_total";
/// Protocol request duration (histogram, labels: method).
pub const MCP_REQUEST_DURATION_SECONDS: &str = "mcp_request_duration_seconds";
