//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::SessionContext;
use crate::errors::McpError;
use crate::metrics::{MCP_ERRORS_TOTAL, MCP_REQUESTS_TOTAL, MCP_REQUEST_DURATION_SECONDS};
use crate::types::{JsonRpcRequest, JsonRpcResponse};

/// Trait implemented by every protocol method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler with the given params and session context.
    async fn handle(&self, params: Option<Value>, ctx: &SessionContext) -> Result<Value, McpError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    timeout: Duration,
}

impl MethodRegistry {
    /// Maximum time a single handler is allowed to run by default.
    pub const HANDLER_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            timeout: Self::HANDLER_TIMEOUT,
        }
    }

    /// Override the per-call handler timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request to the appropriate handler.
    ///
    /// Returns `None` for notifications: their handlers still run, but
    /// failures are only logged.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        ctx: &SessionContext,
    ) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        let is_notification = id.is_none();
        counter!(MCP_REQUESTS_TOTAL, "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            if is_notification {
                debug!(method, session_id = %ctx.session_id, "ignoring unknown notification");
                return None;
            }
            let err = McpError::MethodNotFound {
                method: method.clone(),
            };
            counter!(MCP_ERRORS_TOTAL, "method" => method, "error_type" => err.kind())
                .increment(1);
            return Some(JsonRpcResponse::error(id, err.to_error_body()));
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, handler.handle(params, ctx)).await;

        let outcome = match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                counter!(MCP_ERRORS_TOTAL, "method" => method.clone(), "error_type" => err.kind())
                    .increment(1);
                Err(err)
            }
            Err(_elapsed) => {
                counter!(MCP_ERRORS_TOTAL, "method" => method.clone(), "error_type" => "timeout")
                    .increment(1);
                tracing::error!(method, "handler timed out after {:?}", self.timeout);
                Err(McpError::Internal {
                    message: format!("Handler for '{method}' timed out"),
                })
            }
        };

        let duration = start.elapsed();
        histogram!(MCP_REQUEST_DURATION_SECONDS, "method" => method.clone())
            .record(duration.as_secs_f64());

        if duration.as_secs() >= 5 {
            warn!(
                method,
                duration_secs = duration.as_secs_f64(),
                "slow protocol request"
            );
        }

        if is_notification {
            if let Err(err) = outcome {
                warn!(method, error = %err, "notification handler failed");
            }
            return None;
        }

        Some(match outcome {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, err.to_error_body()),
        })
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServerInfo;
    use crate::errors;
    use crate::tools::ToolRegistry;
    use crate::types::RequestId;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Test handler implementations ────────────────────────────────

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            params: Option<Value>,
            _ctx: &SessionContext,
        ) -> Result<Value, McpError> {
            Ok(params.unwrap_or(json!(null)))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl MethodHandler for FailHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &SessionContext,
        ) -> Result<Value, McpError> {
            Err(McpError::Internal {
                message: "boom".into(),
            })
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl MethodHandler for SlowHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &SessionContext,
        ) -> Result<Value, McpError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!(null))
        }
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl MethodHandler for CountingHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &SessionContext,
        ) -> Result<Value, McpError> {
            let _ = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!({}))
        }
    }

    fn ctx() -> SessionContext {
        SessionContext::new(
            "s1",
            ServerInfo::new("sluice", "test"),
            Arc::new(ToolRegistry::new()),
        )
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(RequestId::Number(id), method, params)
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_and_dispatch_success() {
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);

        let resp = reg
            .dispatch(request(1, "echo", Some(json!({"x": 1}))), &ctx())
            .await
            .unwrap();
        assert_eq!(resp.id, Some(RequestId::Number(1)));
        assert_eq!(resp.result.unwrap()["x"], 1);
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn dispatch_records_named_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);
        let _ = reg.dispatch(request(1, "echo", None), &ctx()).await;
        let _ = reg.dispatch(request(2, "nope", None), &ctx()).await;

        let output = handle.render();
        assert!(output.contains(&format!("{MCP_REQUESTS_TOTAL}{{method=\"echo\"}} 1")));
        assert!(output.contains(&format!("{MCP_ERRORS_TOTAL}{{method=\"nope\"")));
        assert!(output.contains(MCP_REQUEST_DURATION_SECONDS));
    }

    #[tokio::test]
    async fn unknown_method_returns_method_not_found() {
        let reg = MethodRegistry::new();
        let resp = reg
            .dispatch(request(2, "resources/list", None), &ctx())
            .await
            .unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, errors::METHOD_NOT_FOUND);
        assert!(err.message.contains("resources/list"));
    }

    #[tokio::test]
    async fn handler_error_becomes_error_response() {
        let mut reg = MethodRegistry::new();
        reg.register("fail", FailHandler);
        let resp = reg.dispatch(request(3, "fail", None), &ctx()).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, errors::INTERNAL_ERROR);
        assert_eq!(err.message, "boom");
    }

    #[tokio::test]
    async fn notification_runs_handler_without_response() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut reg = MethodRegistry::new();
        reg.register("notify", CountingHandler(Arc::clone(&count)));

        let resp = reg
            .dispatch(JsonRpcRequest::notification("notify", None), &ctx())
            .await;
        assert!(resp.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_notification_is_silent() {
        let reg = MethodRegistry::new();
        let resp = reg
            .dispatch(JsonRpcRequest::notification("notifications/cancelled", None), &ctx())
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn failing_notification_is_silent() {
        let mut reg = MethodRegistry::new();
        reg.register("fail", FailHandler);
        let resp = reg
            .dispatch(JsonRpcRequest::notification("fail", None), &ctx())
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        let mut reg = MethodRegistry::new().with_timeout(Duration::from_secs(1));
        reg.register("slow", SlowHandler);
        let resp = reg.dispatch(request(4, "slow", None), &ctx()).await.unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err.code, errors::INTERNAL_ERROR);
        assert!(err.message.contains("timed out"));
    }

    #[test]
    fn methods_sorted() {
        let mut reg = MethodRegistry::new();
        reg.register("b", EchoHandler);
        reg.register("a", EchoHandler);
        assert_eq!(reg.methods(), vec!["a", "b"]);
        assert!(reg.has_method("a"));
        assert!(!reg.has_method("c"));
    }
}
