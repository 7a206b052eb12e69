//! `SluiceServer`: Axum HTTP server hosting the SSE transport.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, KeepAliveStream, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::sse::{
    Acknowledgment, ConsumerFactory, InboundEnvelope, InboundRouter, LifecycleSupervisor,
    SessionError, SessionEventStream, SessionIdSource, SessionRegistry, UuidIdSource,
};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Opens and tears down streams.
    pub supervisor: Arc<LifecycleSupervisor>,
    /// Routes inbound messages.
    pub inbound: Arc<InboundRouter>,
    /// Keep-alive comment interval.
    pub keep_alive: Duration,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The sluice server.
pub struct SluiceServer {
    config: ServerConfig,
    supervisor: Arc<LifecycleSupervisor>,
    inbound: Arc<InboundRouter>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl SluiceServer {
    /// Create a server with UUID v7 session IDs.
    pub fn new(config: ServerConfig, consumers: Arc<dyn ConsumerFactory>) -> Self {
        Self::with_id_source(config, Arc::new(UuidIdSource), consumers)
    }

    /// Create a server drawing session IDs from `ids`.
    pub fn with_id_source(
        config: ServerConfig,
        ids: Arc<dyn SessionIdSource>,
        consumers: Arc<dyn ConsumerFactory>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let supervisor = Arc::new(LifecycleSupervisor::new(
            Arc::clone(&registry),
            ids,
            consumers,
            config.handle_options(),
            config.message_path.clone(),
        ));
        Self {
            inbound: Arc::new(InboundRouter::new(registry)),
            shutdown: Arc::new(ShutdownCoordinator::new(Arc::clone(&supervisor))),
            supervisor,
            start_time: Instant::now(),
            metrics: None,
            config,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            supervisor: Arc::clone(&self.supervisor),
            inbound: Arc::clone(&self.inbound),
            keep_alive: self.config.keep_alive(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route(&self.config.stream_path, get(stream_handler))
            .route(&self.config.message_path, post(message_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address and the serve task. Triggering the shutdown
    /// coordinator closes every open stream and stops the listener.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let shutdown = Arc::clone(&self.shutdown);

        info!(
            %addr,
            stream_path = %self.config.stream_path,
            message_path = %self.config.message_path,
            "sluice listening"
        );

        let handle = tokio::spawn(async move {
            let signal = async move {
                let closed = shutdown.streams_closed().await;
                info!(closed, "listener stopping");
            };
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
            {
                error!(%error, "server error");
            }
            info!("server stopped");
        });

        Ok((addr, handle))
    }

    /// Get the lifecycle supervisor.
    pub fn supervisor(&self) -> &Arc<LifecycleSupervisor> {
        &self.supervisor
    }

    /// Get the session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.supervisor.registry()
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET <stream path>
async fn stream_handler(
    State(state): State<AppState>,
) -> Result<Sse<KeepAliveStream<SessionEventStream>>, SessionError> {
    let stream = state.supervisor.open()?;
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// POST <message path>?sessionId=<id>
async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Result<Acknowledgment, SessionError> {
    state
        .inbound
        .route(InboundEnvelope {
            session_id: query.session_id,
            payload: body,
        })
        .await
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.supervisor))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
