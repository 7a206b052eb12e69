//! Server shutdown: stop the listener, end every open stream, drain tasks.
//!
//! Open SSE responses never finish on their own, so the listener cannot stop
//! gracefully until the supervisor has closed them. [`ShutdownCoordinator`]
//! ties the two together behind one `CancellationToken`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::sse::LifecycleSupervisor;

/// Used when the caller passes no drain timeout.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// How a drain ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every task finished in time.
    Drained,
    /// The timeout hit first; remaining tasks were left running.
    TimedOut,
}

/// Owns the shutdown signal for one server.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    supervisor: Arc<LifecycleSupervisor>,
}

impl ShutdownCoordinator {
    /// Coordinator that closes `supervisor`'s streams on shutdown.
    pub fn new(supervisor: Arc<LifecycleSupervisor>) -> Self {
        Self {
            token: CancellationToken::new(),
            supervisor,
        }
    }

    /// A token cancelled when shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Start shutting down. Repeat calls are no-ops.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for shutdown, then close every open stream.
    ///
    /// Resolves with the number of streams this call closed. Used as the
    /// listener's graceful-shutdown signal.
    pub async fn streams_closed(&self) -> usize {
        self.token.cancelled().await;
        self.supervisor.shutdown()
    }

    /// Start shutdown and wait up to `timeout` for `tasks` to finish.
    pub async fn graceful_shutdown(
        &self,
        tasks: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> DrainOutcome {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        let started = Instant::now();
        self.shutdown();
        info!(
            tasks = tasks.len(),
            open_streams = self.supervisor.registry().len(),
            timeout_secs = timeout.as_secs(),
            "draining"
        );

        match tokio::time::timeout(timeout, futures::future::join_all(tasks)).await {
            Ok(_) => {
                info!(elapsed_ms = started.elapsed().as_millis(), "drained");
                DrainOutcome::Drained
            }
            Err(_) => {
                warn!(
                    remaining_streams = self.supervisor.registry().len(),
                    "drain timed out after {timeout:?}"
                );
                DrainOutcome::TimedOut
            }
        }
    }
}
