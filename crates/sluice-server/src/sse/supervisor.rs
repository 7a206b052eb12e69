//! Lifecycle supervisor: opens streams and guarantees one teardown each.
//!
//! Teardown order for the winning close:
//! 1. `OPEN → CLOSING` (compare-and-swap; cancels in-flight delivery)
//! 2. unregister from the registry
//! 3. release the outbound channel (ends the response body)
//! 4. `CLOSED`

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::metrics::{SSE_STREAMS_ACTIVE, SSE_STREAMS_CLOSED_TOTAL, SSE_STREAMS_OPENED_TOTAL};
use crate::sse::consumer::ConsumerFactory;
use crate::sse::error::SessionError;
use crate::sse::event::SseEvent;
use crate::sse::handle::{HandleOptions, HandleState, StreamHandle};
use crate::sse::id_source::SessionIdSource;
use crate::sse::registry::SessionRegistry;
use crate::sse::stream::SessionEventStream;

/// Why a stream was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The client went away (response body dropped).
    ClientDisconnected,
    /// The stream could not be written.
    TransportError,
    /// The server is stopping.
    Shutdown,
}

impl CloseReason {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientDisconnected => "client_disconnected",
            Self::TransportError => "transport_error",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns stream creation and teardown.
pub struct LifecycleSupervisor {
    registry: Arc<SessionRegistry>,
    ids: Arc<dyn SessionIdSource>,
    consumers: Arc<dyn ConsumerFactory>,
    options: HandleOptions,
    message_path: String,
    teardowns: AtomicU64,
    shutting_down: AtomicBool,
}

impl LifecycleSupervisor {
    /// Supervisor announcing `message_path` as the POST target.
    pub fn new(
        registry: Arc<SessionRegistry>,
        ids: Arc<dyn SessionIdSource>,
        consumers: Arc<dyn ConsumerFactory>,
        options: HandleOptions,
        message_path: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            ids,
            consumers,
            options,
            message_path: message_path.into(),
            teardowns: AtomicU64::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// The registry streams are stored in.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Completed teardowns since start.
    pub fn teardowns(&self) -> u64 {
        self.teardowns.load(Ordering::Acquire)
    }

    /// Whether new streams are being refused.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Open a stream: create a handle, register it, then queue the
    /// `endpoint` event. The returned stream closes the session when dropped.
    pub fn open(self: &Arc<Self>) -> Result<SessionEventStream, SessionError> {
        if self.is_shutting_down() {
            return Err(SessionError::TransportInitialization {
                reason: "server is shutting down.".into(),
            });
        }

        let (handle, rx) =
            StreamHandle::open(self.ids.as_ref(), self.consumers.as_ref(), self.options)?;
        let id = handle.id().clone();
        if let Err(err) = self.registry.register(id.clone(), Arc::clone(&handle)) {
            let _ = handle.close();
            return Err(err);
        }
        counter!(SSE_STREAMS_OPENED_TOTAL).increment(1);
        gauge!(SSE_STREAMS_ACTIVE).increment(1.0);

        // shutdown may have snapshotted the registry before this entry landed
        if self.is_shutting_down() {
            let _ = self.close(&id, CloseReason::Shutdown);
            return Err(SessionError::TransportInitialization {
                reason: "server is shutting down.".into(),
            });
        }

        let stream = SessionEventStream::new(rx, Arc::clone(self), id.clone());
        if let Err(err) = handle.try_emit(SseEvent::endpoint(&self.message_path, &id)) {
            let _ = self.close(&id, CloseReason::TransportError);
            return Err(SessionError::TransportInitialization {
                reason: format!("could not announce endpoint: {err}"),
            });
        }

        info!(session_id = %id, "stream opened");
        Ok(stream)
    }

    /// Close `id`. Returns `true` only for the call that performed the teardown.
    pub fn close(&self, id: &str, reason: CloseReason) -> bool {
        let Some(handle) = self.registry.get(id) else {
            return false;
        };
        if !handle.begin_closing() {
            if handle.state() == HandleState::Closed {
                // closed directly on the handle; drop the dead entry
                let _ = self.registry.unregister(id);
            }
            debug!(session_id = id, %reason, "close already in progress");
            return false;
        }

        let _ = self.registry.unregister(id);
        handle.finish_close();

        let _ = self.teardowns.fetch_add(1, Ordering::AcqRel);
        counter!(SSE_STREAMS_CLOSED_TOTAL, "reason" => reason.as_str()).increment(1);
        gauge!(SSE_STREAMS_ACTIVE).decrement(1.0);
        info!(session_id = id, reason = reason.as_str(), "stream closed");
        true
    }

    /// Close every registered stream. Returns how many this call tore down.
    pub fn close_all(&self, reason: CloseReason) -> usize {
        self.registry
            .ids()
            .iter()
            .filter(|id| self.close(id, reason))
            .count()
    }

    /// Refuse new streams and close every open one.
    pub fn shutdown(&self) -> usize {
        self.shutting_down.store(true, Ordering::Release);
        let closed = self.close_all(CloseReason::Shutdown);
        info!(closed, "all streams closed for shutdown");
        closed
    }
}
