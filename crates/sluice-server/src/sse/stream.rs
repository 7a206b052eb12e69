//! Response body for one session.

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::sse::Event;
use futures::Stream;
use sluice_core::SessionId;
use tokio::sync::mpsc;

use crate::sse::event::SseEvent;
use crate::sse::supervisor::{CloseReason, LifecycleSupervisor};

/// Event stream fed by a session's outbound channel.
///
/// Ends when the handle releases its channel. Dropping it (the client went
/// away, or the body finished) routes through the supervisor's close path.
pub struct SessionEventStream {
    rx: mpsc::Receiver<SseEvent>,
    supervisor: Arc<LifecycleSupervisor>,
    id: SessionId,
}

impl SessionEventStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<SseEvent>,
        supervisor: Arc<LifecycleSupervisor>,
        id: SessionId,
    ) -> Self {
        Self { rx, supervisor, id }
    }

    /// Session this stream belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    #[cfg(test)]
    pub(crate) async fn recv(&mut self) -> Option<SseEvent> {
        self.rx.recv().await
    }
}

impl fmt::Debug for SessionEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEventStream")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Stream for SessionEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx
            .poll_recv(cx)
            .map(|event| event.map(|event| Ok(Event::from(event))))
    }
}

impl Drop for SessionEventStream {
    fn drop(&mut self) {
        let _ = self
            .supervisor
            .close(&self.id, CloseReason::ClientDisconnected);
    }
}
