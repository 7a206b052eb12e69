//! Stream handle: one open event channel and its lifecycle state.
//!
//! State only moves forward: `OPEN → CLOSING → CLOSED`. The first
//! `OPEN → CLOSING` transition wins a compare-and-swap and cancels any
//! in-flight delivery; every later close attempt is a no-op.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::histogram;
use parking_lot::Mutex;
use sluice_core::SessionId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::metrics::SSE_DELIVER_DURATION_SECONDS;
use crate::sse::consumer::{Acknowledgment, ConsumerError, ConsumerFactory, StreamConsumer};
use crate::sse::error::SessionError;
use crate::sse::event::SseEvent;
use crate::sse::id_source::SessionIdSource;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle state of a [`StreamHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    /// Accepting messages and emitting events.
    Open,
    /// Close signal received; cleanup in progress.
    Closing,
    /// Unregistered and outbound channel released.
    Closed,
}

impl HandleState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            OPEN => Self::Open,
            CLOSING => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Per-stream tunables.
#[derive(Clone, Copy, Debug)]
pub struct HandleOptions {
    /// Outbound events buffered before emitters wait.
    pub channel_capacity: usize,
    /// Upper bound on one delivery.
    pub deliver_timeout: Duration,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            deliver_timeout: Duration::from_secs(60),
        }
    }
}

/// Why an event could not be emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// The stream is no longer open or its reader is gone.
    #[error("stream is closed")]
    Closed,
    /// The outbound buffer is full (non-waiting emit only).
    #[error("stream buffer is full")]
    Full,
}

/// One open server-to-client event stream.
pub struct StreamHandle {
    id: SessionId,
    state: AtomicU8,
    outbound: Mutex<Option<mpsc::Sender<SseEvent>>>,
    cancel: CancellationToken,
    consumer: Arc<dyn StreamConsumer>,
    deliver_timeout: Duration,
}

impl StreamHandle {
    /// Bind a new outbound channel to a fresh ID from `ids`.
    ///
    /// Returns the handle and the receiving half that feeds the response body.
    pub fn open(
        ids: &dyn SessionIdSource,
        consumers: &dyn ConsumerFactory,
        options: HandleOptions,
    ) -> Result<(Arc<Self>, mpsc::Receiver<SseEvent>), SessionError> {
        let id = ids
            .next_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::TransportInitialization {
                reason: "transport has no session ID.".into(),
            })?;

        let (tx, rx) = mpsc::channel(options.channel_capacity.max(1));
        let consumer = consumers.create(&id);
        let handle = Arc::new(Self {
            id,
            state: AtomicU8::new(OPEN),
            outbound: Mutex::new(Some(tx)),
            cancel: CancellationToken::new(),
            consumer,
            deliver_timeout: options.deliver_timeout,
        });
        Ok((handle, rx))
    }

    /// Session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandleState {
        HandleState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Whether the handle accepts messages.
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    /// Hand `payload` to the consumer and return its acknowledgment.
    ///
    /// Fails with [`SessionError::HandleClosed`] if the handle is not open,
    /// or if it starts closing before the consumer finishes.
    pub async fn deliver(&self, payload: Bytes) -> Result<Acknowledgment, SessionError> {
        if !self.is_open() {
            return Err(self.closed());
        }

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(self.closed()),
            result = tokio::time::timeout(self.deliver_timeout, self.consumer.consume(payload, self)) => {
                match result {
                    Ok(Ok(ack)) => Ok(ack),
                    Ok(Err(ConsumerError::StreamClosed)) => Err(self.closed()),
                    Ok(Err(source)) => Err(self.consumer_fault(source)),
                    Err(_elapsed) => Err(self.consumer_fault(ConsumerError::TimedOut(self.deliver_timeout))),
                }
            }
        };
        histogram!(SSE_DELIVER_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
        outcome
    }

    /// Queue an event, waiting for buffer space.
    ///
    /// Gives up with [`EmitError::Closed`] as soon as the handle starts closing.
    pub async fn emit(&self, event: SseEvent) -> Result<(), EmitError> {
        let sender = self.sender().ok_or(EmitError::Closed)?;
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(EmitError::Closed),
            result = sender.send(event) => result.map_err(|_| EmitError::Closed),
        }
    }

    /// Queue an event without waiting.
    pub fn try_emit(&self, event: SseEvent) -> Result<(), EmitError> {
        let sender = self.sender().ok_or(EmitError::Closed)?;
        sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => EmitError::Full,
            TrySendError::Closed(_) => EmitError::Closed,
        })
    }

    /// Close the handle. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        if !self.begin_closing() {
            return false;
        }
        self.finish_close();
        true
    }

    /// `OPEN → CLOSING`; cancels in-flight work. `false` if already past `OPEN`.
    pub(crate) fn begin_closing(&self) -> bool {
        let won = self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.cancel.cancel();
        }
        won
    }

    /// Release the outbound channel and mark `CLOSED`.
    pub(crate) fn finish_close(&self) {
        drop(self.outbound.lock().take());
        self.state.store(CLOSED, Ordering::Release);
    }

    fn sender(&self) -> Option<mpsc::Sender<SseEvent>> {
        if !self.is_open() {
            return None;
        }
        self.outbound.lock().clone()
    }

    fn closed(&self) -> SessionError {
        SessionError::HandleClosed {
            session_id: self.id.to_string(),
        }
    }

    fn consumer_fault(&self, source: ConsumerError) -> SessionError {
        SessionError::Consumer {
            session_id: self.id.to_string(),
            operation: "deliver",
            source,
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
