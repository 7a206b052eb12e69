//! Consumers and ID sources shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sluice_core::SessionId;
use tokio::sync::Notify;

use crate::sse::consumer::{Acknowledgment, ConsumerError, ConsumerFactory, StreamConsumer};
use crate::sse::event::SseEvent;
use crate::sse::handle::StreamHandle;
use crate::sse::id_source::SessionIdSource;

/// Hands out the given IDs in order, then nothing.
pub struct FixedIds(Mutex<VecDeque<SessionId>>);

impl FixedIds {
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self(Mutex::new(ids.into_iter().map(SessionId::from).collect()))
    }
}

impl SessionIdSource for FixedIds {
    fn next_id(&self) -> Option<SessionId> {
        self.0.lock().pop_front()
    }
}

/// Never yields an ID.
pub struct NoIds;

impl SessionIdSource for NoIds {
    fn next_id(&self) -> Option<SessionId> {
        None
    }
}

/// Parks inside `next_id` until the test lets it go.
pub struct GatedIds {
    id: &'static str,
    entered: Barrier,
    release: Barrier,
}

impl GatedIds {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }

    /// Block until a caller is inside `next_id`.
    pub fn wait_entered(&self) {
        let _ = self.entered.wait();
    }

    /// Let the parked caller return its ID.
    pub fn release(&self) {
        let _ = self.release.wait();
    }
}

impl SessionIdSource for GatedIds {
    fn next_id(&self) -> Option<SessionId> {
        let _ = self.entered.wait();
        let _ = self.release.wait();
        Some(SessionId::from(self.id))
    }
}

/// Emits the payload back as a `message` event.
pub struct EchoConsumer;

#[async_trait]
impl StreamConsumer for EchoConsumer {
    async fn consume(
        &self,
        payload: Bytes,
        handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        let text = String::from_utf8_lossy(&payload).into_owned();
        handle.emit(SseEvent::message(text)).await?;
        Ok(Acknowledgment::accepted())
    }
}

/// Counts calls and emits nothing.
pub struct CountingConsumer(pub Arc<AtomicUsize>);

#[async_trait]
impl StreamConsumer for CountingConsumer {
    async fn consume(
        &self,
        _payload: Bytes,
        _handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        let _ = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Acknowledgment::accepted())
    }
}

/// Never finishes.
pub struct BlockingConsumer;

#[async_trait]
impl StreamConsumer for BlockingConsumer {
    async fn consume(
        &self,
        _payload: Bytes,
        _handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        std::future::pending().await
    }
}

/// Signals once it is running, then never finishes.
pub struct GatedConsumer(pub Arc<Notify>);

#[async_trait]
impl StreamConsumer for GatedConsumer {
    async fn consume(
        &self,
        _payload: Bytes,
        _handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        self.0.notify_one();
        std::future::pending().await
    }
}

/// Always fails.
pub struct FailingConsumer;

#[async_trait]
impl StreamConsumer for FailingConsumer {
    async fn consume(
        &self,
        _payload: Bytes,
        _handle: &StreamHandle,
    ) -> Result<Acknowledgment, ConsumerError> {
        Err(ConsumerError::Internal("boom".into()))
    }
}

/// Factory that binds every stream to the same consumer.
pub struct SharedFactory(Arc<dyn StreamConsumer>);

impl ConsumerFactory for SharedFactory {
    fn create(&self, _id: &SessionId) -> Arc<dyn StreamConsumer> {
        Arc::clone(&self.0)
    }
}

pub fn factory(consumer: Arc<dyn StreamConsumer>) -> SharedFactory {
    SharedFactory(consumer)
}

/// Open a standalone echo handle with the given ID.
pub fn echo_handle(id: &str) -> (Arc<StreamHandle>, tokio::sync::mpsc::Receiver<SseEvent>) {
    StreamHandle::open(
        &FixedIds::new([id]),
        &factory(Arc::new(EchoConsumer)),
        crate::sse::handle::HandleOptions::default(),
    )
    .expect("fixed id")
}
