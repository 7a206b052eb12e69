//! Session-multiplexed SSE transport.
//!
//! - [`SessionRegistry`]: session ID → live [`StreamHandle`]
//! - [`StreamHandle`]: one outbound channel plus lifecycle state
//! - [`InboundRouter`]: client `POST` → matching handle
//! - [`LifecycleSupervisor`]: open, close, and exactly-once teardown

pub mod consumer;
pub mod error;
pub mod event;
pub mod handle;
pub mod id_source;
pub mod registry;
pub mod router;
pub mod stream;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer::{Acknowledgment, ConsumerError, ConsumerFactory, StreamConsumer};
pub use error::SessionError;
pub use event::SseEvent;
pub use handle::{EmitError, HandleOptions, HandleState, StreamHandle};
pub use id_source::{SessionIdSource, UuidIdSource};
pub use registry::SessionRegistry;
pub use router::{InboundEnvelope, InboundRouter};
pub use stream::SessionEventStream;
pub use supervisor::{CloseReason, LifecycleSupervisor};
