//! Outbound events.

use axum::response::sse::Event;

/// Event name announcing where to `POST` messages.
pub const ENDPOINT_EVENT: &str = "endpoint";
/// Event name carrying a protocol message.
pub const MESSAGE_EVENT: &str = "message";

/// One server-to-client event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; omitted when `None`.
    pub event: Option<String>,
    /// `data:` field.
    pub data: String,
}

impl SseEvent {
    /// Event with a name.
    pub fn named(event: &str, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.to_owned()),
            data: data.into(),
        }
    }

    /// The first event on every stream: `<message_path>?sessionId=<id>`.
    pub fn endpoint(message_path: &str, session_id: &str) -> Self {
        Self::named(ENDPOINT_EVENT, format!("{message_path}?sessionId={session_id}"))
    }

    /// A protocol message.
    pub fn message(data: impl Into<String>) -> Self {
        Self::named(MESSAGE_EVENT, data)
    }
}

impl From<SseEvent> for Event {
    fn from(ev: SseEvent) -> Self {
        let mut event = Event::default();
        if let Some(name) = ev.event {
            event = event.event(name);
        }
        event.data(ev.data)
    }
}
