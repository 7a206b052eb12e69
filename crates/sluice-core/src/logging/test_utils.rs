//! In-memory log capture for asserting on structured fields in tests.
//!
//! Transport code logs lifecycle events with a `session_id` field, so the
//! store can be queried per session as well as by level and message.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Emitting module path.
    pub target: String,
    /// Rendered `message` field.
    pub message: String,
    /// Every other field, rendered with `Display` or `Debug`.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    fn empty(level: Level, target: &str) -> Self {
        Self {
            level,
            target: target.to_owned(),
            message: String::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Value of a structured field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The `session_id` field, if recorded.
    pub fn session_id(&self) -> Option<&str> {
        self.field("session_id")
    }

    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for CapturedEvent {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }
}

/// Shared handle to the captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of everything captured so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.lock().clone()
    }

    /// First event at `level` whose message equals `message`.
    pub fn find(&self, level: Level, message: &str) -> Option<CapturedEvent> {
        self.lock()
            .iter()
            .find(|e| e.level == level && e.message == message)
            .cloned()
    }

    /// Events carrying `session_id = id`, in emission order.
    pub fn for_session(&self, id: &str) -> Vec<CapturedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.session_id() == Some(id))
            .cloned()
            .collect()
    }

    /// Whether any event at `level` has a message containing `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.lock().iter().filter(|e| e.level == level).count()
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut captured = CapturedEvent::empty(*meta.level(), meta.target());
        event.record(&mut captured);
        self.lock().push(captured);
    }
}

/// Capture every event emitted on the current thread until the guard drops.
///
/// Async tests must run on a current-thread runtime (the `#[tokio::test]`
/// default) for events from spawned tasks to be seen.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(logs.clone())
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}
