//! Session registry: session ID → live stream handle.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sluice_core::SessionId;

use crate::sse::error::SessionError;
use crate::sse::handle::StreamHandle;

/// Concurrent map of open streams.
///
/// Sharded, so operations on different IDs never contend on one lock;
/// operations on the same ID serialize on its shard.
#[derive(Default)]
pub struct SessionRegistry {
    entries: DashMap<SessionId, Arc<StreamHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` under `id`.
    ///
    /// A live entry under the same ID is left untouched and the call fails
    /// with [`SessionError::DuplicateSession`].
    pub fn register(&self, id: SessionId, handle: Arc<StreamHandle>) -> Result<(), SessionError> {
        match self.entries.entry(id) {
            Entry::Occupied(existing) => Err(SessionError::DuplicateSession {
                session_id: existing.key().to_string(),
            }),
            Entry::Vacant(slot) => {
                let _ = slot.insert(handle);
                Ok(())
            }
        }
    }

    /// Routable handle for `id`: present and still `OPEN`.
    pub fn lookup(&self, id: &str) -> Option<Arc<StreamHandle>> {
        self.get(id).filter(|handle| handle.is_open())
    }

    /// Handle for `id` in any state.
    pub(crate) fn get(&self, id: &str) -> Option<Arc<StreamHandle>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove `id`. Returns whether an entry was removed; absent IDs are a no-op.
    pub fn unregister(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Number of entries, routable or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of registered IDs.
    pub fn ids(&self) -> Vec<SessionId> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}
