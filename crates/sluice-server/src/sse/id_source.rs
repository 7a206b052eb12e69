//! Session ID generation.

use sluice_core::SessionId;

/// Supplies identifiers for new streams.
pub trait SessionIdSource: Send + Sync {
    /// A fresh ID, or `None` when the transport cannot provide one.
    fn next_id(&self) -> Option<SessionId>;
}

/// Time-ordered UUID v7 IDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdSource;

impl SessionIdSource for UuidIdSource {
    fn next_id(&self) -> Option<SessionId> {
        Some(SessionId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<SessionId> = (0..1000).filter_map(|_| UuidIdSource.next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ids_are_non_empty() {
        assert!(!UuidIdSource.next_id().unwrap().is_empty());
    }
}
