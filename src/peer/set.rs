//! Ordered set of a room's connections

use super::entry::ConnectionEntry;

/// Active connections of one room
///
/// Order carries no meaning, but removals keep survivors in their relative
/// order. Like the track registry it holds no lock of its own.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    entries: Vec<ConnectionEntry>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection
    pub fn push(&mut self, entry: ConnectionEntry) {
        self.entries.push(entry);
    }

    /// Drop every entry whose connection is closed
    ///
    /// Filters and rebuilds instead of splicing during iteration, so adjacent
    /// closed entries are all removed. Returns the removed session ids.
    pub fn prune_closed(&mut self) -> Vec<u64> {
        let mut removed = Vec::new();
        self.entries.retain(|entry| {
            if entry.is_closed() {
                removed.push(entry.session_id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, session_id: u64) -> bool {
        self.entries.iter().any(|e| e.session_id == session_id)
    }

    /// Session ids in set order
    pub fn session_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.session_id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
