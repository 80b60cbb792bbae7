//! Track registry implementation
//!
//! Per-room map of published tracks. The registry holds no lock of its own; it
//! lives inside the room state and is only touched while the room lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use crate::rtc::{LocalTrack, RemoteTrack, RtcBackend, RtcError, TrackSpec};

use super::error::RegistryError;
use super::track::TrackId;

/// Published tracks of one room, keyed by track id
#[derive(Default)]
pub struct TrackRegistry {
    tracks: HashMap<TrackId, Arc<dyn LocalTrack>>,
}

impl TrackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a forwardable local track mirroring `remote` and insert it
    ///
    /// The local track keeps the remote track's id and stream id. A track
    /// published again under the same id replaces the previous entry.
    pub fn insert_remote(
        &mut self,
        backend: &dyn RtcBackend,
        remote: &dyn RemoteTrack,
    ) -> Result<Arc<dyn LocalTrack>, RegistryError> {
        let spec = TrackSpec {
            id: remote.id(),
            stream_id: remote.stream_id(),
            codec: remote.codec(),
        };

        if !spec.codec.is_forwardable() {
            return Err(RegistryError::CodecUnsupported {
                track: spec.id,
                mime_type: spec.codec.mime_type,
            });
        }

        let local = backend.new_local_track(&spec).map_err(|e| match e {
            RtcError::CodecUnsupported(mime_type) => RegistryError::CodecUnsupported {
                track: spec.id.clone(),
                mime_type,
            },
            other => RegistryError::TrackAllocation(spec.id.clone(), other),
        })?;

        if self.tracks.insert(spec.id.clone(), Arc::clone(&local)).is_some() {
            tracing::debug!(track = %spec.id, "Replaced previously published track");
        }

        Ok(local)
    }

    /// Remove a track; returns whether it was present
    ///
    /// Only removes the entry if it still refers to the same local track, so a
    /// stale forwarding task cannot evict a newer publication of the same id.
    pub fn remove(&mut self, track: &Arc<dyn LocalTrack>) -> bool {
        match self.tracks.get(track.id()) {
            Some(current) if same_track(current, track) => {
                self.tracks.remove(track.id());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    /// Iterate over every published track
    pub fn iter(&self) -> impl Iterator<Item = (&TrackId, &Arc<dyn LocalTrack>)> {
        self.tracks.iter()
    }

    /// Sorted ids of every published track
    pub fn ids(&self) -> Vec<TrackId> {
        let mut ids: Vec<TrackId> = self.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl std::fmt::Debug for TrackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRegistry")
            .field("tracks", &self.ids())
            .finish()
    }
}

fn same_track(a: &Arc<dyn LocalTrack>, b: &Arc<dyn LocalTrack>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
