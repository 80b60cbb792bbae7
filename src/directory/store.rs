//! Room directory implementation
//!
//! Maps primary and public identifiers to rooms. The directory lock covers
//! map access only: it is released before a room is handed out, and every
//! structural change inside a room happens under that room's own lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::RetryPolicy;
use crate::rtc::RtcBackend;

use super::error::DirectoryError;
use super::room::{public_id, Room};

#[derive(Default)]
struct Maps {
    rooms: HashMap<String, Arc<Room>>,
    streams: HashMap<String, Arc<Room>>,
}

/// Directory of every room on this server
pub struct RoomDirectory {
    maps: RwLock<Maps>,
    backend: Arc<dyn RtcBackend>,
    policy: RetryPolicy,
}

impl RoomDirectory {
    /// Create an empty directory whose rooms use `backend`
    pub fn new(backend: Arc<dyn RtcBackend>) -> Self {
        Self::with_policy(backend, RetryPolicy::default())
    }

    /// Create an empty directory with a custom renegotiation retry policy
    pub fn with_policy(backend: Arc<dyn RtcBackend>, policy: RetryPolicy) -> Self {
        Self {
            maps: RwLock::new(Maps::default()),
            backend,
            policy,
        }
    }

    pub fn backend(&self) -> &Arc<dyn RtcBackend> {
        &self.backend
    }

    /// Get the room for `primary_id`, creating it if needed
    ///
    /// Also maps the derived public identifier to the room if it is not
    /// mapped yet.
    pub async fn resolve(&self, primary_id: &str) -> Arc<Room> {
        let mut maps = self.maps.write().await;

        let room = match maps.rooms.get(primary_id) {
            Some(room) => Arc::clone(room),
            None => {
                let room = Arc::new(Room::create(
                    primary_id,
                    Arc::clone(&self.backend),
                    self.policy,
                ));
                maps.rooms.insert(primary_id.to_string(), Arc::clone(&room));

                tracing::info!(
                    room = %primary_id,
                    public_id = %room.public_id(),
                    rooms = maps.rooms.len(),
                    "Room created"
                );
                room
            }
        };

        let public = public_id(primary_id);
        maps.streams
            .entry(public)
            .or_insert_with(|| Arc::clone(&room));

        room
    }

    /// Get the room mapped to a public identifier; never creates
    pub async fn resolve_by_public_id(&self, public_id: &str) -> Result<Arc<Room>, DirectoryError> {
        let maps = self.maps.read().await;
        maps.streams
            .get(public_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(public_id.to_string()))
    }

    /// Get the room for `primary_id` if it exists
    pub async fn lookup(&self, primary_id: &str) -> Option<Arc<Room>> {
        self.maps.read().await.rooms.get(primary_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.maps.read().await.rooms.len()
    }
}
