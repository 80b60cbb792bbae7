//! Room negotiator
//!
//! Owns the room lock and every structural mutation of a room. Publishes,
//! unpublishes, joins and connection closes all funnel into [`Negotiator::reconcile`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::peer::{ConnectionEntry, ConnectionSet, WriteError};
use crate::registry::{RegistryError, TrackId, TrackRegistry};
use crate::rtc::{LocalTrack, PeerConnection, RemoteTrack, RtcBackend, RtcError};
use crate::session::message::{SignalError, SignalMessage};

use super::policy::RetryPolicy;

/// State guarded by the room lock
#[derive(Debug, Default)]
pub struct RoomState {
    pub connections: ConnectionSet,
    pub tracks: TrackRegistry,
}

/// Result of one reconciliation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// An attempt completed for every connection
    Converged { attempts: u32 },
    /// Every attempt failed; a deferred pass is pending
    Deferred { attempts: u32 },
}

impl ReconcileOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, ReconcileOutcome::Converged { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ReconcileOutcome::Converged { attempts } | ReconcileOutcome::Deferred { attempts } => {
                *attempts
            }
        }
    }
}

/// Snapshot of a room's size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomStats {
    pub connections: usize,
    pub tracks: usize,
}

/// Reason an attempt asked for a retry
#[derive(Debug)]
enum AttemptError {
    Detach {
        session_id: u64,
        track: TrackId,
        source: RtcError,
    },
    Attach {
        session_id: u64,
        track: TrackId,
        source: RtcError,
    },
    Offer {
        session_id: u64,
        source: RtcError,
    },
    Encode {
        session_id: u64,
        source: SignalError,
    },
    Write {
        session_id: u64,
        source: WriteError,
    },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Detach {
                session_id,
                track,
                source,
            } => write!(f, "session {}: detach {} failed: {}", session_id, track, source),
            AttemptError::Attach {
                session_id,
                track,
                source,
            } => write!(f, "session {}: attach {} failed: {}", session_id, track, source),
            AttemptError::Offer { session_id, source } => {
                write!(f, "session {}: offer failed: {}", session_id, source)
            }
            AttemptError::Encode { session_id, source } => {
                write!(f, "session {}: {}", session_id, source)
            }
            AttemptError::Write { session_id, source } => {
                write!(f, "session {}: offer not sent: {}", session_id, source)
            }
        }
    }
}

/// Renegotiation engine for one room
pub struct Negotiator {
    room: String,
    backend: Arc<dyn RtcBackend>,
    policy: RetryPolicy,
    state: Mutex<RoomState>,
    retry_pending: AtomicBool,
}

impl Negotiator {
    /// Create an engine for an empty room
    pub fn new(room: impl Into<String>, backend: Arc<dyn RtcBackend>, policy: RetryPolicy) -> Self {
        Self {
            room: room.into(),
            backend,
            policy,
            state: Mutex::new(RoomState::default()),
            retry_pending: AtomicBool::new(false),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether a deferred pass is scheduled
    pub fn has_pending_retry(&self) -> bool {
        self.retry_pending.load(Ordering::Acquire)
    }

    /// Add a connection and renegotiate the room
    pub async fn join(self: &Arc<Self>, entry: ConnectionEntry) -> ReconcileOutcome {
        let session_id = entry.session_id;
        {
            let mut state = self.state.lock().await;
            state.connections.push(entry);
            tracing::info!(
                room = %self.room,
                session_id = session_id,
                connections = state.connections.len(),
                "Connection joined"
            );
        }

        self.reconcile().await
    }

    /// Register a forwardable mirror of `remote` and renegotiate the room
    pub async fn publish(
        self: &Arc<Self>,
        remote: &dyn RemoteTrack,
    ) -> Result<Arc<dyn LocalTrack>, RegistryError> {
        let local = {
            let mut state = self.state.lock().await;
            state.tracks.insert_remote(self.backend.as_ref(), remote)?
        };

        tracing::info!(
            room = %self.room,
            track = %local.id(),
            stream = local.stream_id(),
            codec = %local.codec().mime_type,
            "Track published"
        );

        self.reconcile().await;
        Ok(local)
    }

    /// Remove a published track and renegotiate the room
    ///
    /// Renegotiates even if the track was already gone.
    pub async fn unpublish(self: &Arc<Self>, track: &Arc<dyn LocalTrack>) -> bool {
        let removed = {
            let mut state = self.state.lock().await;
            state.tracks.remove(track)
        };

        if removed {
            tracing::info!(room = %self.room, track = %track.id(), "Track unpublished");
        }

        self.reconcile().await;
        removed
    }

    /// Align every connection with the track registry and push fresh offers
    ///
    /// Makes at most `max_attempts` attempts under the room lock. If all of
    /// them fail the lock is released and a single deferred driver is
    /// scheduled. A converged pass is followed by key-frame requests.
    pub async fn reconcile(self: &Arc<Self>) -> ReconcileOutcome {
        let outcome = self.run_pass().await;

        match outcome {
            ReconcileOutcome::Converged { .. } => {
                self.dispatch_key_frames().await;
            }
            ReconcileOutcome::Deferred { .. } => {
                self.schedule_retry();
            }
        }

        outcome
    }

    async fn run_pass(&self) -> ReconcileOutcome {
        let mut state = self.state.lock().await;

        for attempt in 1..=self.policy.max_attempts {
            match Self::attempt(&self.room, &mut state).await {
                Ok(()) => {
                    tracing::debug!(
                        room = %self.room,
                        attempt = attempt,
                        connections = state.connections.len(),
                        tracks = state.tracks.len(),
                        "Room reconciled"
                    );
                    return ReconcileOutcome::Converged { attempts: attempt };
                }
                Err(e) => {
                    tracing::debug!(
                        room = %self.room,
                        attempt = attempt,
                        error = %e,
                        "Reconciliation attempt failed"
                    );
                }
            }
        }

        tracing::warn!(
            room = %self.room,
            attempts = self.policy.max_attempts,
            cooldown_ms = self.policy.cooldown.as_millis() as u64,
            "Reconciliation deferred"
        );

        ReconcileOutcome::Deferred {
            attempts: self.policy.max_attempts,
        }
    }

    async fn attempt(room: &str, state: &mut RoomState) -> Result<(), AttemptError> {
        let pruned = state.connections.prune_closed();
        if !pruned.is_empty() {
            tracing::info!(room = %room, sessions = ?pruned, "Pruned closed connections");
        }

        let tracks = &state.tracks;
        for entry in state.connections.iter() {
            Self::sync_entry(entry, tracks).await?;
        }

        Ok(())
    }

    async fn sync_entry(entry: &ConnectionEntry, tracks: &TrackRegistry) -> Result<(), AttemptError> {
        let session_id = entry.session_id;
        let pc = &entry.connection;
        let mut present: HashSet<TrackId> = HashSet::new();

        for id in pc.sender_track_ids().await {
            if tracks.contains(&id) {
                present.insert(id);
                continue;
            }
            pc.remove_track(&id)
                .await
                .map_err(|source| AttemptError::Detach {
                    session_id,
                    track: id.clone(),
                    source,
                })?;
        }

        // Inbound paths are never echoed back as senders
        for receiver in pc.receivers().await {
            present.insert(receiver.track_id);
        }

        for (id, track) in tracks.iter() {
            if present.contains(id) {
                continue;
            }
            pc.add_track(Arc::clone(track))
                .await
                .map_err(|source| AttemptError::Attach {
                    session_id,
                    track: id.clone(),
                    source,
                })?;
        }

        let offer = pc
            .create_offer()
            .await
            .map_err(|source| AttemptError::Offer { session_id, source })?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(|source| AttemptError::Offer { session_id, source })?;
        let message = SignalMessage::offer(&offer)
            .map_err(|source| AttemptError::Encode { session_id, source })?;

        entry
            .writer
            .try_write(&message)
            .map_err(|source| AttemptError::Write { session_id, source })
    }

    /// Spawn the deferred driver unless one is already pending
    fn schedule_retry(self: &Arc<Self>) -> bool {
        if self.retry_pending.swap(true, Ordering::AcqRel) {
            tracing::debug!(room = %self.room, "Deferred reconciliation already pending");
            return false;
        }

        let negotiator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(negotiator.policy.cooldown).await;

                if negotiator.run_pass().await.is_converged() {
                    negotiator.retry_pending.store(false, Ordering::Release);
                    negotiator.dispatch_key_frames().await;
                    break;
                }
            }
        });

        true
    }

    /// Ask every publisher for a key frame
    ///
    /// Returns how many requests were written. Failures are ignored.
    pub async fn dispatch_key_frames(&self) -> usize {
        let connections: Vec<Arc<dyn PeerConnection>> = {
            let state = self.state.lock().await;
            state
                .connections
                .iter()
                .map(|entry| Arc::clone(&entry.connection))
                .collect()
        };

        let mut sent = 0;
        for pc in connections {
            for receiver in pc.receivers().await {
                match pc.write_pli(receiver.ssrc).await {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        tracing::trace!(
                            room = %self.room,
                            track = %receiver.track_id,
                            error = %e,
                            "Key frame request failed"
                        );
                    }
                }
            }
        }

        sent
    }

    pub async fn stats(&self) -> RoomStats {
        let state = self.state.lock().await;
        RoomStats {
            connections: state.connections.len(),
            tracks: state.tracks.len(),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    /// Sorted ids of the published tracks
    pub async fn track_ids(&self) -> Vec<TrackId> {
        self.state.lock().await.tracks.ids()
    }
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("room", &self.room)
            .field("policy", &self.policy)
            .field("retry_pending", &self.has_pending_retry())
            .finish()
    }
}
