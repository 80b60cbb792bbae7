//! Session state machine
//!
//! Tracks a signaling session from connection setup to teardown. The phase is
//! published through a watch channel so the HTTP layer and tests can follow it.

use std::time::Instant;

use tokio::sync::watch;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, no connection handle yet
    Created,
    /// Joined the room, offers in flight
    Negotiating,
    /// The peer connection reported connected
    Connected,
    /// Session is shutting down
    Closing,
    /// Connection handle closed
    Closed,
    /// The peer connection reported failure
    Failed,
}

impl SessionPhase {
    /// Whether moving to `next` is a legal transition
    pub fn can_transition(self, next: SessionPhase) -> bool {
        use SessionPhase::*;

        match (self, next) {
            (Closed, _) => false,
            (Created, Negotiating) => true,
            (Negotiating, Connected) => true,
            (Negotiating | Connected, Failed) => true,
            (Closing, Closing) => false,
            (_, Closing) | (_, Closed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionPhase::Closed
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Created => "created",
            SessionPhase::Negotiating => "negotiating",
            SessionPhase::Connected => "connected",
            SessionPhase::Closing => "closing",
            SessionPhase::Closed => "closed",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a session may do in its room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Publishes its own tracks and receives everyone else's
    Participant,
    /// Receive-only, joined through the stream path
    Viewer,
}

impl SessionRole {
    pub fn can_publish(self) -> bool {
        self == SessionRole::Participant
    }
}

/// Shared, observable session phase
#[derive(Debug)]
pub struct PhaseTracker {
    tx: watch::Sender<SessionPhase>,
    created_at: Instant,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionPhase::Created);
        Self {
            tx,
            created_at: Instant::now(),
        }
    }

    pub fn current(&self) -> SessionPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.tx.subscribe()
    }

    /// Move to `next` if the transition is legal; returns whether it moved
    pub fn advance(&self, next: SessionPhase) -> bool {
        self.tx.send_if_modified(|phase| {
            if phase.can_transition(next) {
                *phase = next;
                true
            } else {
                false
            }
        })
    }

    /// Time since the session was created
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}
