//! Connection entry
//!
//! One participant's connection handle plus the writer for its signaling
//! channel.

use std::sync::Arc;

use crate::rtc::PeerConnection;

use super::writer::SignalWriter;

/// Entry for a single connection in a room
#[derive(Clone)]
pub struct ConnectionEntry {
    /// Session id of the owning signaling session
    pub session_id: u64,

    /// Connection handle, driven by the owning session
    pub connection: Arc<dyn PeerConnection>,

    /// Outbound signaling queue of the owning session
    pub writer: SignalWriter,
}

impl ConnectionEntry {
    pub fn new(session_id: u64, connection: Arc<dyn PeerConnection>, writer: SignalWriter) -> Self {
        Self {
            session_id,
            connection,
            writer,
        }
    }

    /// Whether the connection reached its terminal state
    pub fn is_closed(&self) -> bool {
        self.connection.connection_state().is_closed()
    }
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("session_id", &self.session_id)
            .field("state", &self.connection.connection_state())
            .finish()
    }
}
