//! Serialized signaling writer
//!
//! Every connection has exactly one outbound pump that owns the socket's write
//! half. Writers only enqueue encoded envelopes, so concurrent offer and
//! candidate pushes can never interleave on the wire.

use tokio::sync::mpsc;

use crate::session::message::SignalMessage;

/// Error type for signaling writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The message could not be encoded
    Encode(String),
    /// The outbound queue is full
    Full,
    /// The outbound pump has stopped
    Closed,
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Encode(reason) => write!(f, "Failed to encode message: {}", reason),
            WriteError::Full => write!(f, "Outbound queue full"),
            WriteError::Closed => write!(f, "Signaling channel closed"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Handle to a connection's outbound signaling queue
#[derive(Debug, Clone)]
pub struct SignalWriter {
    tx: mpsc::Sender<String>,
}

impl SignalWriter {
    /// Create a writer and the queue its outbound pump drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a message without waiting
    ///
    /// Used while the room lock is held: a full queue is reported instead of
    /// suspending.
    pub fn try_write(&self, message: &SignalMessage) -> Result<(), WriteError> {
        let encoded = message
            .encode()
            .map_err(|e| WriteError::Encode(e.to_string()))?;

        self.tx.try_send(encoded).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WriteError::Full,
            mpsc::error::TrySendError::Closed(_) => WriteError::Closed,
        })
    }

    /// Enqueue a message, waiting for queue space
    pub async fn write(&self, message: &SignalMessage) -> Result<(), WriteError> {
        let encoded = message
            .encode()
            .map_err(|e| WriteError::Encode(e.to_string()))?;

        self.tx.send(encoded).await.map_err(|_| WriteError::Closed)
    }

    /// Whether the outbound pump has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
