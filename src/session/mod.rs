//! Signaling sessions
//!
//! One session per signaling socket. A session owns its peer connection,
//! decodes inbound offer/answer/candidate envelopes and turns connection
//! events into room renegotiation.

pub mod forward;
pub mod message;
pub mod signaling;
pub mod state;

pub use forward::{forward_track, ForwardStats};
pub use message::{SignalError, SignalEvent, SignalMessage};
pub use signaling::{SessionConfig, SignalingSession};
pub use state::{PhaseTracker, SessionPhase, SessionRole};
