//! Multi-party WebRTC relay
//!
//! Participants publish audio and video tracks into a room; every track is
//! forwarded unchanged to every other connection in the room. Whenever the
//! room's track set or membership changes, every connection is renegotiated.
//!
//! ```text
//!   RoomDirectory ──► Room ──► Negotiator (room lock)
//!                       │          ├── ConnectionSet  (one entry per session)
//!                       │          └── TrackRegistry  (one entry per published track)
//!                       └──► chat Hub
//!
//!   SignalingSession ── offer/answer/candidate ──► browser
//!         │
//!         └── forwarding task per published track
//! ```
//!
//! The WebRTC engine sits behind the traits in [`rtc`]; [`rtc::WebrtcBackend`]
//! is the production implementation.

pub mod chat;
pub mod directory;
pub mod engine;
pub mod error;
pub mod peer;
pub mod registry;
pub mod rtc;
pub mod server;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::{Room, RoomDirectory};
pub use engine::{Negotiator, ReconcileOutcome, RetryPolicy};
pub use error::{Error, Result};
pub use server::{RelayServer, ServerConfig};
pub use session::{SessionRole, SignalingSession};
