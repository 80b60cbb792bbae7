//! Renegotiation engine
//!
//! Keeps every connection in a room aligned with the room's track registry.
//!
//! # Reconciliation pass
//!
//! ```text
//!   publish / unpublish / join / connection closed
//!                      │
//!                      ▼
//!   reconcile() ── lock room ──► attempt 1..=max_attempts
//!                                   │  prune closed connections
//!                                   │  for each connection:
//!                                   │    detach senders not in registry
//!                                   │    attach registry tracks not sent/received
//!                                   │    create offer, set local, enqueue "offer"
//!                                   ▼
//!              ok ──► unlock ──► key-frame requests to every receiver
//!       all failed ──► unlock ──► deferred driver: sleep cooldown, pass, repeat
//! ```
//!
//! Attempt failures never leave the engine. They only decide whether another
//! attempt is made.

pub mod negotiator;
pub mod policy;

pub use negotiator::{Negotiator, ReconcileOutcome, RoomState, RoomStats};
pub use policy::RetryPolicy;
