//! Peer connection set
//!
//! The per-room ordered collection of live connections and their signaling
//! writers. Mutated only under the room lock owned by the renegotiation
//! engine.

pub mod entry;
pub mod set;
pub mod writer;

pub use entry::ConnectionEntry;
pub use set::ConnectionSet;
pub use writer::{SignalWriter, WriteError};
