//! Track registry for room-wide media routing
//!
//! Every track a participant publishes is mirrored by a forwardable local track
//! and recorded here. The renegotiation engine reads the registry on every
//! pass and attaches each entry to all other connections in the room.
//!
//! # Architecture
//!
//! ```text
//!   [Publisher c1]                      TrackRegistry
//!   remote track t1 ──► insert_remote ──► { t1: LocalTrack, ... }
//!         │                                     │
//!         │ forwarding task                     │ reconcile()
//!         ▼                                     ▼
//!   LocalTrack::write_packet ──────► senders on c2, c3, ...
//! ```
//!
//! Packets are copied from the remote track to the local track unchanged; the
//! registry only tracks membership and never sits on the data path.

pub mod error;
pub mod store;
pub mod track;

pub use error::RegistryError;
pub use store::TrackRegistry;
pub use track::TrackId;
