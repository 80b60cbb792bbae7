//! Room directory
//!
//! An injected service object that owns every room. Rooms are addressed by
//! their primary identifier or by the derived public identifier:
//!
//! ```text
//!   "/room/{primary}"   ──► rooms[primary]  ──┐
//!                                             ├──► Arc<Room>
//!   "/stream/{public}"  ──► streams[public] ──┘
//!
//!   public = hex(sha256(primary))
//! ```

pub mod error;
pub mod room;
pub mod store;

pub use error::DirectoryError;
pub use room::{public_id, Room};
pub use store::RoomDirectory;
