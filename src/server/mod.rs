//! HTTP and WebSocket front end
//!
//! ```text
//!   GET /room/create                 ──► redirect to /room/{uuid}
//!   GET /room/:uuid                  ──► room links (creates the room)
//!   GET /room/:uuid/websocket        ──► participant signaling session
//!   GET /room/:uuid/chat/websocket   ──► chat client
//!   GET /room/:uuid/viewer/websocket ──► viewer count
//!   GET /stream/:suuid               ──► stream links or {"no_stream": true}
//!   GET /stream/:suuid/websocket     ──► receive-only signaling session
//!   GET /stream/:suuid/chat/websocket, /stream/:suuid/viewer/websocket
//! ```

pub mod config;
pub mod listener;
pub mod viewers;
pub mod ws;

pub use config::ServerConfig;
pub use listener::{PageLinks, RelayServer};
