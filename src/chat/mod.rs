//! Room text chat
//!
//! Every room starts one [`Hub`] when it is created. Chat sockets register
//! with it and every inbound message is fanned out to all registered clients.
//!
//! ```text
//!   chat socket ──► read pump ──► HubHandle::broadcast ──► Hub task
//!                                                           │
//!   chat socket ◄── write pump ◄── client queue (256) ◄─────┘
//! ```

pub mod client;
pub mod hub;

pub use client::{normalize_message, run_chat_client, ChatConfig};
pub use hub::{Hub, HubHandle, CLIENT_QUEUE_CAPACITY};
