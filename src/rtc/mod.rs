//! Seam over the WebRTC engine
//!
//! The orchestration layer (registry, renegotiation engine, signaling sessions)
//! only talks to the traits in this module. ICE, DTLS/SRTP and RTP packetization
//! live behind [`RtcBackend`]; the production implementation is
//! [`native::WebrtcBackend`], built on the `webrtc` crate.
//!
//! # Event flow
//!
//! ```text
//!   RtcBackend::new_peer_connection()
//!        │
//!        ├──► Arc<dyn PeerConnection>   (driven by the signaling session)
//!        │
//!        └──► PeerEvents ──► IceCandidate / StateChanged / Track
//!                             (consumed by the session's event task)
//! ```

pub mod error;
pub mod ice;
pub mod native;
pub mod types;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::registry::TrackId;

pub use error::RtcError;
pub use ice::{Environment, IceConfig, IceServer, TurnCredentials};
pub use native::WebrtcBackend;
pub use types::{
    Codec, ConnectionState, IceCandidateInit, MediaKind, ReceiverInfo, RtcpFeedback, SdpType,
    SessionDescription, TrackSpec,
};

/// Notification emitted by a peer connection
///
/// Delivered as a message to the owning signaling session instead of being
/// handled inside engine callbacks.
pub enum PeerEvent {
    /// A local ICE candidate was gathered; `None` marks the end of gathering
    IceCandidate(Option<IceCandidateInit>),
    /// The connection state changed
    StateChanged(ConnectionState),
    /// A remote media track started arriving
    Track(Arc<dyn RemoteTrack>),
}

impl std::fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerEvent::IceCandidate(c) => f.debug_tuple("IceCandidate").field(c).finish(),
            PeerEvent::StateChanged(s) => f.debug_tuple("StateChanged").field(s).finish(),
            PeerEvent::Track(t) => f.debug_tuple("Track").field(&t.id()).finish(),
        }
    }
}

/// Receiving half of a connection's event stream
pub type PeerEvents = mpsc::UnboundedReceiver<PeerEvent>;

/// Factory for connection handles and forwardable tracks
#[async_trait]
pub trait RtcBackend: Send + Sync {
    /// Create a connection with receive-only audio and video transceivers
    async fn new_peer_connection(&self) -> Result<(Arc<dyn PeerConnection>, PeerEvents), RtcError>;

    /// Allocate an outbound track that can carry packets of the given codec
    fn new_local_track(&self, spec: &TrackSpec) -> Result<Arc<dyn LocalTrack>, RtcError>;
}

/// One peer's live connection handle
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Current aggregate connection state
    fn connection_state(&self) -> ConnectionState;

    /// Track ids of every sender that currently has a track attached
    async fn sender_track_ids(&self) -> Vec<TrackId>;

    /// Every receiver that currently has a remote track attached
    async fn receivers(&self) -> Vec<ReceiverInfo>;

    /// Attach a local track as a new outgoing sender
    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), RtcError>;

    /// Detach the sender carrying `track_id`
    async fn remove_track(&self, track_id: &TrackId) -> Result<(), RtcError>;

    async fn create_offer(&self) -> Result<SessionDescription, RtcError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RtcError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RtcError>;

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), RtcError>;

    /// Send a picture loss indication for the given media source
    async fn write_pli(&self, media_ssrc: u32) -> Result<(), RtcError>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&self) -> Result<(), RtcError>;
}

/// Outbound track fed by a forwarding task and attached to other peers
#[async_trait]
pub trait LocalTrack: Send + Sync {
    fn id(&self) -> &TrackId;

    fn stream_id(&self) -> &str;

    fn codec(&self) -> &Codec;

    /// Write one media packet, unmodified, to every bound sender
    async fn write_packet(&self, packet: &[u8]) -> Result<(), RtcError>;

    /// Used by backends to recover their concrete track type
    fn as_any(&self) -> &dyn Any;
}

/// Inbound media track published by a participant
#[async_trait]
pub trait RemoteTrack: Send + Sync {
    fn id(&self) -> TrackId;

    fn stream_id(&self) -> String;

    fn codec(&self) -> Codec;

    fn ssrc(&self) -> u32;

    /// Read the next media packet; an error means the track has ended
    async fn read_packet(&self) -> Result<Bytes, RtcError>;
}
