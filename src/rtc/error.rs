//! WebRTC engine error types

/// Error type for operations on the WebRTC engine seam
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcError {
    /// The codec cannot be represented by a forwardable track
    CodecUnsupported(String),
    /// The track was not created by this backend
    ForeignTrack(String),
    /// No sender carries the given track
    SenderNotFound(String),
    /// The session description type cannot be applied here
    InvalidDescription(String),
    /// The connection or track has been closed
    Closed,
    /// Error reported by the underlying engine
    Engine(String),
}

impl std::fmt::Display for RtcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RtcError::CodecUnsupported(mime) => write!(f, "Codec unsupported: {}", mime),
            RtcError::ForeignTrack(id) => write!(f, "Track not created by this backend: {}", id),
            RtcError::SenderNotFound(id) => write!(f, "No sender for track: {}", id),
            RtcError::InvalidDescription(msg) => write!(f, "Invalid session description: {}", msg),
            RtcError::Closed => write!(f, "Connection closed"),
            RtcError::Engine(msg) => write!(f, "WebRTC engine error: {}", msg),
        }
    }
}

impl std::error::Error for RtcError {}

impl From<webrtc::Error> for RtcError {
    fn from(err: webrtc::Error) -> Self {
        match err {
            webrtc::Error::ErrConnectionClosed | webrtc::Error::ErrClosedPipe => RtcError::Closed,
            other => RtcError::Engine(other.to_string()),
        }
    }
}
