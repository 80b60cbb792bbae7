//! Engine-neutral WebRTC value types
//!
//! The JSON shapes of [`SessionDescription`] and [`IceCandidateInit`] match what
//! browsers produce from `RTCSessionDescription.toJSON()` and
//! `RTCIceCandidate.toJSON()`.

use serde::{Deserialize, Serialize};

use crate::registry::TrackId;

/// Aggregate state of a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unspecified,
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Whether the connection has reached its terminal state
    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Unspecified => "unspecified",
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description exchanged over the signaling channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate descriptor exchanged over the signaling channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Derive the kind from a MIME type such as `video/VP8`
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let (top, sub) = mime_type.split_once('/')?;
        if sub.is_empty() {
            return None;
        }
        if top.eq_ignore_ascii_case("audio") {
            Some(MediaKind::Audio)
        } else if top.eq_ignore_ascii_case("video") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// RTCP feedback mechanism advertised for a codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtcpFeedback {
    pub typ: String,
    pub parameter: String,
}

/// Codec capability of a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub sdp_fmtp_line: String,
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl Codec {
    /// Create a codec with no fmtp line or feedback
    pub fn new(mime_type: impl Into<String>, clock_rate: u32, channels: u16) -> Self {
        Self {
            mime_type: mime_type.into(),
            clock_rate,
            channels,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: Vec::new(),
        }
    }

    /// Media kind, if the MIME type names one
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }

    /// Whether packets of this codec can be relayed unchanged
    pub fn is_forwardable(&self) -> bool {
        self.kind().is_some() && self.clock_rate > 0
    }
}

/// Everything needed to allocate a forwardable local track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSpec {
    pub id: TrackId,
    pub stream_id: String,
    pub codec: Codec,
}

/// A receiver with an attached remote track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverInfo {
    pub track_id: TrackId,
    pub ssrc: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/VP8"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_mime("audio/opus"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("Audio/PCMU"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_mime("application/rtx"), None);
        assert_eq!(MediaKind::from_mime("video/"), None);
        assert_eq!(MediaKind::from_mime("opus"), None);
    }

    #[test]
    fn test_codec_forwardable() {
        assert!(Codec::new("video/H264", 90_000, 0).is_forwardable());
        assert!(!Codec::new("video/H264", 0, 0).is_forwardable());
        assert!(!Codec::new("text/plain", 1000, 0).is_forwardable());
    }

    #[test]
    fn test_session_description_json_shape() {
        let offer = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_string(&offer).unwrap();
        assert_eq!(json, r#"{"type":"offer","sdp":"v=0\r\n"}"#);

        let answer: SessionDescription =
            serde_json::from_str(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(answer, SessionDescription::answer("v=0"));
    }

    #[test]
    fn test_ice_candidate_browser_json() {
        let raw = r#"{"candidate":"candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host","sdpMid":"0","sdpMLineIndex":0,"usernameFragment":"abcd"}"#;
        let candidate: IceCandidateInit = serde_json::from_str(raw).unwrap();
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_mline_index, Some(0));
        assert_eq!(candidate.username_fragment.as_deref(), Some("abcd"));

        // Optional fields may be missing entirely
        let minimal: IceCandidateInit = serde_json::from_str(r#"{"candidate":""}"#).unwrap();
        assert_eq!(minimal, IceCandidateInit::default());
    }

    #[test]
    fn test_connection_state_closed() {
        assert!(ConnectionState::Closed.is_closed());
        assert!(!ConnectionState::Failed.is_closed());
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
