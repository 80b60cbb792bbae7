//! Signaling message envelope
//!
//! Wire format, one JSON object per frame:
//!
//! ```text
//! { "event": "offer" | "answer" | "candidate", "data": "<serialized payload>" }
//! ```
//!
//! The payload is serialized on its own and embedded as a string, so decoding
//! is two steps: first the envelope, then `data` according to `event`.

use serde::{Deserialize, Serialize};

use crate::rtc::{IceCandidateInit, SessionDescription};

/// Event tag of a signaling message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalEvent {
    Offer,
    Answer,
    Candidate,
    /// Any tag this server does not handle
    #[serde(other)]
    Unknown,
}

/// Signaling envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub event: SignalEvent,
    #[serde(default)]
    pub data: String,
}

/// Error decoding a signaling message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// The frame is not a valid envelope
    Envelope(String),
    /// The payload does not match the event tag
    Payload {
        event: SignalEvent,
        reason: String,
    },
    /// The payload could not be serialized
    Encode(String),
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::Envelope(reason) => write!(f, "Malformed signaling envelope: {}", reason),
            SignalError::Payload { event, reason } => {
                write!(f, "Malformed {:?} payload: {}", event, reason)
            }
            SignalError::Encode(reason) => write!(f, "Failed to encode signaling payload: {}", reason),
        }
    }
}

impl std::error::Error for SignalError {}

impl SignalMessage {
    /// Offer message carrying a serialized session description
    pub fn offer(desc: &SessionDescription) -> Result<Self, SignalError> {
        Self::with_payload(SignalEvent::Offer, desc)
    }

    /// Answer message carrying a serialized session description
    pub fn answer(desc: &SessionDescription) -> Result<Self, SignalError> {
        Self::with_payload(SignalEvent::Answer, desc)
    }

    /// Candidate message carrying a serialized ICE candidate
    pub fn candidate(candidate: &IceCandidateInit) -> Result<Self, SignalError> {
        Self::with_payload(SignalEvent::Candidate, candidate)
    }

    fn with_payload<T: Serialize>(event: SignalEvent, payload: &T) -> Result<Self, SignalError> {
        let data = serde_json::to_string(payload).map_err(|e| SignalError::Encode(e.to_string()))?;
        Ok(Self { event, data })
    }

    /// Decode an envelope from a frame's text
    pub fn decode(raw: &str) -> Result<Self, SignalError> {
        serde_json::from_str(raw).map_err(|e| SignalError::Envelope(e.to_string()))
    }

    /// Serialize the envelope for the wire
    pub fn encode(&self) -> Result<String, SignalError> {
        serde_json::to_string(self).map_err(|e| SignalError::Encode(e.to_string()))
    }

    /// Decode `data` as a session description
    pub fn session_description(&self) -> Result<SessionDescription, SignalError> {
        self.payload()
    }

    /// Decode `data` as an ICE candidate
    pub fn ice_candidate(&self) -> Result<IceCandidateInit, SignalError> {
        self.payload()
    }

    fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, SignalError> {
        serde_json::from_str(&self.data).map_err(|e| SignalError::Payload {
            event: self.event,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::SdpType;

    #[test]
    fn test_offer_payload_embedded_as_string() {
        let msg = SignalMessage::offer(&SessionDescription::offer("v=0")).unwrap();
        let wire = msg.encode().unwrap();

        assert_eq!(
            wire,
            r#"{"event":"offer","data":"{\"type\":\"offer\",\"sdp\":\"v=0\"}"}"#
        );
    }

    #[test]
    fn test_two_step_decode_answer() {
        let wire = r#"{"event":"answer","data":"{\"type\":\"answer\",\"sdp\":\"v=0\"}"}"#;
        let msg = SignalMessage::decode(wire).unwrap();

        assert_eq!(msg.event, SignalEvent::Answer);
        let desc = msg.session_description().unwrap();
        assert_eq!(desc.sdp_type, SdpType::Answer);
        assert_eq!(desc.sdp, "v=0");
    }

    #[test]
    fn test_two_step_decode_candidate() {
        let wire = r#"{"event":"candidate","data":"{\"candidate\":\"candidate:1 1 udp 1 10.0.0.1 9 typ host\",\"sdpMid\":\"0\",\"sdpMLineIndex\":0}"}"#;
        let msg = SignalMessage::decode(wire).unwrap();

        let candidate = msg.ice_candidate().unwrap();
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_mline_index, Some(0));
    }

    #[test]
    fn test_unknown_event_tag() {
        let msg = SignalMessage::decode(r#"{"event":"renegotiate","data":""}"#).unwrap();
        assert_eq!(msg.event, SignalEvent::Unknown);
    }

    #[test]
    fn test_malformed_envelope() {
        assert!(matches!(
            SignalMessage::decode("not json"),
            Err(SignalError::Envelope(_))
        ));
    }

    #[test]
    fn test_malformed_candidate_payload() {
        let msg = SignalMessage {
            event: SignalEvent::Candidate,
            data: "{broken".into(),
        };
        assert!(matches!(
            msg.ice_candidate(),
            Err(SignalError::Payload {
                event: SignalEvent::Candidate,
                ..
            })
        ));
    }
}
