//! Production backend built on the `webrtc` crate
//!
//! Engine callbacks are turned into [`PeerEvent`] messages as soon as they fire;
//! no relay state is touched from inside a callback.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtcp::payload_feedbacks::picture_loss_indication::PictureLossIndication;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCPFeedback, RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::{TrackLocal, TrackLocalWriter};
use webrtc::track::track_remote::TrackRemote;
use webrtc::util::Marshal;

use super::{
    Codec, ConnectionState, IceCandidateInit, IceConfig, LocalTrack, PeerConnection, PeerEvent,
    PeerEvents, ReceiverInfo, RemoteTrack, RtcBackend, RtcError, RtcpFeedback, SdpType,
    SessionDescription, TrackSpec,
};
use crate::registry::TrackId;

/// [`RtcBackend`] over the `webrtc` crate
pub struct WebrtcBackend {
    api: API,
    ice: IceConfig,
}

impl WebrtcBackend {
    /// Build the engine with default codecs and interceptors
    pub fn new(ice: IceConfig) -> Result<Self, RtcError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, ice })
    }

    /// ICE configuration handed to every new connection
    pub fn ice_config(&self) -> &IceConfig {
        &self.ice
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .ice
            .servers
            .iter()
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone(),
                credential: s.credential.clone(),
                ..Default::default()
            })
            .collect();

        let ice_transport_policy = if self.ice.relay_only {
            RTCIceTransportPolicy::Relay
        } else {
            RTCIceTransportPolicy::All
        };

        RTCConfiguration {
            ice_servers,
            ice_transport_policy,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RtcBackend for WebrtcBackend {
    async fn new_peer_connection(&self) -> Result<(Arc<dyn PeerConnection>, PeerEvents), RtcError> {
        let pc = Arc::new(self.api.new_peer_connection(self.rtc_configuration()).await?);

        for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
            pc.add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        wire_events(&pc, tx);

        Ok((Arc::new(NativePeerConnection { pc }), rx))
    }

    fn new_local_track(&self, spec: &TrackSpec) -> Result<Arc<dyn LocalTrack>, RtcError> {
        if !spec.codec.is_forwardable() {
            return Err(RtcError::CodecUnsupported(spec.codec.mime_type.clone()));
        }

        let track = Arc::new(TrackLocalStaticRTP::new(
            capability_from_codec(&spec.codec),
            spec.id.as_str().to_string(),
            spec.stream_id.clone(),
        ));

        Ok(Arc::new(RtpLocalTrack {
            id: spec.id.clone(),
            stream_id: spec.stream_id.clone(),
            codec: spec.codec.clone(),
            track,
        }))
    }
}

fn wire_events(pc: &RTCPeerConnection, tx: mpsc::UnboundedSender<PeerEvent>) {
    let candidate_tx = tx.clone();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let event = match candidate {
            None => Some(PeerEvent::IceCandidate(None)),
            Some(c) => match c.to_json() {
                Ok(init) => Some(PeerEvent::IceCandidate(Some(candidate_from_rtc(init)))),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize local ICE candidate");
                    None
                }
            },
        };
        if let Some(event) = event {
            let _ = candidate_tx.send(event);
        }
        Box::pin(async {})
    }));

    let state_tx = tx.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        let _ = state_tx.send(PeerEvent::StateChanged(state_from_rtc(state)));
        Box::pin(async {})
    }));

    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
            let _ = tx.send(PeerEvent::Track(Arc::new(NativeRemoteTrack { track })));
            Box::pin(async {})
        },
    ));
}

/// [`PeerConnection`] over `RTCPeerConnection`
pub struct NativePeerConnection {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerConnection for NativePeerConnection {
    fn connection_state(&self) -> ConnectionState {
        state_from_rtc(self.pc.connection_state())
    }

    async fn sender_track_ids(&self) -> Vec<TrackId> {
        let mut ids = Vec::new();
        for sender in self.pc.get_senders().await {
            if let Some(track) = sender.track().await {
                ids.push(TrackId::new(track.id()));
            }
        }
        ids
    }

    async fn receivers(&self) -> Vec<ReceiverInfo> {
        let mut receivers = Vec::new();
        for receiver in self.pc.get_receivers().await {
            for track in receiver.tracks().await {
                let id = track.id();
                // Transceivers created before negotiation carry an empty placeholder track
                if id.is_empty() {
                    continue;
                }
                receivers.push(ReceiverInfo {
                    track_id: TrackId::new(id),
                    ssrc: track.ssrc(),
                });
            }
        }
        receivers
    }

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), RtcError> {
        let local = track
            .as_any()
            .downcast_ref::<RtpLocalTrack>()
            .ok_or_else(|| RtcError::ForeignTrack(track.id().to_string()))?;

        let sender = self
            .pc
            .add_track(Arc::clone(&local.track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // Drain RTCP so the interceptors keep running for this sender
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });

        Ok(())
    }

    async fn remove_track(&self, track_id: &TrackId) -> Result<(), RtcError> {
        for sender in self.pc.get_senders().await {
            let matches = match sender.track().await {
                Some(track) => track.id() == track_id.as_str(),
                None => false,
            };
            if matches {
                self.pc.remove_track(&sender).await?;
                return Ok(());
            }
        }
        Err(RtcError::SenderNotFound(track_id.to_string()))
    }

    async fn create_offer(&self) -> Result<SessionDescription, RtcError> {
        let offer = self.pc.create_offer(None).await?;
        description_from_rtc(offer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        self.pc.set_local_description(description_to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        self.pc.set_remote_description(description_to_rtc(desc)?).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), RtcError> {
        self.pc.add_ice_candidate(candidate_to_rtc(candidate)).await?;
        Ok(())
    }

    async fn write_pli(&self, media_ssrc: u32) -> Result<(), RtcError> {
        self.pc
            .write_rtcp(&[Box::new(PictureLossIndication {
                sender_ssrc: 0,
                media_ssrc,
            })])
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RtcError> {
        self.pc.close().await?;
        Ok(())
    }
}

/// Forwardable track backed by `TrackLocalStaticRTP`
pub struct RtpLocalTrack {
    id: TrackId,
    stream_id: String,
    codec: Codec,
    track: Arc<TrackLocalStaticRTP>,
}

#[async_trait]
impl LocalTrack for RtpLocalTrack {
    fn id(&self) -> &TrackId {
        &self.id
    }

    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn codec(&self) -> &Codec {
        &self.codec
    }

    async fn write_packet(&self, packet: &[u8]) -> Result<(), RtcError> {
        self.track.write(packet).await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Inbound track backed by `TrackRemote`
pub struct NativeRemoteTrack {
    track: Arc<TrackRemote>,
}

#[async_trait]
impl RemoteTrack for NativeRemoteTrack {
    fn id(&self) -> TrackId {
        TrackId::new(self.track.id())
    }

    fn stream_id(&self) -> String {
        self.track.stream_id()
    }

    fn codec(&self) -> Codec {
        codec_from_capability(&self.track.codec().capability)
    }

    fn ssrc(&self) -> u32 {
        self.track.ssrc()
    }

    async fn read_packet(&self) -> Result<Bytes, RtcError> {
        let (packet, _) = self.track.read_rtp().await?;
        packet
            .marshal()
            .map_err(|e| RtcError::Engine(e.to_string()))
    }
}

fn state_from_rtc(state: RTCPeerConnectionState) -> ConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified => ConnectionState::Unspecified,
        RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
    }
}

fn description_from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, RtcError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => {
            return Err(RtcError::InvalidDescription("unspecified type".into()));
        }
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

fn description_to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, RtcError> {
    let parsed = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => {
            return Err(RtcError::InvalidDescription("rollback is not supported".into()));
        }
    };
    parsed.map_err(|e| RtcError::InvalidDescription(e.to_string()))
}

fn candidate_from_rtc(init: RTCIceCandidateInit) -> IceCandidateInit {
    IceCandidateInit {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_mline_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn candidate_to_rtc(candidate: IceCandidateInit) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

fn codec_from_capability(capability: &RTCRtpCodecCapability) -> Codec {
    Codec {
        mime_type: capability.mime_type.clone(),
        clock_rate: capability.clock_rate,
        channels: capability.channels,
        sdp_fmtp_line: capability.sdp_fmtp_line.clone(),
        rtcp_feedback: capability
            .rtcp_feedback
            .iter()
            .map(|fb| RtcpFeedback {
                typ: fb.typ.clone(),
                parameter: fb.parameter.clone(),
            })
            .collect(),
    }
}

fn capability_from_codec(codec: &Codec) -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: codec.mime_type.clone(),
        clock_rate: codec.clock_rate,
        channels: codec.channels,
        sdp_fmtp_line: codec.sdp_fmtp_line.clone(),
        rtcp_feedback: codec
            .rtcp_feedback
            .iter()
            .map(|fb| RTCPFeedback {
                typ: fb.typ.clone(),
                parameter: fb.parameter.clone(),
            })
            .collect(),
    }
}
