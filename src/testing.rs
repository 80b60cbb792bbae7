//! In-crate fakes for the WebRTC engine seam and the signaling transport

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc as fmpsc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::peer::{ConnectionEntry, SignalWriter};
use crate::registry::TrackId;
use crate::rtc::{
    Codec, ConnectionState, IceCandidateInit, LocalTrack, PeerConnection, PeerEvent, PeerEvents,
    ReceiverInfo, RemoteTrack, RtcBackend, RtcError, SessionDescription, TrackSpec,
};
use crate::transport::{Frame, TransportError};

/// Backend handing out [`FakePeerConnection`]s
#[derive(Default)]
pub struct FakeBackend {
    connections: Mutex<Vec<Arc<FakePeerConnection>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection created so far
    pub fn connections(&self) -> Vec<Arc<FakePeerConnection>> {
        self.connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl RtcBackend for FakeBackend {
    async fn new_peer_connection(&self) -> Result<(Arc<dyn PeerConnection>, PeerEvents), RtcError> {
        let (pc, events) = FakePeerConnection::with_events();
        self.connections.lock().unwrap().push(Arc::clone(&pc));
        let pc: Arc<dyn PeerConnection> = pc;
        Ok((pc, events))
    }

    fn new_local_track(&self, spec: &TrackSpec) -> Result<Arc<dyn LocalTrack>, RtcError> {
        if !spec.codec.is_forwardable() {
            return Err(RtcError::CodecUnsupported(spec.codec.mime_type.clone()));
        }
        Ok(Arc::new(FakeLocalTrack::new(spec.clone())))
    }
}

/// Connection that records every operation applied to it
pub struct FakePeerConnection {
    state: Mutex<ConnectionState>,
    senders: Mutex<Vec<TrackId>>,
    receivers: Mutex<Vec<ReceiverInfo>>,
    local_description: Mutex<Option<SessionDescription>>,
    remote_description: Mutex<Option<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidateInit>>,
    plis: Mutex<Vec<u32>>,
    offer_attempts: AtomicUsize,
    offers: AtomicUsize,
    adds: AtomicUsize,
    removes: AtomicUsize,
    fail_offers: AtomicBool,
    fail_adds: AtomicBool,
    fail_removes: AtomicBool,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl FakePeerConnection {
    /// Connection whose events go nowhere
    pub fn new() -> Arc<Self> {
        Self::with_events().0
    }

    /// Connection plus the receiving end of its events
    pub fn with_events() -> (Arc<Self>, PeerEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let pc = Arc::new(Self {
            state: Mutex::new(ConnectionState::New),
            senders: Mutex::new(Vec::new()),
            receivers: Mutex::new(Vec::new()),
            local_description: Mutex::new(None),
            remote_description: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
            plis: Mutex::new(Vec::new()),
            offer_attempts: AtomicUsize::new(0),
            offers: AtomicUsize::new(0),
            adds: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_offers: AtomicBool::new(false),
            fail_adds: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
            events,
        });
        (pc, rx)
    }

    /// Change the state without emitting an event
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Emit an event to the owning session
    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event);
    }

    pub fn add_receiver(&self, track_id: &str, ssrc: u32) {
        self.receivers.lock().unwrap().push(ReceiverInfo {
            track_id: TrackId::new(track_id),
            ssrc,
        });
    }

    pub fn fail_offers(&self, fail: bool) {
        self.fail_offers.store(fail, Ordering::SeqCst);
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Sorted ids of the attached senders
    pub fn sender_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .senders
            .lock()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn offer_attempts(&self) -> usize {
        self.offer_attempts.load(Ordering::SeqCst)
    }

    /// Offers created successfully
    pub fn offers(&self) -> usize {
        self.offers.load(Ordering::SeqCst)
    }

    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn plis(&self) -> Vec<u32> {
        self.plis.lock().unwrap().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local_description.lock().unwrap().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote_description.lock().unwrap().clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidateInit> {
        self.candidates.lock().unwrap().clone()
    }
}

#[async_trait]
impl PeerConnection for FakePeerConnection {
    fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    async fn sender_track_ids(&self) -> Vec<TrackId> {
        self.senders.lock().unwrap().clone()
    }

    async fn receivers(&self) -> Vec<ReceiverInfo> {
        self.receivers.lock().unwrap().clone()
    }

    async fn add_track(&self, track: Arc<dyn LocalTrack>) -> Result<(), RtcError> {
        if self.connection_state().is_closed() {
            return Err(RtcError::Closed);
        }
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(RtcError::Engine("add rejected".into()));
        }
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.senders.lock().unwrap().push(track.id().clone());
        Ok(())
    }

    async fn remove_track(&self, track_id: &TrackId) -> Result<(), RtcError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(RtcError::Engine("remove rejected".into()));
        }
        let mut senders = self.senders.lock().unwrap();
        let before = senders.len();
        senders.retain(|id| id != track_id);
        if senders.len() == before {
            return Err(RtcError::SenderNotFound(track_id.to_string()));
        }
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, RtcError> {
        let n = self.offer_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_offers.load(Ordering::SeqCst) {
            return Err(RtcError::Engine("offer rejected".into()));
        }
        self.offers.fetch_add(1, Ordering::SeqCst);
        Ok(SessionDescription::offer(format!("v=0\r\no=- {} 0 IN IP4 0.0.0.0\r\n", n)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        *self.local_description.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), RtcError> {
        *self.remote_description.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), RtcError> {
        if candidate.candidate.is_empty() {
            return Err(RtcError::Engine("empty candidate".into()));
        }
        self.candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn write_pli(&self, media_ssrc: u32) -> Result<(), RtcError> {
        self.plis.lock().unwrap().push(media_ssrc);
        Ok(())
    }

    async fn close(&self) -> Result<(), RtcError> {
        let was_closed = {
            let mut state = self.state.lock().unwrap();
            let was_closed = state.is_closed();
            *state = ConnectionState::Closed;
            was_closed
        };
        if !was_closed {
            self.emit(PeerEvent::StateChanged(ConnectionState::Closed));
        }
        Ok(())
    }
}

/// Local track collecting every packet written to it
pub struct FakeLocalTrack {
    spec: TrackSpec,
    packets: Mutex<Vec<Bytes>>,
}

impl FakeLocalTrack {
    pub fn new(spec: TrackSpec) -> Self {
        Self {
            spec,
            packets: Mutex::new(Vec::new()),
        }
    }

    pub fn packets(&self) -> Vec<Bytes> {
        self.packets.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalTrack for FakeLocalTrack {
    fn id(&self) -> &TrackId {
        &self.spec.id
    }

    fn stream_id(&self) -> &str {
        &self.spec.stream_id
    }

    fn codec(&self) -> &Codec {
        &self.spec.codec
    }

    async fn write_packet(&self, packet: &[u8]) -> Result<(), RtcError> {
        self.packets
            .lock()
            .unwrap()
            .push(Bytes::copy_from_slice(packet));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remote track fed by the test
pub struct FakeRemoteTrack {
    id: TrackId,
    stream_id: String,
    codec: Codec,
    ssrc: u32,
    feed: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    packets: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl FakeRemoteTrack {
    pub fn new(id: &str, stream_id: &str, codec: Codec) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            id: TrackId::new(id),
            stream_id: stream_id.to_string(),
            codec,
            ssrc: 1,
            feed: Mutex::new(Some(tx)),
            packets: tokio::sync::Mutex::new(rx),
        }
    }

    pub fn video(id: &str, stream_id: &str) -> Self {
        Self::new(id, stream_id, Codec::new("video/VP8", 90000, 0))
    }

    pub fn audio(id: &str, stream_id: &str) -> Self {
        Self::new(id, stream_id, Codec::new("audio/opus", 48000, 2))
    }

    pub fn with_ssrc(mut self, ssrc: u32) -> Self {
        self.ssrc = ssrc;
        self
    }

    /// Queue a packet for the next read
    pub fn push(&self, packet: &'static [u8]) {
        if let Some(feed) = self.feed.lock().unwrap().as_ref() {
            let _ = feed.send(Bytes::from_static(packet));
        }
    }

    /// End the track once queued packets are read
    pub fn finish(&self) {
        self.feed.lock().unwrap().take();
    }
}

#[async_trait]
impl RemoteTrack for FakeRemoteTrack {
    fn id(&self) -> TrackId {
        self.id.clone()
    }

    fn stream_id(&self) -> String {
        self.stream_id.clone()
    }

    fn codec(&self) -> Codec {
        self.codec.clone()
    }

    fn ssrc(&self) -> u32 {
        self.ssrc
    }

    async fn read_packet(&self) -> Result<Bytes, RtcError> {
        self.packets.lock().await.recv().await.ok_or(RtcError::Closed)
    }
}

/// Connection entry on a fresh fake connection, plus its outbound queue
pub fn fake_entry(
    session_id: u64,
    capacity: usize,
) -> (ConnectionEntry, Arc<FakePeerConnection>, mpsc::Receiver<String>) {
    let pc = FakePeerConnection::new();
    let (writer, rx) = SignalWriter::channel(capacity);
    (ConnectionEntry::new(session_id, pc.clone(), writer), pc, rx)
}

/// The test's end of an in-memory transport
pub struct RemoteEnd {
    to_local: fmpsc::UnboundedSender<Frame>,
    from_local: fmpsc::UnboundedReceiver<Frame>,
}

impl RemoteEnd {
    /// Deliver a frame to the local side
    pub fn send(&mut self, frame: Frame) {
        let _ = self.to_local.unbounded_send(frame);
    }

    /// Next frame the local side wrote
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_local.next().await
    }

    /// Next text frame, skipping pings
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.recv().await? {
                Frame::Text(text) => return Some(text),
                Frame::Close => return None,
                _ => continue,
            }
        }
    }
}

/// The session's end of an in-memory transport
pub struct LocalEnd<R, W> {
    pub inbound: R,
    pub outbound: W,
}

fn closed(_: fmpsc::SendError) -> TransportError {
    TransportError::Closed
}

/// In-memory transport; dropping the remote end closes both directions
pub fn transport_pair() -> (
    RemoteEnd,
    LocalEnd<
        impl Stream<Item = Result<Frame, TransportError>> + Unpin + Send + 'static,
        impl Sink<Frame, Error = TransportError> + Unpin + Send + 'static,
    >,
) {
    let (to_local, inbound) = fmpsc::unbounded::<Frame>();
    let (outbound, from_local) = fmpsc::unbounded::<Frame>();

    let remote = RemoteEnd {
        to_local,
        from_local,
    };
    let local = LocalEnd {
        inbound: inbound.map(Ok::<Frame, TransportError>),
        outbound: outbound.sink_map_err(closed as fn(fmpsc::SendError) -> TransportError),
    };

    (remote, local)
}
