//! Signaling session
//!
//! Drives one peer connection for the lifetime of its signaling socket.
//!
//! ```text
//!   socket ──► FrameReader ──► read loop ──► answer / candidate ──► PeerConnection
//!                                                                        │
//!   socket ◄── outbound pump ◄── SignalWriter queue ◄── event task ◄── PeerEvents
//!                                        ▲
//!                                        └── offers from the room's Negotiator
//! ```
//!
//! The session owns three kinds of task: the outbound pump, the event task and
//! one forwarding task per published track. The read loop runs on the caller's
//! task; when it ends the connection handle is closed, which the event task
//! observes as the `closed` state and turns into a reconciliation pass.

use std::sync::Arc;

use futures::{Sink, Stream};
use tokio::sync::watch;

use crate::engine::Negotiator;
use crate::error::Result;
use crate::peer::{ConnectionEntry, SignalWriter};
use crate::rtc::{ConnectionState, PeerConnection, PeerEvent, PeerEvents, RemoteTrack, RtcBackend};
use crate::transport::{run_outbound, Frame, FrameReader, Keepalive, TransportError};

use super::forward::forward_track;
use super::message::{SignalError, SignalEvent, SignalMessage};
use super::state::{PhaseTracker, SessionPhase, SessionRole};

/// Per-session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Keepalive and write deadlines for the signaling socket
    pub keepalive: Keepalive,

    /// Capacity of the outbound signaling queue
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive: Keepalive::default(),
            queue_capacity: 256,
        }
    }
}

/// One signaling session
pub struct SignalingSession {
    id: u64,
    role: SessionRole,
    negotiator: Arc<Negotiator>,
    backend: Arc<dyn RtcBackend>,
    config: SessionConfig,
    phase: Arc<PhaseTracker>,
}

impl SignalingSession {
    pub fn new(
        id: u64,
        role: SessionRole,
        negotiator: Arc<Negotiator>,
        backend: Arc<dyn RtcBackend>,
        config: SessionConfig,
    ) -> Self {
        Self {
            id,
            role,
            negotiator,
            backend,
            config,
            phase: Arc::new(PhaseTracker::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Watch the session phase
    pub fn phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    /// Run the session until the socket closes or a fatal error occurs
    ///
    /// A clean close by the peer returns `Ok`. Either way the connection
    /// handle is closed before returning.
    pub async fn run<R, W>(self, inbound: R, outbound: W) -> Result<()>
    where
        R: Stream<Item = std::result::Result<Frame, TransportError>> + Unpin + Send,
        W: Sink<Frame, Error = TransportError> + Unpin + Send + 'static,
    {
        let (pc, events) = self.backend.new_peer_connection().await?;
        let keepalive = self.config.keepalive;

        let (writer, queue) = SignalWriter::channel(self.config.queue_capacity);
        let mut pump = tokio::spawn(run_outbound(queue, outbound, keepalive));

        tracing::info!(
            session_id = self.id,
            room = %self.negotiator.room(),
            role = ?self.role,
            "Signaling session started"
        );

        let events_task = EventTask {
            session_id: self.id,
            role: self.role,
            negotiator: Arc::clone(&self.negotiator),
            connection: Arc::clone(&pc),
            writer: writer.clone(),
            phase: Arc::clone(&self.phase),
        };
        tokio::spawn(events_task.run(events));

        self.phase.advance(SessionPhase::Negotiating);
        self.negotiator
            .join(ConnectionEntry::new(self.id, Arc::clone(&pc), writer))
            .await;

        let mut reader = FrameReader::new(inbound, keepalive);
        let result = tokio::select! {
            result = self.read_loop(&mut reader, pc.as_ref()) => result,
            result = &mut pump => match result {
                Ok(Err(e)) => Err(e.into()),
                _ => Ok(()),
            },
        };

        self.phase.advance(SessionPhase::Closing);
        if let Err(e) = pc.close().await {
            tracing::debug!(session_id = self.id, error = %e, "Failed to close connection");
        }
        pump.abort();

        match &result {
            Ok(()) => tracing::info!(session_id = self.id, "Signaling session closed"),
            Err(e) => tracing::info!(session_id = self.id, error = %e, "Signaling session ended"),
        }

        result
    }

    async fn read_loop<R>(&self, reader: &mut FrameReader<R>, pc: &dyn PeerConnection) -> Result<()>
    where
        R: Stream<Item = std::result::Result<Frame, TransportError>> + Unpin,
    {
        loop {
            let text = match reader.next_data().await {
                Ok(Frame::Text(text)) => text,
                Ok(Frame::Binary(data)) => String::from_utf8(data.to_vec())
                    .map_err(|e| SignalError::Envelope(e.to_string()))?,
                Ok(_) => continue,
                Err(TransportError::Closed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let message = SignalMessage::decode(&text)?;
            match message.event {
                SignalEvent::Candidate => {
                    let candidate = message.ice_candidate()?;
                    pc.add_ice_candidate(candidate).await?;
                }
                SignalEvent::Answer => {
                    let answer = message.session_description()?;
                    pc.set_remote_description(answer).await?;
                    tracing::debug!(session_id = self.id, "Applied answer");
                }
                other => {
                    tracing::trace!(session_id = self.id, event = ?other, "Ignoring signaling message");
                }
            }
        }
    }
}

/// Consumer of a connection's events
struct EventTask {
    session_id: u64,
    role: SessionRole,
    negotiator: Arc<Negotiator>,
    connection: Arc<dyn PeerConnection>,
    writer: SignalWriter,
    phase: Arc<PhaseTracker>,
}

impl EventTask {
    async fn run(self, mut events: PeerEvents) {
        while let Some(event) = events.recv().await {
            match event {
                PeerEvent::IceCandidate(None) => {}
                PeerEvent::IceCandidate(Some(candidate)) => {
                    let sent = match SignalMessage::candidate(&candidate) {
                        Ok(message) => self.writer.write(&message).await.map_err(|e| e.to_string()),
                        Err(e) => Err(e.to_string()),
                    };
                    if let Err(e) = sent {
                        tracing::debug!(session_id = self.session_id, error = %e, "Candidate not sent");
                    }
                }
                PeerEvent::StateChanged(state) => {
                    tracing::debug!(session_id = self.session_id, state = %state, "Connection state changed");
                    if self.on_state(state).await {
                        return;
                    }
                }
                PeerEvent::Track(remote) => self.on_track(remote).await,
            }
        }

        // Event source gone without a closed notification
        self.phase.advance(SessionPhase::Closed);
        self.negotiator.reconcile().await;
    }

    /// Returns true once the connection is closed
    async fn on_state(&self, state: ConnectionState) -> bool {
        match state {
            ConnectionState::Connected => {
                self.phase.advance(SessionPhase::Connected);
            }
            ConnectionState::Failed => {
                self.phase.advance(SessionPhase::Failed);
                if let Err(e) = self.connection.close().await {
                    tracing::debug!(session_id = self.session_id, error = %e, "Failed to close connection");
                }
            }
            ConnectionState::Closed => {
                self.phase.advance(SessionPhase::Closed);
                self.negotiator.reconcile().await;
                return true;
            }
            _ => {}
        }
        false
    }

    async fn on_track(&self, remote: Arc<dyn RemoteTrack>) {
        if !self.role.can_publish() {
            tracing::debug!(session_id = self.session_id, track = %remote.id(), "Ignoring track from viewer");
            return;
        }

        let local = match self.negotiator.publish(remote.as_ref()).await {
            Ok(local) => local,
            Err(e) => {
                tracing::warn!(session_id = self.session_id, error = %e, "Track rejected");
                return;
            }
        };

        let negotiator = Arc::clone(&self.negotiator);
        let session_id = self.session_id;
        tokio::spawn(async move {
            let stats = forward_track(remote, Arc::clone(&local)).await;
            tracing::debug!(
                session_id = session_id,
                track = %local.id(),
                packets = stats.packets,
                bytes = stats.bytes,
                "Forwarding stopped"
            );
            negotiator.unpublish(&local).await;
        });
    }
}
