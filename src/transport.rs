//! Frame-level signaling transport
//!
//! Sessions exchange [`Frame`]s over any `Stream`/`Sink` pair, so the protocol
//! logic does not depend on the HTTP framework that upgraded the connection.
//!
//! Keepalive follows the usual WebSocket scheme: the outbound pump pings every
//! [`Keepalive::ping_period`], the reader expects a pong within
//! [`Keepalive::idle_timeout`], and every write must finish within
//! [`Keepalive::write_timeout`].

use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close,
}

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer closed the connection or the stream ended
    Closed,
    /// No pong arrived before the read deadline
    IdleTimeout,
    /// A write did not complete before the write deadline
    WriteTimeout,
    /// An inbound message exceeded the read limit
    MessageTooLarge(usize),
    /// Error reported by the underlying socket
    Io(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Closed => write!(f, "Connection closed"),
            TransportError::IdleTimeout => write!(f, "Read idle timeout"),
            TransportError::WriteTimeout => write!(f, "Write timeout"),
            TransportError::MessageTooLarge(len) => write!(f, "Message too large: {} bytes", len),
            TransportError::Io(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<axum::Error> for TransportError {
    fn from(err: axum::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Keepalive and deadline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keepalive {
    /// Read deadline, refreshed on every pong
    pub idle_timeout: Duration,
    /// Deadline for a single frame write
    pub write_timeout: Duration,
}

impl Default for Keepalive {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl Keepalive {
    /// Interval between pings, 9/10 of the idle timeout
    pub fn ping_period(&self) -> Duration {
        self.idle_timeout * 9 / 10
    }
}

/// Write one frame, failing if it takes longer than `timeout`
pub async fn send_frame<W>(sink: &mut W, frame: Frame, timeout: Duration) -> Result<(), TransportError>
where
    W: Sink<Frame, Error = TransportError> + Unpin,
{
    match tokio::time::timeout(timeout, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::WriteTimeout),
    }
}

/// Inbound frame reader enforcing the read idle deadline
pub struct FrameReader<R> {
    inner: R,
    idle_timeout: Duration,
    deadline: Instant,
}

impl<R> FrameReader<R>
where
    R: Stream<Item = Result<Frame, TransportError>> + Unpin,
{
    pub fn new(inner: R, keepalive: Keepalive) -> Self {
        Self {
            inner,
            idle_timeout: keepalive.idle_timeout,
            deadline: Instant::now() + keepalive.idle_timeout,
        }
    }

    /// Next data frame (text or binary)
    ///
    /// Pongs refresh the read deadline and pings are left to the transport;
    /// neither is returned. A close frame or the end of the stream is
    /// reported as [`TransportError::Closed`].
    pub async fn next_data(&mut self) -> Result<Frame, TransportError> {
        loop {
            let item = match tokio::time::timeout_at(self.deadline, self.inner.next()).await {
                Ok(item) => item,
                Err(_) => return Err(TransportError::IdleTimeout),
            };

            match item {
                None | Some(Ok(Frame::Close)) => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(e),
                Some(Ok(Frame::Pong(_))) => {
                    self.deadline = Instant::now() + self.idle_timeout;
                }
                Some(Ok(Frame::Ping(_))) => {}
                Some(Ok(frame)) => return Ok(frame),
            }
        }
    }
}

/// Outbound delivery and keepalive loop
///
/// Sends every queued text message and a ping every ping period. Returns when
/// the queue is closed (after sending a close frame) or when a write fails.
pub async fn run_outbound<W>(
    mut queue: mpsc::Receiver<String>,
    mut sink: W,
    keepalive: Keepalive,
) -> Result<(), TransportError>
where
    W: Sink<Frame, Error = TransportError> + Unpin,
{
    let period = keepalive.ping_period();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            message = queue.recv() => match message {
                Some(text) => send_frame(&mut sink, Frame::Text(text), keepalive.write_timeout).await?,
                None => {
                    let _ = send_frame(&mut sink, Frame::Close, keepalive.write_timeout).await;
                    return Ok(());
                }
            },
            _ = ticker.tick() => {
                send_frame(&mut sink, Frame::Ping(Bytes::new()), keepalive.write_timeout).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::transport_pair;

    #[test]
    fn test_ping_period() {
        let keepalive = Keepalive::default();
        assert_eq!(keepalive.ping_period(), Duration::from_secs(54));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_skips_control_frames() {
        let (mut remote, local) = transport_pair();
        let mut reader = FrameReader::new(local.inbound, Keepalive::default());

        remote.send(Frame::Ping(Bytes::new()));
        remote.send(Frame::Pong(Bytes::new()));
        remote.send(Frame::Text("hello".into()));

        assert_eq!(reader.next_data().await, Ok(Frame::Text("hello".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_idle_timeout() {
        let (_remote, local) = transport_pair();
        let mut reader = FrameReader::new(local.inbound, Keepalive::default());

        assert_eq!(reader.next_data().await, Err(TransportError::IdleTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_refreshes_deadline() {
        let (mut remote, local) = transport_pair();
        let keepalive = Keepalive::default();
        let mut reader = FrameReader::new(local.inbound, keepalive);

        let feeder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(50)).await;
            remote.send(Frame::Pong(Bytes::new()));
            tokio::time::sleep(Duration::from_secs(50)).await;
            remote.send(Frame::Text("late".into()));
            remote
        });

        // 100s after start, but only 50s after the last pong
        assert_eq!(reader.next_data().await, Ok(Frame::Text("late".into())));
        let _remote = feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_reader_close() {
        let (mut remote, local) = transport_pair();
        let mut reader = FrameReader::new(local.inbound, Keepalive::default());

        remote.send(Frame::Close);
        assert_eq!(reader.next_data().await, Err(TransportError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outbound_sends_messages_and_pings() {
        let (mut remote, local) = transport_pair();
        let (tx, rx) = mpsc::channel(8);
        let keepalive = Keepalive::default();

        let pump = tokio::spawn(run_outbound(rx, local.outbound, keepalive));

        tx.send("one".into()).await.unwrap();
        assert_eq!(remote.recv().await, Some(Frame::Text("one".into())));

        tokio::time::sleep(keepalive.ping_period()).await;
        assert_eq!(remote.recv().await, Some(Frame::Ping(Bytes::new())));

        drop(tx);
        assert_eq!(remote.recv().await, Some(Frame::Close));
        assert_eq!(pump.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_outbound_stops_on_write_failure() {
        let (remote, local) = transport_pair();
        let (tx, rx) = mpsc::channel(8);

        drop(remote);
        tx.send("lost".into()).await.unwrap();

        let result = run_outbound(rx, local.outbound, Keepalive::default()).await;
        assert_eq!(result, Err(TransportError::Closed));
    }
}
