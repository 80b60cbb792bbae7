//! Viewer-count updates
//!
//! Pushes a room's connection count to a socket at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, Stream, StreamExt};
use tokio::time::Instant;

use crate::engine::Negotiator;
use crate::transport::{send_frame, Frame, TransportError};

/// Send the connection count every `interval` until a write fails
pub async fn run_viewer_count<W>(
    negotiator: Arc<Negotiator>,
    mut sink: W,
    interval: Duration,
    write_timeout: Duration,
) -> TransportError
where
    W: Sink<Frame, Error = TransportError> + Unpin,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

    loop {
        ticker.tick().await;
        let count = negotiator.connection_count().await;
        if let Err(e) = send_frame(&mut sink, Frame::Text(count.to_string()), write_timeout).await {
            return e;
        }
    }
}

/// Serve a viewer-count socket; inbound frames are read only to notice the close
pub async fn serve_viewer_count<R, W>(
    negotiator: Arc<Negotiator>,
    mut inbound: R,
    sink: W,
    interval: Duration,
    write_timeout: Duration,
) where
    R: Stream<Item = Result<Frame, TransportError>> + Unpin,
    W: Sink<Frame, Error = TransportError> + Unpin,
{
    let room = negotiator.room().to_string();

    tokio::select! {
        e = run_viewer_count(negotiator, sink, interval, write_timeout) => {
            tracing::debug!(room = %room, error = %e, "Viewer count stopped");
        }
        _ = async {
            while let Some(Ok(frame)) = inbound.next().await {
                if frame == Frame::Close {
                    break;
                }
            }
        } => {
            tracing::debug!(room = %room, "Viewer count socket closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RetryPolicy;
    use crate::testing::{fake_entry, transport_pair, FakeBackend};

    #[tokio::test(start_paused = true)]
    async fn test_count_sent_every_interval() {
        let negotiator = Arc::new(Negotiator::new(
            "room-a",
            Arc::new(FakeBackend::new()),
            RetryPolicy::default(),
        ));
        let (mut remote, local) = transport_pair();

        tokio::spawn(serve_viewer_count(
            Arc::clone(&negotiator),
            local.inbound,
            local.outbound,
            Duration::from_secs(1),
            Duration::from_secs(10),
        ));

        assert_eq!(remote.recv_text().await.as_deref(), Some("0"));

        let (entry, _pc, _rx) = fake_entry(1, 8);
        negotiator.join(entry).await;

        assert_eq!(remote.recv_text().await.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_stops_when_socket_gone() {
        let negotiator = Arc::new(Negotiator::new(
            "room-a",
            Arc::new(FakeBackend::new()),
            RetryPolicy::default(),
        ));
        let (remote, local) = transport_pair();
        drop(remote);

        let error = run_viewer_count(
            negotiator,
            local.outbound,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(error, TransportError::Closed);
    }
}
