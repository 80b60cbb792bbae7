//! Media forwarding
//!
//! Copies packets from a published remote track to its local mirror. Packets
//! are never inspected or rewritten.

use std::sync::Arc;

use crate::rtc::{LocalTrack, RemoteTrack};

/// Counters for one forwarding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForwardStats {
    pub packets: u64,
    pub bytes: u64,
    pub write_errors: u64,
}

/// Forward until the remote track fails to read
///
/// Write failures are counted and skipped; only a read failure ends the loop.
pub async fn forward_track(remote: Arc<dyn RemoteTrack>, local: Arc<dyn LocalTrack>) -> ForwardStats {
    let mut stats = ForwardStats::default();

    loop {
        let packet = match remote.read_packet().await {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!(track = %local.id(), error = %e, "Remote track ended");
                break;
            }
        };

        stats.packets += 1;
        stats.bytes += packet.len() as u64;

        if let Err(e) = local.write_packet(&packet).await {
            stats.write_errors += 1;
            tracing::trace!(track = %local.id(), error = %e, "Packet write failed");
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TrackId;
    use crate::rtc::{Codec, TrackSpec};
    use crate::testing::{FakeLocalTrack, FakeRemoteTrack};

    #[tokio::test]
    async fn test_packets_copied_verbatim() {
        let remote = Arc::new(FakeRemoteTrack::video("v1", "s1"));
        let local = Arc::new(FakeLocalTrack::new(TrackSpec {
            id: TrackId::new("v1"),
            stream_id: "s1".into(),
            codec: Codec::new("video/VP8", 90000, 0),
        }));

        remote.push(b"\x80\x60\x00\x01payload-one");
        remote.push(b"\x80\x60\x00\x02payload-two");
        remote.finish();

        let stats = forward_track(remote, local.clone()).await;

        assert_eq!(stats.packets, 2);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(
            local.packets(),
            vec![
                bytes::Bytes::from_static(b"\x80\x60\x00\x01payload-one"),
                bytes::Bytes::from_static(b"\x80\x60\x00\x02payload-two"),
            ]
        );
    }
}
