//! Chat client pumps
//!
//! A chat socket gets a read pump (inbound frames to hub broadcasts) and a
//! write pump (hub queue to outbound frames, plus keepalive pings).

use bytes::Bytes;
use futures::{Sink, Stream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::transport::{send_frame, Frame, FrameReader, Keepalive, TransportError};

use super::hub::HubHandle;

/// Limits for chat sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    pub keepalive: Keepalive,
    /// Largest accepted inbound message in bytes
    pub max_message_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            keepalive: Keepalive::default(),
            max_message_size: 512,
        }
    }
}

/// Newlines become spaces, surrounding whitespace is dropped
pub fn normalize_message(raw: &str) -> String {
    raw.replace('\n', " ").trim().to_string()
}

/// Serve one chat socket until it closes
pub async fn run_chat_client<R, W>(hub: HubHandle, inbound: R, outbound: W, config: ChatConfig)
where
    R: Stream<Item = Result<Frame, TransportError>> + Unpin + Send,
    W: Sink<Frame, Error = TransportError> + Unpin + Send + 'static,
{
    let (client_id, queue) = hub.register();
    let mut writer = tokio::spawn(write_pump(queue, outbound, config.keepalive));

    let mut reader = FrameReader::new(inbound, config.keepalive);
    let result = tokio::select! {
        result = read_pump(&hub, &mut reader, config.max_message_size) => result,
        result = &mut writer => match result {
            Ok(result) => result,
            Err(_) => Ok(()),
        },
    };

    if let Err(e) = result {
        tracing::debug!(client = client_id, error = %e, "Chat client ended");
    }

    // Unregistering closes the queue, which lets the write pump send a close frame
    hub.unregister(client_id);
    if !writer.is_finished() {
        let deadline = config.keepalive.write_timeout;
        if tokio::time::timeout(deadline, &mut writer).await.is_err() {
            writer.abort();
        }
    }
}

async fn read_pump<R>(
    hub: &HubHandle,
    reader: &mut FrameReader<R>,
    max_message_size: usize,
) -> Result<(), TransportError>
where
    R: Stream<Item = Result<Frame, TransportError>> + Unpin,
{
    loop {
        let raw = match reader.next_data().await {
            Ok(Frame::Text(text)) => text,
            Ok(Frame::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
            Ok(_) => continue,
            Err(TransportError::Closed) => return Ok(()),
            Err(e) => return Err(e),
        };

        if raw.len() > max_message_size {
            return Err(TransportError::MessageTooLarge(raw.len()));
        }

        hub.broadcast(normalize_message(&raw));
    }
}

/// Deliver queued messages, coalescing whatever is already waiting
async fn write_pump<W>(
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
                Some(mut text) => {
                    while let Ok(more) = queue.try_recv() {
                        text.push('\n');
                        text.push_str(&more);
                    }
                    send_frame(&mut sink, Frame::Text(text), keepalive.write_timeout).await?;
                }
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
