//! Adapter from axum WebSockets to transport frames

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{future, Sink, SinkExt, Stream, StreamExt};

use crate::transport::{Frame, TransportError};

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(data) => Frame::Binary(Bytes::from(data)),
            Message::Ping(data) => Frame::Ping(Bytes::from(data)),
            Message::Pong(data) => Frame::Pong(Bytes::from(data)),
            Message::Close(_) => Frame::Close,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data.to_vec()),
            Frame::Ping(data) => Message::Ping(data.to_vec()),
            Frame::Pong(data) => Message::Pong(data.to_vec()),
            Frame::Close => Message::Close(None),
        }
    }
}

/// Split an upgraded socket into frame stream and frame sink
pub fn split_socket(
    socket: WebSocket,
) -> (
    impl Stream<Item = Result<Frame, TransportError>> + Unpin + Send + 'static,
    impl Sink<Frame, Error = TransportError> + Unpin + Send + 'static,
) {
    let (sink, stream) = socket.split();

    let inbound = stream.map(|item| item.map(Frame::from).map_err(TransportError::from));
    let outbound = sink
        .sink_map_err(TransportError::from)
        .with(|frame: Frame| future::ready(Ok::<Message, TransportError>(Message::from(frame))));

    (inbound, outbound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_conversion() {
        assert_eq!(Frame::from(Message::Text("hi".into())), Frame::Text("hi".into()));
        assert_eq!(Frame::from(Message::Binary(vec![1, 2])), Frame::Binary(Bytes::from_static(&[1, 2])));
        assert_eq!(Frame::from(Message::Close(None)), Frame::Close);

        assert!(matches!(Message::from(Frame::Text("hi".into())), Message::Text(t) if t == "hi"));
        assert!(matches!(Message::from(Frame::Ping(Bytes::new())), Message::Ping(p) if p.is_empty()));
        assert!(matches!(Message::from(Frame::Close), Message::Close(None)));
    }
}
