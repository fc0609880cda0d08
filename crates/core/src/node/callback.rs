use std::net::SocketAddrV4;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use futures::StreamExt;

use crate::error::Error;
use crate::error::Result;
use crate::message::Message;
use crate::message::MessageStream;

type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The [RingNode](super::RingNode) holds a shared [AppMessageHandler] trait object.
pub type SharedAppMessageHandler = Arc<dyn AppMessageHandler + Send + Sync>;

/// Receives the application payloads other nodes send to this one.
#[async_trait]
pub trait AppMessageHandler {
    /// Called once per inbound application message. Dropping `msg` closes
    /// the connection it arrived on.
    async fn on_message(&self, msg: AppMessage) -> std::result::Result<(), HandlerError>;
}

/// An application payload together with the connection it arrived on.
pub struct AppMessage {
    /// Address of the sender as seen by this node.
    pub from: SocketAddrV4,
    /// The payload.
    pub payload: Bytes,
    stream: MessageStream,
}

impl std::fmt::Debug for AppMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppMessage")
            .field("from", &self.from)
            .field("size", &self.payload.len())
            .finish()
    }
}

impl AppMessage {
    pub(crate) fn new(from: SocketAddrV4, payload: Bytes, stream: MessageStream) -> Self {
        Self {
            from,
            payload,
            stream,
        }
    }

    /// Send a payload back on the same connection.
    pub async fn reply(&mut self, payload: impl Into<Bytes>) -> Result<()> {
        self.stream.send(Message::custom(payload)).await
    }

    /// Wait for the next application payload on this connection.
    /// `Ok(None)` means the sender closed it.
    pub async fn next_payload(&mut self) -> Result<Option<Bytes>> {
        match self.stream.next().await {
            None => Ok(None),
            Some(Ok(Message::CustomMessage(m))) => Ok(Some(m.0)),
            Some(Ok(other)) => Err(Error::UnexpectedReply(other.to_string())),
            Some(Err(e)) => Err(e),
        }
    }

    /// Take the underlying connection.
    pub fn into_stream(self) -> MessageStream {
        self.stream
    }
}
