//! Outbound requests to other ring nodes.
//!
//! Every call opens a fresh connection, writes one request and waits for one
//! reply. The whole exchange, connect included, is bounded by the configured
//! timeout. Whatever goes wrong, the caller gets a value back.

use std::net::SocketAddrV4;
use std::time::Duration;

use bytes::Bytes;
use chordring_transport::core::transport::SharedTransport;
use futures::SinkExt;
use futures::StreamExt;
use tokio_util::codec::Framed;

use crate::config::RingConfig;
use crate::dht::NodeInfo;
use crate::dht::RingId;
use crate::error::Error;
use crate::error::Result;
use crate::message::AliveCheckSend;
use crate::message::FindSuccessorSend;
use crate::message::Message;
use crate::message::MessageCodec;
use crate::message::MessageStream;
use crate::message::NotifyPredecessorSend;
use crate::message::QueryPredecessorSend;

/// Client side of the ring protocol.
#[derive(Clone)]
pub struct RingClient {
    transport: SharedTransport,
    timeout: Duration,
    hop_margin: Duration,
    max_message_len: u32,
}

impl RingClient {
    /// Create a client over `transport`.
    pub fn new(transport: SharedTransport, config: &RingConfig) -> Self {
        Self {
            transport,
            timeout: config.rpc_timeout(),
            hop_margin: config.hop_timeout_margin(),
            max_message_len: config.max_message_len,
        }
    }

    /// Open a framed connection to `addr`.
    pub async fn connect(&self, addr: SocketAddrV4) -> Result<MessageStream> {
        let conn = tokio::time::timeout(self.timeout, self.transport.connect(addr))
            .await
            .map_err(|_| Error::RpcTimeout)??;
        Ok(Framed::new(conn, MessageCodec::new(self.max_message_len)))
    }

    /// How long a lookup carrying `ttl` may take. Every hop down the chain gets
    /// one margin less than its caller, so it reports back before the caller
    /// gives up on it.
    pub fn lookup_timeout(&self, ttl: u8) -> Duration {
        self.timeout + self.hop_margin * u32::from(ttl)
    }

    /// Send `msg` to `addr` and wait for the single reply.
    pub async fn call(&self, addr: SocketAddrV4, msg: Message) -> Result<Message> {
        self.call_with_timeout(addr, msg, self.timeout).await
    }

    async fn call_with_timeout(
        &self,
        addr: SocketAddrV4,
        msg: Message,
        timeout: Duration,
    ) -> Result<Message> {
        tracing::debug!("call {} with {}", addr, msg);
        tokio::time::timeout(timeout, self.exchange(addr, msg))
            .await
            .map_err(|_| Error::RpcTimeout)?
    }

    async fn exchange(&self, addr: SocketAddrV4, msg: Message) -> Result<Message> {
        let conn = self.transport.connect(addr).await?;
        let mut stream = Framed::new(conn, MessageCodec::new(self.max_message_len));
        stream.send(msg).await?;
        match stream.next().await {
            Some(reply) => reply,
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Ask `addr` for the owner of `id`. `Ok(None)` means the remote lookup failed.
    /// The wait is bounded by [RingClient::lookup_timeout].
    pub async fn find_successor(
        &self,
        addr: SocketAddrV4,
        id: RingId,
        ttl: u8,
    ) -> Result<Option<NodeInfo>> {
        match self
            .call_with_timeout(
                addr,
                Message::FindSuccessorSend(FindSuccessorSend { id, ttl }),
                self.lookup_timeout(ttl),
            )
            .await?
        {
            Message::FindSuccessorReport(r) => Ok(r.node),
            other => Err(Error::UnexpectedReply(other.to_string())),
        }
    }

    /// Ask `addr` for its predecessor. `Ok(None)` means it has none.
    pub async fn query_predecessor(
        &self,
        addr: SocketAddrV4,
        requester: RingId,
    ) -> Result<Option<NodeInfo>> {
        match self
            .call(
                addr,
                Message::QueryPredecessorSend(QueryPredecessorSend { id: requester }),
            )
            .await?
        {
            Message::QueryPredecessorReport(r) => Ok(r.node),
            other => Err(Error::UnexpectedReply(other.to_string())),
        }
    }

    /// Whether `addr` answers an alive check in time.
    pub async fn check_alive(&self, addr: SocketAddrV4) -> bool {
        match self
            .call(addr, Message::AliveCheckSend(AliveCheckSend))
            .await
        {
            Ok(Message::AliveCheckReport(r)) => r.alive,
            Ok(other) => {
                tracing::warn!("alive check on {} got {}", addr, other);
                false
            }
            Err(e) => {
                tracing::debug!("alive check on {} failed: {}", addr, e);
                false
            }
        }
    }

    /// Tell `addr` that `me` may be its predecessor. Returns whether it agreed.
    pub async fn notify(&self, addr: SocketAddrV4, me: NodeInfo) -> Result<bool> {
        match self
            .call(
                addr,
                Message::NotifyPredecessorSend(NotifyPredecessorSend {
                    id: me.id,
                    port: me.port,
                }),
            )
            .await?
        {
            Message::NotifyPredecessorReport(r) => Ok(r.accepted),
            other => Err(Error::UnexpectedReply(other.to_string())),
        }
    }

    /// Open a connection, send an application payload and hand the stream back
    /// so the caller can read replies.
    pub async fn connect_and_send(
        &self,
        addr: SocketAddrV4,
        payload: Bytes,
    ) -> Result<MessageStream> {
        let mut stream = self.connect(addr).await?;
        tokio::time::timeout(self.timeout, stream.send(Message::custom(payload)))
            .await
            .map_err(|_| Error::RpcTimeout)??;
        Ok(stream)
    }

    /// Fire and forget an application payload.
    pub async fn send_message(&self, addr: SocketAddrV4, payload: Bytes) -> Result<()> {
        let mut stream = self.connect_and_send(addr, payload).await?;
        // Best effort, the payload is already flushed.
        let _ = stream.close().await;
        Ok(())
    }
}
