#![warn(missing_docs)]
//! This module implemented message handler of ring nodes.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chordring_transport::core::transport::Connection;
use futures::SinkExt;
use futures::StreamExt;
use tokio_util::codec::Framed;

use super::Message;
use super::MessageCodec;
use super::MessageStream;
use crate::config::RingConfig;
use crate::dht::PeerRing;
use crate::dht::SuccessorResolver;
use crate::error::Error;
use crate::error::Result;
use crate::node::NodeState;
use crate::node::SharedAppMessageHandler;
use crate::node::SharedNodeState;

/// Operator and Handler for CustomMessage
pub mod custom;
/// Operator and Handler for successor and predecessor queries
pub mod dht;
/// Operator and handler for DHT stablization
pub mod stabilization;

/// Slot holding the application handler, swappable at runtime.
pub type AppHandlerSlot = Arc<RwLock<Option<SharedAppMessageHandler>>>;

/// MessageHandler answers inbound connections.
#[derive(Clone)]
pub struct MessageHandler {
    dht: Arc<PeerRing>,
    resolver: SuccessorResolver,
    state: SharedNodeState,
    app_handler: AppHandlerSlot,
    read_timeout: Duration,
    max_message_len: u32,
}

/// Generic trait for handle message ,inspired by Actor-Model.
/// The handler owns the connection the message arrived on and closes it by
/// dropping it.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, stream: MessageStream, msg: T) -> Result<()>;
}

impl MessageHandler {
    /// Create a new MessageHandler instance.
    pub fn new(
        dht: Arc<PeerRing>,
        resolver: SuccessorResolver,
        state: SharedNodeState,
        app_handler: AppHandlerSlot,
        config: &RingConfig,
    ) -> Self {
        Self {
            dht,
            resolver,
            state,
            app_handler,
            read_timeout: config.rpc_timeout(),
            max_message_len: config.max_message_len,
        }
    }

    /// Whether this node is a ring member and may take part in ring upkeep.
    pub(crate) fn is_joined(&self) -> Result<bool> {
        let state = self.state.lock().map_err(|_| Error::StateSyncLockError)?;
        Ok(*state == NodeState::Joined)
    }

    /// Read one request from `conn` and dispatch it.
    ///
    /// A peer that stays silent, closes early or sends garbage gets its
    /// connection closed. Reports and `Unknown` frames are never answered.
    pub async fn handle_connection(&self, conn: Connection) -> Result<()> {
        let remote = conn.remote_addr();
        let mut stream = Framed::new(conn, MessageCodec::new(self.max_message_len));

        let msg = match tokio::time::timeout(self.read_timeout, stream.next()).await {
            Err(_) => {
                tracing::warn!("{} sent no complete message in time, closing", remote);
                return Err(Error::RpcTimeout);
            }
            Ok(None) => {
                tracing::debug!("{} closed before sending a message", remote);
                return Ok(());
            }
            Ok(Some(Err(e))) => {
                tracing::warn!("malformed message from {}: {}, closing", remote, e);
                return Err(e);
            }
            Ok(Some(Ok(msg))) => msg,
        };
        tracing::debug!("{} received {} from {}", self.dht.id(), msg, remote);

        match msg {
            Message::FindSuccessorSend(m) => self.handle(stream, m).await,
            Message::QueryPredecessorSend(m) => self.handle(stream, m).await,
            Message::AliveCheckSend(m) => self.handle(stream, m).await,
            Message::NotifyPredecessorSend(m) => self.handle(stream, m).await,
            Message::CustomMessage(m) => self.handle(stream, m).await,
            Message::FindSuccessorReport(_)
            | Message::QueryPredecessorReport(_)
            | Message::AliveCheckReport(_)
            | Message::NotifyPredecessorReport(_)
            | Message::Unknown(_) => {
                let tag = msg.message_type().tag() as char;
                tracing::warn!("unexpected message {} from {}, closing", tag, remote);
                Ok(())
            }
        }
    }
}

/// Write the reply and close the connection.
pub(crate) async fn reply(mut stream: MessageStream, msg: Message) -> Result<()> {
    stream.send(msg).await?;
    // The reply is flushed, a failing shutdown only means the peer left first.
    let _ = stream.close().await;
    Ok(())
}
