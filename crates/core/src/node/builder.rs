#![warn(missing_docs)]
//! This module provider [RingNodeBuilder] and it's interface for
//! [RingNode]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;

use chordring_transport::core::transport::BoxedListener;
use chordring_transport::core::transport::SharedTransport;
use chordring_transport::error::Error as TransportError;
use futures_timer::Delay;

use super::callback::SharedAppMessageHandler;
use super::NodeState;
use super::RingNode;
use crate::config::RingConfig;
use crate::dht::NodeInfo;
use crate::dht::PeerRing;
use crate::dht::RingId;
use crate::dht::Stabilizer;
use crate::dht::SuccessorResolver;
use crate::error::Result;
use crate::message::MessageHandler;
use crate::rpc::RingClient;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Creates a RingNodeBuilder to configure a RingNode.
pub struct RingNodeBuilder {
    name: String,
    transport: SharedTransport,
    listen_port: u16,
    ring_id: Option<RingId>,
    config: RingConfig,
    app_message_handler: Option<SharedAppMessageHandler>,
}

impl RingNodeBuilder {
    /// Creates new instance of [RingNodeBuilder]. The node id is the hash of `name`.
    pub fn new(name: &str, transport: SharedTransport) -> Self {
        RingNodeBuilder {
            name: name.to_string(),
            transport,
            listen_port: 0,
            ring_id: None,
            config: RingConfig::default(),
            app_message_handler: None,
        }
    }

    /// Port to listen on. 0, the default, picks a free one.
    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Use `id` instead of the hash of the name.
    pub fn ring_id(mut self, id: RingId) -> Self {
        self.ring_id = Some(id);
        self
    }

    /// Sets up timeouts and sizes.
    pub fn config(mut self, config: RingConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the handler of application messages.
    pub fn app_message_handler(mut self, handler: SharedAppMessageHandler) -> Self {
        self.app_message_handler = Some(handler);
        self
    }

    /// Bind the listener and start accepting connections.
    /// The node is in [NodeState::Created] until it creates or joins a ring.
    pub async fn build(self) -> Result<RingNode> {
        let listener = self.transport.listen(self.listen_port).await?;
        let local = listener.local_addr();
        let ip = advertised_ip(self.config.external_ip, *local.ip());
        let id = self
            .ring_id
            .unwrap_or_else(|| RingId::from_name(&self.name));
        let node = NodeInfo::new(id, ip, local.port());
        tracing::info!("node {} ({}) listening on {}", self.name, node, local);

        let state = Arc::new(Mutex::new(NodeState::Created));
        let dht = Arc::new(PeerRing::new(node, self.config.successor_list_len));
        let client = RingClient::new(self.transport.clone(), &self.config);
        let resolver = SuccessorResolver::new(
            dht.clone(),
            client.clone(),
            state.clone(),
            self.config.max_hops,
        );
        let stabilizer = Arc::new(Stabilizer::new(
            dht.clone(),
            client.clone(),
            resolver.clone(),
            self.config.successor_list_len,
        ));
        let app_handler = Arc::new(RwLock::new(self.app_message_handler));
        let message_handler = MessageHandler::new(
            dht.clone(),
            resolver.clone(),
            state.clone(),
            app_handler.clone(),
            &self.config,
        );

        let accept_task = tokio::spawn(accept_loop(listener, message_handler));

        Ok(RingNode {
            node,
            dht,
            config: self.config,
            client,
            resolver,
            stabilizer,
            app_handler,
            state,
            accept_task,
            tasks: Mutex::new(vec![]),
        })
    }
}

/// The address peers are told to reach this node at.
fn advertised_ip(external_ip: Option<Ipv4Addr>, bound: Ipv4Addr) -> Ipv4Addr {
    match external_ip {
        Some(ip) => ip,
        None if bound.is_unspecified() => {
            tracing::warn!(
                "listening on {} without external_ip, advertising {}; \
                 peers on other hosts will not reach this node",
                bound,
                Ipv4Addr::LOCALHOST
            );
            Ipv4Addr::LOCALHOST
        }
        None => bound,
    }
}

async fn accept_loop(mut listener: BoxedListener, handler: MessageHandler) {
    loop {
        let conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(TransportError::ListenerClosed(addr)) => {
                tracing::info!("listener on {} closed", addr);
                return;
            }
            Err(e) => {
                tracing::warn!("failed to accept connection: {}", e);
                Delay::new(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let handler = handler.clone();
        tokio::spawn(async move {
            let remote = conn.remote_addr();
            if let Err(e) = handler.handle_connection(conn).await {
                tracing::debug!("connection from {} ended with error: {}", remote, e);
            }
        });
    }
}
