use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::config::RingConfig;
use crate::dht::RingId;
use crate::error::Result;
use crate::node::AppMessage;
use crate::node::AppMessageHandler;
use crate::node::RingNode;
use crate::node::RingNodeBuilder;
use crate::transport::connections::MemoryNetwork;

mod test_lookup;
mod test_message_handler;
mod test_ring;
mod test_stabilization;

pub const TEST_PORT: u16 = 7000;

/// Background rounds are pushed out of the way so tests drive them by hand.
pub fn test_config() -> RingConfig {
    RingConfig {
        stabilize_interval_ms: 3_600_000,
        check_predecessor_interval_ms: 3_600_000,
        rpc_timeout_ms: 300,
        hop_timeout_margin_ms: 100,
        ..Default::default()
    }
}

/// A node on its own host `ip`, listening on [TEST_PORT] with id `id`.
pub async fn prepare_node(net: &MemoryNetwork, ip: Ipv4Addr, id: u32) -> Result<RingNode> {
    RingNodeBuilder::new(&format!("node-{}", id), Arc::new(net.transport(ip)))
        .listen_port(TEST_PORT)
        .ring_id(RingId::new(id))
        .config(test_config())
        .build()
        .await
}

pub fn host(n: usize) -> Ipv4Addr {
    Ipv4Addr::new(10, 1, (n / 250) as u8, (n % 250) as u8 + 1)
}

/// Create a ring with the first id and join the others through it, one by one.
pub async fn prepare_ring(net: &MemoryNetwork, ids: &[u32]) -> Result<Vec<RingNode>> {
    let mut nodes: Vec<RingNode> = vec![];
    for (i, id) in ids.iter().enumerate() {
        let node = prepare_node(net, host(i), *id).await?;
        match nodes.first() {
            None => node.network_create()?,
            Some(bootstrap) => {
                node.network_join(bootstrap.node_info().addr()).await?;
            }
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Run `rounds` stabilize rounds on every node, then fix every finger table.
pub async fn stabilize_all(nodes: &[RingNode], rounds: usize) -> Result<()> {
    for _ in 0..rounds {
        for node in nodes {
            node.stabilizer().stabilize().await?;
        }
    }
    for node in nodes {
        node.stabilizer().fix_fingers().await?;
    }
    Ok(())
}

/// The node owning `id` on a ring made of `ids`.
pub fn expected_owner(ids: &[u32], id: u32) -> u32 {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|n| *n >= id)
        .unwrap_or(sorted[0])
}

/// Forwards every app message into a channel.
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<(AppMessage, Bytes)>,
}

impl ChannelHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(AppMessage, Bytes)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl AppMessageHandler for ChannelHandler {
    async fn on_message(
        &self,
        msg: AppMessage,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let payload = msg.payload.clone();
        self.tx.send((msg, payload)).map_err(|e| e.to_string().into())
    }
}
