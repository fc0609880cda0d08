#![warn(missing_docs)]
//! A ring node: ring state, transport and background tasks tied together.

mod builder;
/// Application message interface of a node
pub mod callback;

use std::net::SocketAddrV4;
use std::sync::Arc;
use std::sync::Mutex;

pub use builder::RingNodeBuilder;
use bytes::Bytes;
pub use callback::AppMessage;
pub use callback::AppMessageHandler;
pub use callback::SharedAppMessageHandler;
use tokio::task::JoinHandle;

use crate::config::RingConfig;
use crate::dht::Chord;
use crate::dht::NodeInfo;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::dht::RingId;
use crate::dht::Stabilizer;
use crate::dht::SuccessorResolver;
use crate::dht::TopoInfo;
use crate::error::Error;
use crate::error::Result;
use crate::message::handlers::AppHandlerSlot;
use crate::message::MessageStream;
use crate::rpc::RingClient;

/// Lifecycle of a [RingNode].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Listening, not part of any ring yet.
    Created,
    /// Waiting for the bootstrap peer to answer.
    Joining,
    /// Member of a ring, background tasks running.
    Joined,
    /// Shut down.
    Destroyed,
}

/// Node state shared with the parts answering peers.
pub type SharedNodeState = Arc<Mutex<NodeState>>;

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A member of the ring.
pub struct RingNode {
    pub(crate) node: NodeInfo,
    pub(crate) dht: Arc<PeerRing>,
    pub(crate) config: RingConfig,
    pub(crate) client: RingClient,
    pub(crate) resolver: SuccessorResolver,
    pub(crate) stabilizer: Arc<Stabilizer>,
    pub(crate) app_handler: AppHandlerSlot,
    pub(crate) state: SharedNodeState,
    pub(crate) accept_task: JoinHandle<()>,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RingNode {
    /// Id, address and port of this node.
    pub fn node_info(&self) -> NodeInfo {
        self.node
    }

    /// Id of this node.
    pub fn id(&self) -> RingId {
        self.node.id
    }

    /// Get DHT(Distributed Hash Table) of self.
    pub fn dht(&self) -> Arc<PeerRing> {
        self.dht.clone()
    }

    /// Client used for outbound requests.
    pub fn client(&self) -> &RingClient {
        &self.client
    }

    /// Stabilization runner, for driving rounds by hand.
    pub fn stabilizer(&self) -> Arc<Stabilizer> {
        self.stabilizer.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Result<NodeState> {
        Ok(*self.lock_state()?)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<NodeState>> {
        self.state.lock().map_err(|_| Error::StateSyncLockError)
    }

    /// Move from `from` to `to`, failing if the node is elsewhere.
    fn transition(&self, from: NodeState, to: NodeState) -> Result<()> {
        let mut state = self.lock_state()?;
        if *state != from {
            return Err(Error::InvalidState(state.to_string()));
        }
        tracing::debug!("node {} state {} -> {}", self.node.id, from, to);
        *state = to;
        Ok(())
    }

    /// Become a ring of one.
    pub fn network_create(&self) -> Result<()> {
        self.transition(NodeState::Created, NodeState::Joined)?;
        self.dht.create()?;
        tracing::info!("node {} created a new ring", self.node);
        self.start_tasks()
    }

    /// Join the ring `bootstrap` belongs to. Returns the successor found.
    ///
    /// On failure the node goes back to [NodeState::Created] and may try again.
    pub async fn network_join(&self, bootstrap: SocketAddrV4) -> Result<NodeInfo> {
        self.transition(NodeState::Created, NodeState::Joining)?;
        match self.join_via(bootstrap).await {
            Ok(successor) => {
                self.transition(NodeState::Joining, NodeState::Joined)?;
                tracing::info!(
                    "node {} joined via {}, successor {}",
                    self.node,
                    bootstrap,
                    successor
                );
                self.start_tasks()?;
                Ok(successor)
            }
            Err(e) => {
                tracing::warn!(
                    "node {} failed to join via {}: {}",
                    self.node,
                    bootstrap,
                    e
                );
                self.transition(NodeState::Joining, NodeState::Created)?;
                match e {
                    Error::DuplicateId(_) => Err(e),
                    e => Err(Error::JoinFailed(e.to_string())),
                }
            }
        }
    }

    async fn join_via(&self, bootstrap: SocketAddrV4) -> Result<NodeInfo> {
        let successor = self
            .client
            .find_successor(bootstrap, self.node.id, self.config.max_hops)
            .await?
            .ok_or(Error::SuccessorNotFound(self.node.id))?;
        if successor.id == self.node.id {
            return Err(Error::DuplicateId(self.node.id));
        }

        if let PeerRingAction::RemoteAction(next, PeerRingRemoteAction::Notify(me)) =
            self.dht.join(successor)?
        {
            // Stabilization repeats the notify, a lost one only slows convergence.
            if let Err(e) = self.client.notify(next.addr(), me).await {
                tracing::warn!("failed to notify {} after join: {}", next, e);
            }
        }
        Ok(successor)
    }

    fn start_tasks(&self) -> Result<()> {
        let interval = self.config.stabilize_interval();
        let check_interval = self.config.check_predecessor_interval();
        let mut tasks = self.tasks.lock().map_err(|_| Error::StateSyncLockError)?;
        tasks.push(tokio::spawn(self.stabilizer.clone().wait(interval)));
        tasks.push(tokio::spawn(
            self.stabilizer.clone().wait_fix_fingers(interval),
        ));
        tasks.push(tokio::spawn(
            self.stabilizer.clone().wait_check(check_interval),
        ));
        Ok(())
    }

    /// Find the node owning `id`. Only a member of a ring can answer.
    pub async fn find_successor(&self, id: RingId) -> Result<NodeInfo> {
        let state = self.state()?;
        if state != NodeState::Joined {
            return Err(Error::InvalidState(state.to_string()));
        }
        self.resolver.find_successor(id).await
    }

    /// Replace the handler of application messages.
    pub fn set_app_message_handler(&self, handler: SharedAppMessageHandler) -> Result<()> {
        let mut inner = self
            .app_handler
            .write()
            .map_err(|_| Error::CallbackSyncLockError)?;
        *inner = Some(handler);
        Ok(())
    }

    /// Send an application payload to `dest` without waiting for a reply.
    pub async fn send_message(&self, dest: SocketAddrV4, payload: impl Into<Bytes>) -> Result<()> {
        self.client.send_message(dest, payload.into()).await
    }

    /// Send an application payload to `dest` and keep the connection open for
    /// replies.
    pub async fn connect_and_send(
        &self,
        dest: SocketAddrV4,
        payload: impl Into<Bytes>,
    ) -> Result<MessageStream> {
        self.client.connect_and_send(dest, payload.into()).await
    }

    /// Send an application payload to the node owning `id`.
    /// Returns the node it was delivered to.
    pub async fn route_message(&self, id: RingId, payload: impl Into<Bytes>) -> Result<NodeInfo> {
        let owner = self.find_successor(id).await?;
        tracing::debug!("route message for {} to {}", id, owner);
        self.send_message(owner.addr(), payload).await?;
        Ok(owner)
    }

    /// Snapshot of successors, predecessor and fingers.
    pub fn topo_info(&self) -> Result<TopoInfo> {
        self.dht.topo_info()
    }

    /// Stop accepting connections and stop the background tasks.
    pub fn shutdown(&self) -> Result<()> {
        self.accept_task.abort();
        let mut tasks = self.tasks.lock().map_err(|_| Error::StateSyncLockError)?;
        for task in tasks.drain(..) {
            task.abort();
        }
        *self.lock_state()? = NodeState::Destroyed;
        tracing::info!("node {} shut down", self.node);
        Ok(())
    }
}

impl Drop for RingNode {
    fn drop(&mut self) {
        self.accept_task.abort();
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
