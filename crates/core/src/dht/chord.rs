//! Chord algorithm implement.
#![warn(missing_docs)]
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use super::finger::FingerTable;
use super::id::Interval;
use super::id::RingId;
use super::successor::SuccessorSeq;
use super::types::Chord;
use super::types::NodeInfo;
use super::types::TopoInfo;
use crate::consts::ID_BITS;
use crate::dht::SuccessorReader;
use crate::dht::SuccessorWriter;
use crate::error::Error;
use crate::error::Result;

/// PeerRing is the local view a node has of the ring.
/// All nodes form a clockwise ring in the order of their [RingId].
/// This struct takes its name from that.
/// PeerRing implemented [Chord] algorithm.
pub struct PeerRing {
    /// The node itself.
    pub node: NodeInfo,
    /// [FingerTable] help node to find successor quickly.
    pub finger: Arc<Mutex<FingerTable>>,
    /// The next node on the ring.
    /// The [SuccessorSeq] may contain multiple nodes for fault tolerance.
    pub successor_seq: SuccessorSeq,
    /// The previous node on the ring.
    pub predecessor: Arc<Mutex<Option<NodeInfo>>>,
}

/// `PeerRing` use this to describe the result of [Chord] algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerRingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Found some node.
    Some(NodeInfo),
    /// Trigger a remote action on the node given as first field.
    RemoteAction(NodeInfo, RemoteAction),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
/// The caller performs the request and feeds the answer back into `PeerRing`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Ask the target to find the successor of this id.
    FindSuccessor(RingId),
    /// Tell the target that this node may be its predecessor.
    Notify(NodeInfo),
}

impl PeerRingAction {
    /// Returns `true` if the action is a [PeerRingAction::None] value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the action is a [PeerRingAction::Some] value.
    pub fn is_some(&self) -> bool {
        matches!(self, Self::Some(_))
    }

    /// Returns `true` if the action is a [PeerRingAction::RemoteAction] value.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteAction(..))
    }
}

impl PeerRing {
    /// Create a ring view for `node` keeping up to `succ_max` successors.
    pub fn new(node: NodeInfo, succ_max: u8) -> Self {
        Self {
            node,
            finger: Arc::new(Mutex::new(FingerTable::for_ring(node))),
            successor_seq: SuccessorSeq::new(node, succ_max),
            predecessor: Arc::new(Mutex::new(None)),
        }
    }

    /// Id of the node.
    pub fn id(&self) -> RingId {
        self.node.id
    }

    /// Return successor sequence
    pub fn successors(&self) -> SuccessorSeq {
        self.successor_seq.clone()
    }

    /// The authoritative successor, self when alone.
    pub fn successor(&self) -> Result<NodeInfo> {
        self.successor_seq.min()
    }

    /// Whether the node is its own successor.
    pub fn is_alone(&self) -> Result<bool> {
        Ok(self.successor()?.id == self.node.id)
    }

    /// Lock and return MutexGuard of finger table.
    pub fn lock_finger(&self) -> Result<MutexGuard<FingerTable>> {
        self.finger.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Lock and return MutexGuard of predecessor.
    pub fn lock_predecessor(&self) -> Result<MutexGuard<Option<NodeInfo>>> {
        self.predecessor.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Copy of the predecessor.
    pub fn predecessor(&self) -> Result<Option<NodeInfo>> {
        Ok(*self.lock_predecessor()?)
    }

    /// Become a ring of one. The node is its own successor and predecessor.
    pub fn create(&self) -> Result<()> {
        self.successor_seq.replace(&[])?;
        *self.lock_predecessor()? = Some(self.node);
        Ok(())
    }

    /// Remove a node from finger table.
    /// Also remove it from successor sequence and predecessor.
    /// If successor_seq become empty, try setting the closest finger to it.
    pub fn remove(&self, node: &NodeInfo) -> Result<()> {
        let mut finger = self.lock_finger()?;
        let successor = self.successors();
        let mut predecessor = self.lock_predecessor()?;
        if let Some(p) = *predecessor {
            if p.id == node.id {
                tracing::info!("predecessor {} removed", p);
                *predecessor = None;
            }
        }
        finger.remove(node.id);
        successor.remove(node)?;
        if successor.is_empty()? {
            if let Some(x) = finger.first() {
                tracing::info!("successor list empty, promote finger {}", x);
                successor.update(x)?;
            }
        }
        Ok(())
    }

    /// Forget the predecessor if it is `node`. Returns whether it was cleared.
    pub fn clear_predecessor_if(&self, node: &NodeInfo) -> Result<bool> {
        let mut predecessor = self.lock_predecessor()?;
        match *predecessor {
            Some(p) if p.id == node.id => {
                tracing::info!("predecessor {} cleared", p);
                *predecessor = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Store the result of a finger lookup.
    pub fn set_finger(&self, index: usize, node: Option<NodeInfo>) -> Result<()> {
        self.lock_finger()?.set(index, node);
        Ok(())
    }

    /// Ids whose successors the finger slots should hold.
    pub fn finger_starts(&self) -> Vec<RingId> {
        (0..ID_BITS).map(|k| self.node.id.finger_start(k)).collect()
    }

    /// Replace the successor list with what a ring walk found.
    /// An empty walk leaves the current list in place.
    pub fn sync_successors(&self, walked: &[NodeInfo]) -> Result<()> {
        if walked.is_empty() {
            return Ok(());
        }
        self.successor_seq.replace(walked)
    }

    /// A helper function to get the topological
    /// info about the chord.
    pub fn topo_info(&self) -> Result<TopoInfo> {
        Ok(TopoInfo {
            node: self.node,
            successors: self.successors().list()?,
            predecessor: self.predecessor()?,
            fingers: self.lock_finger()?.list().clone(),
        })
    }
}

impl Chord<PeerRingAction> for PeerRing {
    /// Adopt a node found by a join lookup as successor.
    /// The caller is told to notify it right away.
    fn join(&self, node: NodeInfo) -> Result<PeerRingAction> {
        if node.id == self.node.id {
            return Ok(PeerRingAction::None);
        }

        let mut finger = self.lock_finger()?;
        finger.join(node);
        // Always try update
        self.successors().update(node)?;
        Ok(PeerRingAction::RemoteAction(
            node,
            RemoteAction::Notify(self.node),
        ))
    }

    /// Find the successor of an id.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, id: RingId) -> Result<PeerRingAction> {
        if id == self.node.id {
            return Ok(PeerRingAction::Some(self.node));
        }

        let successor = self.successor()?;
        let succ = if successor.id == self.node.id
            || id.in_range(self.node.id, successor.id, Interval::OpenClosed)
        {
            // Alone on the ring, or the id falls between self and successor.
            PeerRingAction::Some(successor)
        } else {
            // Otherwise, find the closest preceding node and ask it.
            let next = self
                .lock_finger()?
                .closest_preceding_node(id)
                .unwrap_or(successor);
            PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessor(id))
        };

        tracing::debug!(
            "find_successor: self: {}, id: {}, successor: {}, result: {:?}",
            self.node.id,
            id,
            successor,
            succ
        );

        Ok(succ)
    }

    /// Handle notification from a node that thinks it is our predecessor.
    /// Returns whether `candidate` is the predecessor afterwards, so repeating a
    /// notification is harmless.
    fn notify(&self, candidate: NodeInfo) -> Result<bool> {
        if candidate.id == self.node.id {
            return Ok(false);
        }
        let mut predecessor = self.lock_predecessor()?;

        let accept = match *predecessor {
            None => true,
            Some(pre) if pre.id == self.node.id => true,
            Some(pre) if pre == candidate => return Ok(true),
            Some(pre) => candidate
                .id
                .in_range(pre.id, self.node.id, Interval::Open),
        };

        if accept {
            tracing::info!("{} accepted {} as predecessor", self.node.id, candidate);
            *predecessor = Some(candidate);
        }
        Ok(accept)
    }

    /// Stabilize step. `reported` is what the successor believes its predecessor is.
    /// It is adopted as successor when it sits between self and the successor.
    /// Whatever happens, the (possibly new) successor gets notified, unless the node
    /// is still alone.
    fn stabilize(&self, reported: Option<NodeInfo>) -> Result<PeerRingAction> {
        let successor = self.successor()?;
        if let Some(x) = reported {
            let alone = successor.id == self.node.id;
            if x.id != self.node.id
                && (alone || x.id.in_range(self.node.id, successor.id, Interval::Open))
            {
                tracing::info!("{} adopted {} as successor", self.node.id, x);
                self.successors().update(x)?;
                self.lock_finger()?.join(x);
            }
        }

        let successor = self.successor()?;
        if successor.id == self.node.id {
            return Ok(PeerRingAction::None);
        }
        Ok(PeerRingAction::RemoteAction(
            successor,
            RemoteAction::Notify(self.node),
        ))
    }
}
