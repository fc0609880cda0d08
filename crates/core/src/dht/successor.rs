//! Successor for PeerRing
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use super::types::NodeInfo;
use crate::error::Error;
use crate::error::Result;

/// A sequence of successors for a node on the ring.
/// It's necessary to have multiple successors to prevent a single point of failure.
/// Note the successors are in order of a clockwise distance from the node.
#[derive(Debug, Clone)]
pub struct SuccessorSeq {
    /// The node owning this sequence.
    owner: NodeInfo,
    /// Max successor num
    max: u8,
    /// Successors
    successors: Arc<RwLock<Vec<NodeInfo>>>,
}

/// Read access to a [SuccessorSeq].
pub trait SuccessorReader {
    /// Whether no successor is known.
    fn is_empty(&self) -> Result<bool>;
    /// Whether the sequence reached its bound.
    fn is_full(&self) -> Result<bool>;
    /// Successor at `index`, if any.
    fn get(&self, index: usize) -> Result<Option<NodeInfo>>;
    /// Number of known successors.
    fn len(&self) -> Result<usize>;
    /// The authoritative successor. The owner itself when empty.
    fn min(&self) -> Result<NodeInfo>;
    /// The farthest known successor. The owner itself when empty.
    fn max(&self) -> Result<NodeInfo>;
    /// Copy of the sequence.
    fn list(&self) -> Result<Vec<NodeInfo>>;
    /// Whether a node with this id is in the sequence.
    fn contains(&self, node: &NodeInfo) -> Result<bool>;
}

/// Write access to a [SuccessorSeq].
pub trait SuccessorWriter {
    /// Insert a successor keeping the order. Returns it when it made the cut.
    fn update(&self, successor: NodeInfo) -> Result<Option<NodeInfo>>;
    /// [SuccessorWriter::update] for each entry. Returns the ones that made the cut.
    fn extend(&self, succ_list: &[NodeInfo]) -> Result<Vec<NodeInfo>>;
    /// Drop a node from the sequence.
    fn remove(&self, node: &NodeInfo) -> Result<()>;
    /// Replace the whole sequence.
    fn replace(&self, succ_list: &[NodeInfo]) -> Result<()>;
}

impl SuccessorSeq {
    /// Create an empty sequence bounded by `max`.
    pub fn new(owner: NodeInfo, max: u8) -> Self {
        Self {
            owner,
            max: max.max(1),
            successors: Arc::new(RwLock::new(vec![])),
        }
    }

    /// Lock and return the sequence for reading.
    pub fn successors(&self) -> Result<RwLockReadGuard<Vec<NodeInfo>>> {
        self.successors
            .read()
            .map_err(|_| Error::FailedToReadSuccessors)
    }

    fn distance(&self, node: &NodeInfo) -> u32 {
        self.owner.id.distance_to(node.id)
    }

    fn normalize(&self, succs: &mut Vec<NodeInfo>) {
        succs.retain(|n| n.id != self.owner.id);
        succs.sort_by_key(|n| self.owner.id.distance_to(n.id));
        succs.dedup_by_key(|n| n.id);
        succs.truncate(self.max.into());
    }
}

impl SuccessorReader for SuccessorSeq {
    fn contains(&self, node: &NodeInfo) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.iter().any(|n| n.id == node.id))
    }

    fn is_empty(&self) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.is_empty())
    }

    fn is_full(&self) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.len() >= self.max as usize)
    }

    fn get(&self, index: usize) -> Result<Option<NodeInfo>> {
        let succs = self.successors()?;
        Ok(succs.get(index).copied())
    }

    fn len(&self) -> Result<usize> {
        let succs = self.successors()?;
        Ok(succs.len())
    }

    fn min(&self) -> Result<NodeInfo> {
        let succs = self.successors()?;
        Ok(succs.first().copied().unwrap_or(self.owner))
    }

    fn max(&self) -> Result<NodeInfo> {
        let succs = self.successors()?;
        Ok(succs.last().copied().unwrap_or(self.owner))
    }

    fn list(&self) -> Result<Vec<NodeInfo>> {
        let succs = self.successors()?;
        Ok(succs.clone())
    }
}

impl SuccessorWriter for SuccessorSeq {
    fn update(&self, successor: NodeInfo) -> Result<Option<NodeInfo>> {
        // if successor in successor list
        // or successor is self
        // or list is full and successor is farther than successor.max()
        if self.contains(&successor)? || successor.id == self.owner.id {
            return Ok(None);
        }

        if self.is_full()? && self.distance(&successor) >= self.distance(&self.max()?) {
            return Ok(None);
        }

        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;

        succs.push(successor);
        self.normalize(&mut succs);
        if succs.contains(&successor) {
            Ok(Some(successor))
        } else {
            Ok(None)
        }
    }

    fn extend(&self, succ_list: &[NodeInfo]) -> Result<Vec<NodeInfo>> {
        let mut ret = vec![];
        for s in succ_list {
            if let Some(r) = self.update(*s)? {
                ret.push(r);
            }
        }
        Ok(ret)
    }

    fn remove(&self, node: &NodeInfo) -> Result<()> {
        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;
        succs.retain(|v| v.id != node.id);
        Ok(())
    }

    fn replace(&self, succ_list: &[NodeInfo]) -> Result<()> {
        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;
        *succs = succ_list.to_vec();
        self.normalize(&mut succs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::dht::RingId;

    fn nodes(ids: &[u32]) -> Vec<NodeInfo> {
        ids.iter()
            .map(|&id| NodeInfo::new(RingId::new(id), Ipv4Addr::LOCALHOST, 1000))
            .collect()
    }

    #[test]
    fn test_successor_update() {
        let n = nodes(&[0, 10, 20, 30, 40, 50]);

        let succ = SuccessorSeq::new(n[0], 3);
        assert!(succ.is_empty().unwrap());
        assert_eq!(succ.min().unwrap(), n[0]);

        succ.update(n[2]).unwrap();
        assert_eq!(succ.list().unwrap(), n[2..3]);

        succ.update(n[3]).unwrap();
        assert_eq!(succ.list().unwrap(), n[2..4]);

        succ.update(n[4]).unwrap();
        assert_eq!(succ.list().unwrap(), n[2..5]);

        assert_eq!(succ.update(n[5]).unwrap(), None);
        assert_eq!(succ.list().unwrap(), n[2..5]);

        assert_eq!(succ.update(n[1]).unwrap(), Some(n[1]));
        assert_eq!(succ.list().unwrap(), n[1..4]);

        assert_eq!(succ.update(n[0]).unwrap(), None);
        assert_eq!(succ.update(n[1]).unwrap(), None);
    }

    #[test]
    fn test_successor_order_wraps() {
        let n = nodes(&[0xFFFF_0000, 5, 0xFFFF_FFFF, 0x8000_0000]);
        let succ = SuccessorSeq::new(n[0], 3);
        succ.extend(&n[1..]).unwrap();
        assert_eq!(succ.list().unwrap(), vec![n[2], n[1], n[3]]);
    }

    #[test]
    fn test_successor_remove_and_replace() -> Result<()> {
        let n = nodes(&[0, 10, 20, 30, 40]);

        let succ = SuccessorSeq::new(n[0], 3);
        succ.extend(&n[1..4])?;
        assert_eq!(succ.list()?, n[1..4]);

        succ.remove(&n[2])?;
        assert_eq!(succ.list()?, vec![n[1], n[3]]);

        succ.replace(&[n[4], n[0], n[3], n[4]])?;
        assert_eq!(succ.list()?, vec![n[3], n[4]]);
        assert_eq!(succ.max()?, n[4]);

        succ.replace(&[])?;
        assert_eq!(succ.min()?, n[0]);
        Ok(())
    }
}
