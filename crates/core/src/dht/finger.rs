#![warn(missing_docs)]
use std::ops::Index;

use serde::Deserialize;
use serde::Serialize;

use super::id::Interval;
use super::id::RingId;
use super::types::NodeInfo;
use crate::consts::ID_BITS;

/// Finger table of Chord DHT.
/// Slot `k` approximates the successor of `owner + 2^k`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerTable {
    owner: NodeInfo,
    size: usize,
    finger: Vec<Option<NodeInfo>>,
}

impl FingerTable {
    /// builder
    pub fn new(owner: NodeInfo, size: usize) -> Self {
        Self {
            owner,
            size,
            finger: vec![None; size],
        }
    }

    /// A full table, one slot per identifier bit.
    pub fn for_ring(owner: NodeInfo) -> Self {
        Self::new(owner, ID_BITS)
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get first element from Finger Table
    pub fn first(&self) -> Option<NodeInfo> {
        self.finger.iter().flatten().next().copied()
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<NodeInfo> {
        self.finger.get(index).copied().flatten()
    }

    /// setter. Storing the owner itself clears the slot.
    pub fn set(&mut self, index: usize, node: Option<NodeInfo>) {
        if index >= self.finger.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        let node = node.filter(|n| n.id != self.owner.id);
        tracing::debug!("set finger table index: {} node: {:?}", index, node);
        self.finger[index] = node;
    }

    /// Remove a node from the finger table.
    /// The run of slots holding it takes the value of the slot right after the run.
    pub fn remove(&mut self, id: RingId) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.map(|n| n.id) == Some(id))
            .map(|(i, _)| i)
            .collect();

        if let (Some(&first_idx), Some(&last_idx)) = (indexes.first(), indexes.last()) {
            // Update to the entry following the last matching slot.
            // If there is none, use None.
            let fix = self.finger.get(last_idx + 1).copied().flatten();
            for slot in &mut self.finger[first_idx..=last_idx] {
                if slot.map(|n| n.id) == Some(id) {
                    *slot = fix;
                }
            }
        }
    }

    /// Fill every slot `node` is a better candidate for.
    pub fn join(&mut self, node: NodeInfo) {
        if node.id == self.owner.id {
            return;
        }
        let dist = self.owner.id.distance_to(node.id);

        for k in 0..self.size {
            if dist < (1u32 << k) {
                continue;
            }

            if let Some(v) = self.finger[k] {
                if self.owner.id.distance_to(v.id) <= dist {
                    continue;
                }
            }

            self.finger[k] = Some(node);
        }
    }

    /// Check finger is contains some node
    pub fn contains(&self, id: RingId) -> bool {
        self.finger.iter().flatten().any(|n| n.id == id)
    }

    /// Highest finger strictly inside `(owner, target)`.
    pub fn closest_preceding_node(&self, target: RingId) -> Option<NodeInfo> {
        self.finger
            .iter()
            .rev()
            .flatten()
            .find(|n| n.id.in_range(self.owner.id, target, Interval::Open) && n.id != target)
            .copied()
    }

    /// get length of finger
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// get finger list
    pub fn list(&self) -> &Vec<Option<NodeInfo>> {
        &self.finger
    }

    #[cfg(test)]
    pub fn reset_finger(&mut self) {
        self.finger = vec![None; self.size]
    }
}

impl Index<usize> for FingerTable {
    type Output = Option<NodeInfo>;
    fn index(&self, index: usize) -> &Self::Output {
        self.finger.get(index).unwrap_or(&None)
    }
}
