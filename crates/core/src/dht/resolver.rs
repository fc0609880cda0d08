//! Multi-hop successor lookup.

use std::sync::Arc;

use super::chord::PeerRing;
use super::chord::PeerRingAction;
use super::chord::RemoteAction;
use super::id::RingId;
use super::types::Chord;
use super::types::NodeInfo;
use crate::consts::LOOKUP_ATTEMPTS;
use crate::error::Error;
use crate::error::Result;
use crate::node::NodeState;
use crate::node::SharedNodeState;
use crate::rpc::RingClient;

/// Answers "who owns this id", forwarding to closer nodes when the local view
/// is not enough. Each forward is a fresh request carrying a decremented ttl,
/// so a corrupted ring cannot make a lookup bounce forever.
///
/// A node that has not created or joined a ring owns nothing: every lookup
/// it is asked for ends in [Error::SuccessorNotFound].
#[derive(Clone)]
pub struct SuccessorResolver {
    ring: Arc<PeerRing>,
    client: RingClient,
    state: SharedNodeState,
    max_hops: u8,
}

impl SuccessorResolver {
    /// Create a resolver for `ring`.
    pub fn new(
        ring: Arc<PeerRing>,
        client: RingClient,
        state: SharedNodeState,
        max_hops: u8,
    ) -> Self {
        Self {
            ring,
            client,
            state,
            max_hops,
        }
    }

    fn ensure_joined(&self, id: RingId) -> Result<()> {
        let state = *self.state.lock().map_err(|_| Error::StateSyncLockError)?;
        if state != NodeState::Joined {
            tracing::debug!("refused lookup of {} in state {}", id, state);
            return Err(Error::SuccessorNotFound(id));
        }
        Ok(())
    }

    /// Find the owner of `id` with the full hop budget.
    pub async fn find_successor(&self, id: RingId) -> Result<NodeInfo> {
        self.find_successor_with_ttl(id, self.max_hops).await
    }

    /// Find the owner of `id`, forwarding at most `ttl` more times.
    ///
    /// A finger that fails to answer is dropped. When it refused or broke the
    /// connection the decision is taken again. When it timed out the lookup
    /// fails, since the caller's deadline is about to expire as well. A failing
    /// immediate successor is left to the liveness checks.
    pub async fn find_successor_with_ttl(&self, id: RingId, ttl: u8) -> Result<NodeInfo> {
        self.ensure_joined(id)?;
        let mut last_err = None;
        for attempt in 0..LOOKUP_ATTEMPTS {
            let (next, target) = match self.ring.find_successor(id)? {
                PeerRingAction::Some(node) => return Ok(node),
                PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessor(target)) => {
                    (next, target)
                }
                act => return Err(Error::PeerRingUnexpectedAction(act)),
            };

            if ttl == 0 {
                tracing::warn!("lookup of {} ran out of hops at {}", id, self.ring.id());
                return Err(Error::HopLimitExceeded(id));
            }

            match self.client.find_successor(next.addr(), target, ttl - 1).await {
                Ok(Some(node)) => return Ok(node),
                Ok(None) => return Err(Error::SuccessorNotFound(id)),
                Err(e) => {
                    tracing::warn!(
                        "lookup of {} via {} failed on attempt {}: {}",
                        id,
                        next,
                        attempt + 1,
                        e
                    );
                    if next.id == self.ring.successor()?.id {
                        return Err(e);
                    }
                    self.ring.lock_finger()?.remove(next.id);
                    if matches!(e, Error::RpcTimeout) {
                        return Err(e);
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(Error::SuccessorNotFound(id)))
    }
}
