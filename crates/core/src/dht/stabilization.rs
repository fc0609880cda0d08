//! Stabilization run daemons to maintain dht.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures_timer::Delay;

use super::chord::PeerRing;
use super::chord::PeerRingAction;
use super::chord::RemoteAction;
use super::id::RingId;
use super::resolver::SuccessorResolver;
use super::types::Chord;
use super::types::NodeInfo;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;
use crate::rpc::RingClient;

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    dht: Arc<PeerRing>,
    client: RingClient,
    resolver: SuccessorResolver,
    successor_list_len: usize,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(
        dht: Arc<PeerRing>,
        client: RingClient,
        resolver: SuccessorResolver,
        successor_list_len: u8,
    ) -> Self {
        Self {
            dht,
            client,
            resolver,
            successor_list_len: successor_list_len.max(1) as usize,
        }
    }

    /// Run stabilization once.
    ///
    /// Ask the successor for its predecessor, adopt it when it is closer, notify
    /// the successor, then refresh the successor list by walking the ring.
    pub async fn stabilize(&self) -> Result<()> {
        tracing::debug!("STABILIZATION stabilize start");
        let successor = self.dht.successor()?;

        let reported = if successor.id == self.dht.id() {
            // Alone: our own predecessor is what the successor would report.
            self.dht.predecessor()?
        } else {
            match self
                .client
                .query_predecessor(successor.addr(), self.dht.id())
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("[stabilize] successor {} unreachable: {}", successor, e);
                    self.dht.remove(&successor)?;
                    return Ok(());
                }
            }
        };

        match self.dht.stabilize(reported)? {
            PeerRingAction::None => {}
            PeerRingAction::RemoteAction(target, RemoteAction::Notify(me)) => {
                match self.client.notify(target.addr(), me).await {
                    Ok(accepted) => {
                        tracing::debug!("STABILIZATION notified {}, accepted: {}", target, accepted)
                    }
                    Err(e) => tracing::warn!("[stabilize] failed to notify {}: {}", target, e),
                }
            }
            act => return Err(Error::PeerRingUnexpectedAction(act)),
        }

        if let Err(e) = self.sync_successors().await {
            tracing::error!("[stabilize] failed to sync successor list {:?}", e);
        }
        tracing::debug!("STABILIZATION stabilize end");
        Ok(())
    }

    /// Walk the ring from the successor and rebuild the successor list.
    /// Each step asks the last node found for the owner of its id + 1, which it
    /// answers without forwarding.
    pub async fn sync_successors(&self) -> Result<()> {
        let mut current = self.dht.successor()?;
        if current.id == self.dht.id() {
            return Ok(());
        }
        let mut walked: Vec<NodeInfo> = vec![current];

        while walked.len() < self.successor_list_len {
            let next_id = RingId::new(current.id.value().wrapping_add(1));
            match self.client.find_successor(current.addr(), next_id, 0).await {
                Ok(Some(next))
                    if next.id != self.dht.id() && !walked.iter().any(|n| n.id == next.id) =>
                {
                    walked.push(next);
                    current = next;
                }
                Ok(_) => break,
                Err(e) => {
                    tracing::debug!("successor walk stopped at {}: {}", current, e);
                    break;
                }
            }
        }

        tracing::debug!("STABILIZATION successor walk: {:?}", walked);
        self.dht.sync_successors(&walked)
    }

    /// Recompute every finger slot.
    pub async fn fix_fingers(&self) -> Result<()> {
        tracing::debug!("STABILIZATION fix_fingers start");
        let starts = self.dht.finger_starts();
        let jobs = starts.iter().enumerate().map(|(k, start)| async move {
            (k, *start, self.resolver.find_successor(*start).await)
        });

        for (k, start, res) in join_all(jobs).await {
            match res {
                Ok(node) => self.dht.set_finger(k, Some(node))?,
                Err(e) => tracing::debug!("fix finger {} ({}) failed: {}", k, start, e),
            }
        }
        tracing::debug!("STABILIZATION fix_fingers end");
        Ok(())
    }

    /// Ping the predecessor and forget it when it does not answer.
    pub async fn check_predecessor(&self) -> Result<()> {
        let predecessor = match self.dht.predecessor()? {
            Some(p) if p.id != self.dht.id() => p,
            _ => return Ok(()),
        };
        if !self.client.check_alive(predecessor.addr()).await {
            tracing::info!("predecessor {} is not responding", predecessor);
            self.dht.clear_predecessor_if(&predecessor)?;
        }
        Ok(())
    }

    /// Ping every entry of the successor list and drop the silent ones.
    pub async fn check_successors(&self) -> Result<()> {
        let successors = self.dht.successors().list()?;
        let checks = successors
            .iter()
            .map(|s| async move { (*s, self.client.check_alive(s.addr()).await) });

        for (s, alive) in join_all(checks).await {
            if !alive {
                tracing::info!("successor {} is not responding", s);
                self.dht.remove(&s)?;
            }
        }
        Ok(())
    }

    /// Run stabilize rounds in a loop.
    pub async fn wait(self: Arc<Self>, interval: Duration) {
        let this = &*self;
        run_every(interval, "stabilize", move || this.stabilize()).await
    }

    /// Run fix fingers rounds in a loop.
    pub async fn wait_fix_fingers(self: Arc<Self>, interval: Duration) {
        let this = &*self;
        run_every(interval, "fix fingers", move || this.fix_fingers()).await
    }

    /// Run predecessor and successor checks in a loop.
    pub async fn wait_check(self: Arc<Self>, interval: Duration) {
        let this = &*self;
        run_every(interval, "check neighbours", move || async move {
            this.check_predecessor().await?;
            this.check_successors().await
        })
        .await
    }
}

async fn run_every<F, Fut>(interval: Duration, name: &str, round: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        Delay::new(interval).await;
        round()
            .await
            .unwrap_or_else(|e| tracing::error!("failed to {} {:?}", name, e));
    }
}
