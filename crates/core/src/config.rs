//! Tunables of a ring node.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use crate::consts::DEFAULT_HOP_TIMEOUT_MARGIN_MS;
use crate::consts::DEFAULT_MAX_HOPS;
use crate::consts::DEFAULT_MAX_MESSAGE_LEN;
use crate::consts::DEFAULT_RPC_TIMEOUT_MS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::consts::DEFAULT_SUCCESSOR_LIST_LEN;

/// Timeouts and sizes used by a [RingNode](crate::node::RingNode).
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Bound of the successor list.
    pub successor_list_len: u8,
    /// Period of stabilize and fix fingers rounds.
    pub stabilize_interval_ms: u64,
    /// Period of predecessor and successor liveness checks.
    pub check_predecessor_interval_ms: u64,
    /// Bound on one outbound request, connect included.
    pub rpc_timeout_ms: u64,
    /// Added to `rpc_timeout_ms` for every hop a forwarded lookup may still
    /// take, so a node down the chain always gives up before its caller.
    pub hop_timeout_margin_ms: u64,
    /// Hop budget of a successor lookup.
    pub max_hops: u8,
    /// Largest body accepted from the wire.
    pub max_message_len: u32,
    /// Address advertised to peers when the listener is bound to 0.0.0.0.
    pub external_ip: Option<Ipv4Addr>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            successor_list_len: DEFAULT_SUCCESSOR_LIST_LEN,
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            check_predecessor_interval_ms: DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            hop_timeout_margin_ms: DEFAULT_HOP_TIMEOUT_MARGIN_MS,
            max_hops: DEFAULT_MAX_HOPS,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            external_ip: None,
        }
    }
}

impl RingConfig {
    /// Period of stabilize rounds.
    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_millis(self.stabilize_interval_ms)
    }

    /// Period of liveness checks.
    pub fn check_predecessor_interval(&self) -> Duration {
        Duration::from_millis(self.check_predecessor_interval_ms)
    }

    /// Bound on one outbound request.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Extra time granted per remaining hop of a lookup.
    pub fn hop_timeout_margin(&self) -> Duration {
        Duration::from_millis(self.hop_timeout_margin_ms)
    }
}
