//! DHT types about `NodeInfo` and `PeerRing`.
#![warn(missing_docs)]
use std::fmt;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;

use serde::Deserialize;
use serde::Serialize;

use super::id::RingId;
use crate::error::Error;
use crate::error::Result;

/// A peer's ring identity and the address it can be reached at.
///
/// Ring position logic only looks at `id`. Equality compares the full
/// triple, which is what "is this me" checks need.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Position on the ring.
    pub id: RingId,
    /// IPv4 address the node listens on.
    pub ip: Ipv4Addr,
    /// Port the node listens on.
    pub port: u16,
}

impl NodeInfo {
    /// Encoded size: `id(4) | ip(4) | port(2)`.
    pub const WIRE_LEN: usize = 10;

    /// Create a new NodeInfo.
    pub fn new(id: RingId, ip: Ipv4Addr, port: u16) -> Self {
        Self { id, ip, port }
    }

    /// Socket address of the node.
    pub fn addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }

    /// Big-endian `id | ip | port`.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0..4].copy_from_slice(&self.id.to_be_bytes());
        buf[4..8].copy_from_slice(&self.ip.octets());
        buf[8..10].copy_from_slice(&self.port.to_be_bytes());
        buf
    }

    /// Inverse of [NodeInfo::to_bytes]. The slice must be exactly
    /// [NodeInfo::WIRE_LEN] bytes.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != Self::WIRE_LEN {
            return Err(Error::MalformedBody(format!(
                "node info needs {} bytes, got {}",
                Self::WIRE_LEN,
                buf.len()
            )));
        }
        Ok(Self {
            id: RingId::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            ip: Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]),
            port: u16::from_be_bytes([buf[8], buf[9]]),
        })
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.addr())
    }
}

/// Snapshot of what a node knows about its neighbourhood.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct TopoInfo {
    /// The node itself.
    pub node: NodeInfo,
    /// Successor list, closest first.
    pub successors: Vec<NodeInfo>,
    /// Predecessor
    pub predecessor: Option<NodeInfo>,
    /// Finger table slots.
    pub fingers: Vec<Option<NodeInfo>>,
}

/// Chord is a distributed hash table (DHT) algorithm that places nodes on a
/// ring of identifiers. You may want to browse its
/// [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) before you read this.
///
/// Each node is responsible for the arc between its predecessor (exclusive) and
/// itself (inclusive). `find_successor` answers which node owns an id, possibly by
/// asking the caller to forward the question to a closer node.
///
/// Methods return an `Action` which tells the outer layer what to do after the
/// local state has been updated. The struct only decides, the caller does the
/// networking.
pub trait Chord<Action> {
    /// Adopt `node` as a successor candidate, usually after a join lookup.
    fn join(&self, node: NodeInfo) -> Result<Action>;

    /// Ask DHT for the successor of id.
    /// May return a remote action when the answer is known by another node.
    fn find_successor(&self, id: RingId) -> Result<Action>;

    /// A node claims to be our predecessor. Returns whether it was accepted.
    fn notify(&self, candidate: NodeInfo) -> Result<bool>;

    /// Digest what the successor reported as its predecessor and decide whom
    /// to notify.
    fn stabilize(&self, reported: Option<NodeInfo>) -> Result<Action>;
}
