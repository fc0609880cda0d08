//! In-process network used by tests and simulations.
//!
//! A [MemoryNetwork] is a registry of listeners keyed by address. Every
//! [MemoryTransport] created from the same network can reach the others, and
//! connections are backed by [tokio::io::duplex] pipes.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::sync::atomic::AtomicU16;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::core::transport::BoxedListener;
use crate::core::transport::Connection;
use crate::core::transport::ListenerInterface;
use crate::core::transport::TransportInterface;
use crate::error::Error;
use crate::error::Result;

const PIPE_CAPACITY: usize = 64 * 1024;
const FIRST_EPHEMERAL_PORT: u16 = 40000;

#[derive(Default)]
struct Registry {
    listeners: DashMap<SocketAddrV4, mpsc::UnboundedSender<Connection>>,
    blackholes: Mutex<HashSet<SocketAddrV4>>,
    /// Server ends of connections swallowed by a blackhole, per address.
    parked: DashMap<SocketAddrV4, Vec<DuplexStream>>,
    next_port: AtomicU16,
}

impl Registry {
    fn ephemeral_port(&self) -> u16 {
        let span = u16::MAX - FIRST_EPHEMERAL_PORT;
        FIRST_EPHEMERAL_PORT + self.next_port.fetch_add(1, Ordering::Relaxed) % span
    }

    fn is_blackholed(&self, addr: &SocketAddrV4) -> bool {
        self.blackholes
            .lock()
            .map(|set| set.contains(addr))
            .unwrap_or(false)
    }
}

/// Shared in-memory network.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    registry: Arc<Registry>,
}

/// Transport bound to one IP of a [MemoryNetwork].
#[derive(Clone)]
pub struct MemoryTransport {
    ip: Ipv4Addr,
    registry: Arc<Registry>,
}

/// Listener on a [MemoryNetwork]. Dropping it frees the address.
pub struct MemoryListener {
    addr: SocketAddrV4,
    inbound: mpsc::UnboundedReceiver<Connection>,
    registry: Arc<Registry>,
}

impl MemoryNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose peers see it as `ip`.
    pub fn transport(&self, ip: Ipv4Addr) -> MemoryTransport {
        MemoryTransport {
            ip,
            registry: self.registry.clone(),
        }
    }

    /// Connections to `addr` will open but never get an answer.
    pub fn blackhole(&self, addr: SocketAddrV4) {
        if let Ok(mut set) = self.registry.blackholes.lock() {
            set.insert(addr);
        }
    }

    /// Undo [MemoryNetwork::blackhole]. Connections it swallowed are closed.
    pub fn restore(&self, addr: SocketAddrV4) {
        if let Ok(mut set) = self.registry.blackholes.lock() {
            set.remove(&addr);
        }
        self.registry.parked.remove(&addr);
    }

    /// Number of connections currently held open by the blackhole on `addr`.
    pub fn parked(&self, addr: &SocketAddrV4) -> usize {
        self.registry.parked.get(addr).map(|v| v.len()).unwrap_or(0)
    }

    /// Whether something is listening on `addr`.
    pub fn is_listening(&self, addr: &SocketAddrV4) -> bool {
        self.registry.listeners.contains_key(addr)
    }
}

#[async_trait]
impl TransportInterface for MemoryTransport {
    async fn listen(&self, port: u16) -> Result<BoxedListener> {
        let port = if port == 0 {
            self.registry.ephemeral_port()
        } else {
            port
        };
        let addr = SocketAddrV4::new(self.ip, port);
        let (tx, rx) = mpsc::unbounded_channel();
        match self.registry.listeners.entry(addr) {
            Entry::Occupied(_) => return Err(Error::AddressInUse(addr)),
            Entry::Vacant(v) => {
                v.insert(tx);
            }
        }
        tracing::debug!("memory listener bound on {}", addr);
        Ok(Box::new(MemoryListener {
            addr,
            inbound: rx,
            registry: self.registry.clone(),
        }))
    }

    async fn connect(&self, addr: SocketAddrV4) -> Result<Connection> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);

        if self.registry.is_blackholed(&addr) {
            tracing::debug!("connection to {} swallowed by blackhole", addr);
            self.registry.parked.entry(addr).or_default().push(server);
            return Ok(Connection::new(client, addr));
        }

        let sender = self
            .registry
            .listeners
            .get(&addr)
            .map(|s| s.value().clone())
            .ok_or(Error::ConnectionRefused(addr))?;

        let remote = SocketAddrV4::new(self.ip, self.registry.ephemeral_port());
        sender
            .send(Connection::new(server, remote))
            .map_err(|_| Error::ConnectionRefused(addr))?;
        Ok(Connection::new(client, addr))
    }
}

#[async_trait]
impl ListenerInterface for MemoryListener {
    async fn accept(&mut self) -> Result<Connection> {
        self.inbound
            .recv()
            .await
            .ok_or(Error::ListenerClosed(self.addr))
    }

    fn local_addr(&self) -> SocketAddrV4 {
        self.addr
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.registry.listeners.remove(&self.addr);
    }
}
