use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::SocketAddrV4;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

use crate::core::transport::BoxedListener;
use crate::core::transport::Connection;
use crate::core::transport::ListenerInterface;
use crate::core::transport::TransportInterface;
use crate::error::Error;
use crate::error::Result;

/// Plain TCP transport backed by tokio.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    bind_ip: Ipv4Addr,
}

/// Listener created by [TcpTransport].
pub struct TcpListenerHandle {
    listener: TcpListener,
    local_addr: SocketAddrV4,
}

impl TcpTransport {
    /// Create a transport whose listeners bind on `bind_ip`.
    pub fn new(bind_ip: Ipv4Addr) -> Self {
        Self { bind_ip }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED)
    }
}

fn v4(addr: SocketAddr) -> Result<SocketAddrV4> {
    match addr {
        SocketAddr::V4(a) => Ok(a),
        other => Err(Error::UnsupportedAddress(other)),
    }
}

#[async_trait]
impl TransportInterface for TcpTransport {
    async fn listen(&self, port: u16) -> Result<BoxedListener> {
        let listener = TcpListener::bind(SocketAddrV4::new(self.bind_ip, port)).await?;
        let local_addr = v4(listener.local_addr()?)?;
        tracing::info!("tcp listener bound on {}", local_addr);
        Ok(Box::new(TcpListenerHandle {
            listener,
            local_addr,
        }))
    }

    async fn connect(&self, addr: SocketAddrV4) -> Result<Connection> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                Error::ConnectionRefused(addr)
            } else {
                Error::Io(e)
            }
        })?;
        stream.set_nodelay(true)?;
        Ok(Connection::new(stream, addr))
    }
}

#[async_trait]
impl ListenerInterface for TcpListenerHandle {
    async fn accept(&mut self) -> Result<Connection> {
        let (stream, remote) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        let remote = v4(remote)?;
        tracing::debug!("accepted tcp connection from {}", remote);
        Ok(Connection::new(stream, remote))
    }

    fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }
}
