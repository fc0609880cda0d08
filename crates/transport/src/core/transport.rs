use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::ReadBuf;

use crate::error::Result;

/// Any byte stream that can back a [Connection].
pub trait ConnectionStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ConnectionStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// A live connection with a remote peer.
///
/// Reading and writing go straight to the underlying stream, so the connection
/// can be handed to a codec. Dropping it closes the stream.
pub struct Connection {
    stream: Box<dyn ConnectionStream>,
    remote_addr: SocketAddrV4,
}

impl Connection {
    /// Wrap a stream connected to `remote_addr`.
    pub fn new<S>(stream: S, remote_addr: SocketAddrV4) -> Self
    where S: ConnectionStream {
        Self {
            stream: Box::new(stream),
            remote_addr,
        }
    }

    /// Address of the remote end as observed by this side.
    pub fn remote_addr(&self) -> SocketAddrV4 {
        self.remote_addr
    }

    /// IPv4 address of the remote end.
    pub fn remote_ip(&self) -> Ipv4Addr {
        *self.remote_addr.ip()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.stream).poll_shutdown(cx)
    }
}

/// A bound port delivering inbound connections.
#[async_trait]
pub trait ListenerInterface: Send {
    /// Wait for the next inbound connection.
    async fn accept(&mut self) -> Result<Connection>;

    /// The address this listener is bound to.
    fn local_addr(&self) -> SocketAddrV4;
}

/// Boxed listener returned by [TransportInterface::listen].
pub type BoxedListener = Box<dyn ListenerInterface>;

/// Ways of reaching other peers.
#[async_trait]
pub trait TransportInterface: Send + Sync {
    /// Bind a listener on `port`. Port 0 picks a free one.
    async fn listen(&self, port: u16) -> Result<BoxedListener>;

    /// Open an outbound connection to `addr`.
    async fn connect(&self, addr: SocketAddrV4) -> Result<Connection>;
}

/// Transport shared between a node and its background tasks.
pub type SharedTransport = Arc<dyn TransportInterface>;
