#![allow(missing_docs)]

use std::net::SocketAddr;
use std::net::SocketAddrV4;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection refused by {0}")]
    ConnectionRefused(SocketAddrV4),

    #[error("Address {0} already in use")]
    AddressInUse(SocketAddrV4),

    #[error("Only IPv4 endpoints are supported, got {0}")]
    UnsupportedAddress(SocketAddr),

    #[error("Listener on {0} is closed")]
    ListenerClosed(SocketAddrV4),
}
