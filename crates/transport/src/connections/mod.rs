//! Default using `TcpTransport` for native environment.
//! Also provide a `MemoryNetwork` for testing.

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "tcp")]
mod tcp;

#[cfg(feature = "memory")]
pub use crate::connections::memory::MemoryListener;
#[cfg(feature = "memory")]
pub use crate::connections::memory::MemoryNetwork;
#[cfg(feature = "memory")]
pub use crate::connections::memory::MemoryTransport;
#[cfg(feature = "tcp")]
pub use crate::connections::tcp::TcpListenerHandle;
#[cfg(feature = "tcp")]
pub use crate::connections::tcp::TcpTransport;
