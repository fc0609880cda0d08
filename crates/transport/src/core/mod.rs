//! The main concepts of this mod are:
//!
//! The [Connection](transport::Connection) type wraps a bidirectional byte stream
//! together with the IPv4 address of the remote end. Ring nodes frame their
//! messages on top of it.
//!
//! The [TransportInterface](transport::TransportInterface) trait should be
//! implemented for each way of reaching peers. It opens outbound connections and
//! binds listeners. See the [transport] module.
//!
//! The [ListenerInterface](transport::ListenerInterface) trait yields inbound
//! connections accepted on a bound port.

pub mod transport;
