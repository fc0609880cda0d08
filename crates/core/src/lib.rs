//! Chord ring membership engine.
//!
//! # Ring
//!
//! Nodes and keys share a 32-bit identifier space treated as a ring modulo
//! 2^32. The node owning an identifier is its successor: the first node met
//! walking clockwise from it. See [dht::RingId] and [dht::PeerRing].
//!
//! # Stabilization
//!
//! Membership is repaired continuously. Each node periodically asks its
//! successor for its predecessor, notifies the successor about itself,
//! refreshes the finger table and pings its predecessor and successors.
//! See [dht::Stabilizer].
//!
//! # Wire protocol
//!
//! Every request opens a fresh connection and carries one framed message,
//! see [message::MessageCodec]. Inbound connections are dispatched by
//! [message::MessageHandler].
//!
//! # Node
//!
//! [node::RingNode] wires the ring state, the transport and the background
//! tasks together and is the entry point for applications.
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod consts;
pub mod dht;
pub mod error;
pub mod message;
pub mod node;
pub mod rpc;

pub use chordring_transport as transport;

#[cfg(test)]
mod tests;
