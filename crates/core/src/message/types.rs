#![warn(missing_docs)]
//! This module defines the messages exchanged between ring nodes.
//! They follow the Ping/Pong pattern, each xxxSend is answered by its xxxReport
//! on the same connection.

use bytes::Bytes;

use crate::dht::NodeInfo;
use crate::dht::RingId;
use crate::error::Error;
use crate::error::Result;

/// One byte tag leading every frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `S`
    FindSuccessorSend,
    /// `s`
    FindSuccessorReport,
    /// `P`
    QueryPredecessorSend,
    /// `p`
    QueryPredecessorReport,
    /// `A`
    AliveCheckSend,
    /// `a`
    AliveCheckReport,
    /// `N`
    NotifyPredecessorSend,
    /// `n`
    NotifyPredecessorReport,
    /// `M`
    CustomMessage,
    /// `0`
    Unknown,
}

impl MessageType {
    /// Wire tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::FindSuccessorSend => b'S',
            Self::FindSuccessorReport => b's',
            Self::QueryPredecessorSend => b'P',
            Self::QueryPredecessorReport => b'p',
            Self::AliveCheckSend => b'A',
            Self::AliveCheckReport => b'a',
            Self::NotifyPredecessorSend => b'N',
            Self::NotifyPredecessorReport => b'n',
            Self::CustomMessage => b'M',
            Self::Unknown => b'0',
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        Ok(match tag {
            b'S' => Self::FindSuccessorSend,
            b's' => Self::FindSuccessorReport,
            b'P' => Self::QueryPredecessorSend,
            b'p' => Self::QueryPredecessorReport,
            b'A' => Self::AliveCheckSend,
            b'a' => Self::AliveCheckReport,
            b'N' => Self::NotifyPredecessorSend,
            b'n' => Self::NotifyPredecessorReport,
            b'M' => Self::CustomMessage,
            b'0' => Self::Unknown,
            other => return Err(Error::UnknownMessageType(other)),
        })
    }
}

/// Frame header: type tag and body length.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// Kind of the body.
    pub message_type: MessageType,
    /// Body length in bytes.
    pub length: u32,
}

/// MessageType use to find successor in a chord ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FindSuccessorSend {
    /// id whose owner is wanted
    pub id: RingId,
    /// hops left before the lookup gives up
    pub ttl: u8,
}

/// Answer to [FindSuccessorSend]. `None` means the lookup failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FindSuccessorReport {
    /// The owner of the id.
    pub node: Option<NodeInfo>,
}

/// Ask a node for its predecessor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueryPredecessorSend {
    /// Id of the requester.
    pub id: RingId,
}

/// Answer to [QueryPredecessorSend]. `None` is a valid "no predecessor".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueryPredecessorReport {
    /// The predecessor.
    pub node: Option<NodeInfo>,
}

/// Liveness probe.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AliveCheckSend;

/// Answer to [AliveCheckSend].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AliveCheckReport {
    /// Whether the node considers itself alive.
    pub alive: bool,
}

/// MessageType use notify the successor about the predecessor inferred by current node.
/// The receiver takes the IP from the connection, not from the message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NotifyPredecessorSend {
    /// Id of the notifying node.
    pub id: RingId,
    /// Listening port of the notifying node.
    pub port: u16,
}

/// Answer to [NotifyPredecessorSend].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NotifyPredecessorReport {
    /// Whether the notifier is the predecessor now.
    pub accepted: bool,
}

/// Opaque application payload.
#[derive(Clone, PartialEq, Eq)]
pub struct CustomMessage(pub Bytes);

/// Decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// Remote message of find successor
    FindSuccessorSend(FindSuccessorSend),
    /// Response of FindSuccessorSend
    FindSuccessorReport(FindSuccessorReport),
    /// Remote message of query predecessor
    QueryPredecessorSend(QueryPredecessorSend),
    /// Response of QueryPredecessorSend
    QueryPredecessorReport(QueryPredecessorReport),
    /// Remote message of liveness check
    AliveCheckSend(AliveCheckSend),
    /// Response of AliveCheckSend
    AliveCheckReport(AliveCheckReport),
    /// Remote message of notify a predecessor
    NotifyPredecessorSend(NotifyPredecessorSend),
    /// Response of NotifyPredecessorSend
    NotifyPredecessorReport(NotifyPredecessorReport),
    /// Custom messages
    CustomMessage(CustomMessage),
    /// Frame tagged `0`. Never answered.
    Unknown(Bytes),
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Message {
    /// Wrap a data of message into CustomMessage.
    pub fn custom(msg: impl Into<Bytes>) -> Message {
        Message::CustomMessage(CustomMessage(msg.into()))
    }

    /// Tag this message is framed with.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::FindSuccessorSend(_) => MessageType::FindSuccessorSend,
            Self::FindSuccessorReport(_) => MessageType::FindSuccessorReport,
            Self::QueryPredecessorSend(_) => MessageType::QueryPredecessorSend,
            Self::QueryPredecessorReport(_) => MessageType::QueryPredecessorReport,
            Self::AliveCheckSend(_) => MessageType::AliveCheckSend,
            Self::AliveCheckReport(_) => MessageType::AliveCheckReport,
            Self::NotifyPredecessorSend(_) => MessageType::NotifyPredecessorSend,
            Self::NotifyPredecessorReport(_) => MessageType::NotifyPredecessorReport,
            Self::CustomMessage(_) => MessageType::CustomMessage,
            Self::Unknown(_) => MessageType::Unknown,
        }
    }
}

impl std::fmt::Debug for CustomMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomMessage")
            .field("size", &self.0.len())
            .finish()
    }
}
