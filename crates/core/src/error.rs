//! Error of chordring_core

use crate::dht::PeerRingAction;
use crate::dht::RingId;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chordring-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] chordring_transport::error::Error),

    #[error("Unknown message type {0:#04x}")]
    UnknownMessageType(u8),

    #[error("Malformed message header: {0}")]
    MalformedHeader(String),

    #[error("Malformed message body: {0}")]
    MalformedBody(String),

    #[error("Message has {0} bytes which is larger than {1}")]
    MessageTooLarge(u32, u32),

    #[error("Connection closed before a reply arrived")]
    ConnectionClosed,

    #[error("Remote call timed out")]
    RpcTimeout,

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error("No successor found for {0}")]
    SuccessorNotFound(RingId),

    #[error("Lookup for {0} ran out of hops")]
    HopLimitExceeded(RingId),

    #[error("Failed to join ring: {0}")]
    JoinFailed(String),

    #[error("Operation not allowed in node state {0}")]
    InvalidState(String),

    #[error("Id {0} is already taken on the ring")]
    DuplicateId(RingId),

    #[error("Invalid PeerRingAction")]
    PeerRingInvalidAction,

    #[error("Unexpected PeerRingAction, {0:?}")]
    PeerRingUnexpectedAction(PeerRingAction),

    #[error("Failed to get dht from a sync lock")]
    DHTSyncLockError,

    #[error("Failed to read successors")]
    FailedToReadSuccessors,

    #[error("Failed to write successors")]
    FailedToWriteSuccessors,

    #[error("Failed to lock node state")]
    StateSyncLockError,

    #[error("Failed to lock app message handler")]
    CallbackSyncLockError,

    #[error("App message handler failed: {0}")]
    AppHandler(String),
}
