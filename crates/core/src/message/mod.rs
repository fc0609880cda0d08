//! Message and MessageHandler
use chordring_transport::core::transport::Connection;
use tokio_util::codec::Framed;

mod codec;
pub use codec::MessageCodec;

pub mod types;
pub use types::*;

pub mod handlers;
pub use handlers::HandleMsg;
pub use handlers::MessageHandler;

/// A connection speaking framed [Message]s.
pub type MessageStream = Framed<Connection, MessageCodec>;
