//! Operator console: prints what arrives, routes what is typed.
use async_trait::async_trait;
use chordring_core::dht::RingId;
use chordring_core::node::AppMessage;
use chordring_core::node::AppMessageHandler;

use crate::error::Error;
use crate::error::Result;

/// Prints every application message to stdout.
pub struct PrintHandler;

#[async_trait]
impl AppMessageHandler for PrintHandler {
    async fn on_message(
        &self,
        msg: AppMessage,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!(
            "received from {}:\n{}",
            msg.from,
            String::from_utf8_lossy(&msg.payload)
        );
        Ok(())
    }
}

/// A line typed by the operator: `<name> <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub name: String,
    pub target: RingId,
    pub text: String,
}

/// Split a console line into the destination name and the message.
/// The destination is the owner of the hashed name.
pub fn parse_line(line: &str) -> Result<Outgoing> {
    let line = line.trim();
    let Some((name, text)) = line.split_once(char::is_whitespace) else {
        return Err(Error::InvalidInput(format!(
            "expected `<name> <message>`, got {:?}",
            line
        )));
    };
    let text = text.trim_start();
    if text.is_empty() {
        return Err(Error::InvalidInput("empty message".to_string()));
    }
    Ok(Outgoing {
        name: name.to_string(),
        target: RingId::from_name(name),
        text: text.to_string(),
    })
}
