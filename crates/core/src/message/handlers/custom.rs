use async_trait::async_trait;

use crate::error::Error;
use crate::error::Result;
use crate::message::types::CustomMessage;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageStream;
use crate::node::AppMessage;

#[async_trait]
impl HandleMsg<CustomMessage> for MessageHandler {
    async fn handle(&self, stream: MessageStream, msg: CustomMessage) -> Result<()> {
        let handler = self
            .app_handler
            .read()
            .map_err(|_| Error::CallbackSyncLockError)?
            .clone();
        let Some(handler) = handler else {
            tracing::warn!(
                "dropped app message of {} bytes, no handler set",
                msg.0.len()
            );
            return Ok(());
        };

        let from = stream.get_ref().remote_addr();
        handler
            .on_message(AppMessage::new(from, msg.0, stream))
            .await
            .map_err(|e| Error::AppHandler(e.to_string()))
    }
}
