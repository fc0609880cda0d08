use async_trait::async_trait;

use super::reply;
use crate::dht::Chord;
use crate::dht::NodeInfo;
use crate::error::Result;
use crate::message::types::AliveCheckReport;
use crate::message::types::AliveCheckSend;
use crate::message::types::Message;
use crate::message::types::NotifyPredecessorReport;
use crate::message::types::NotifyPredecessorSend;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageStream;

#[async_trait]
impl HandleMsg<NotifyPredecessorSend> for MessageHandler {
    async fn handle(&self, stream: MessageStream, msg: NotifyPredecessorSend) -> Result<()> {
        // The sender only tells us its port, the ip is the one we see.
        let candidate = NodeInfo::new(msg.id, stream.get_ref().remote_ip(), msg.port);
        // Outside a ring there is nobody to be a predecessor of.
        let accepted = self.is_joined()? && self.dht.notify(candidate)?;
        if accepted {
            tracing::debug!("{} accepted {} as predecessor", self.dht.id(), candidate);
        }
        reply(
            stream,
            Message::NotifyPredecessorReport(NotifyPredecessorReport { accepted }),
        )
        .await
    }
}

#[async_trait]
impl HandleMsg<AliveCheckSend> for MessageHandler {
    async fn handle(&self, stream: MessageStream, _: AliveCheckSend) -> Result<()> {
        reply(
            stream,
            Message::AliveCheckReport(AliveCheckReport { alive: true }),
        )
        .await
    }
}
