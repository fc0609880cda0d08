use async_trait::async_trait;

use super::reply;
use crate::error::Result;
use crate::message::types::FindSuccessorReport;
use crate::message::types::FindSuccessorSend;
use crate::message::types::Message;
use crate::message::types::QueryPredecessorReport;
use crate::message::types::QueryPredecessorSend;
use crate::message::HandleMsg;
use crate::message::MessageHandler;
use crate::message::MessageStream;

#[async_trait]
impl HandleMsg<FindSuccessorSend> for MessageHandler {
    async fn handle(&self, stream: MessageStream, msg: FindSuccessorSend) -> Result<()> {
        let node = match self.resolver.find_successor_with_ttl(msg.id, msg.ttl).await {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::warn!("failed to resolve successor of {}: {}", msg.id, e);
                None
            }
        };
        reply(
            stream,
            Message::FindSuccessorReport(FindSuccessorReport { node }),
        )
        .await
    }
}

#[async_trait]
impl HandleMsg<QueryPredecessorSend> for MessageHandler {
    async fn handle(&self, stream: MessageStream, msg: QueryPredecessorSend) -> Result<()> {
        let node = self.dht.predecessor()?;
        tracing::debug!("{} asked for predecessor, answering {:?}", msg.id, node);
        reply(
            stream,
            Message::QueryPredecessorReport(QueryPredecessorReport { node }),
        )
        .await
    }
}
