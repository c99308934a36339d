use async_trait::async_trait;

use super::model::{Conversation, ConversationStats, Message};
use crate::error::AppResult;

/// Persistence for conversations and messages. Callers go through
/// [`super::service`], which owns validation and participant checks.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn get_or_create_conversation(&self, a: i64, b: i64) -> AppResult<i64>;

    async fn conversation(&self, id: i64) -> AppResult<Option<Conversation>>;

    async fn append_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
    ) -> AppResult<Message>;

    /// Resolve the sender/receiver conversation and append to it. Stores
    /// that can should override this to do both as one unit.
    async fn send_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> AppResult<Message> {
        let conversation_id = self.get_or_create_conversation(sender_id, receiver_id).await?;
        self.append_message(conversation_id, sender_id, content).await
    }

    /// Oldest first.
    async fn messages(&self, conversation_id: i64) -> AppResult<Vec<Message>>;

    /// Flags unread messages not sent by `reader_id`; returns how many flipped.
    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> AppResult<u64>;

    /// Newest conversation first.
    async fn conversations_with_stats(&self, user_id: i64) -> AppResult<Vec<ConversationStats>>;
}
