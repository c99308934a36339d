//! In-process [`ChatStore`] for unit tests. Mirrors the SQL store's
//! unique pair key, ordering and read-flag rules.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    model::{Conversation, ConversationStats, Message, ParticipantPair},
    resolver::{self, ConversationKeys},
    store::ChatStore,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
}

#[derive(Clone, Default)]
pub struct MemoryChatStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryChatStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn conversation_count(&self) -> usize {
        self.tables().conversations.len()
    }
}

#[async_trait]
impl ConversationKeys for MemoryChatStore {
    async fn find_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>> {
        // let racing tasks interleave between lookup and insert
        tokio::task::yield_now().await;
        Ok(self
            .tables()
            .conversations
            .iter()
            .find(|c| c.participant_one_id == pair.low() && c.participant_two_id == pair.high())
            .map(|c| c.id))
    }

    async fn insert_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>> {
        tokio::task::yield_now().await;
        let mut tables = self.tables();
        let taken = tables
            .conversations
            .iter()
            .any(|c| c.participant_one_id == pair.low() && c.participant_two_id == pair.high());
        if taken {
            return Ok(None);
        }
        let id = tables.conversations.len() as i64 + 1;
        tables.conversations.push(Conversation {
            id,
            participant_one_id: pair.low(),
            participant_two_id: pair.high(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(Some(id))
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn get_or_create_conversation(&self, a: i64, b: i64) -> AppResult<i64> {
        resolver::get_or_create(&mut self.clone(), a, b).await
    }

    async fn conversation(&self, id: i64) -> AppResult<Option<Conversation>> {
        Ok(self
            .tables()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
    ) -> AppResult<Message> {
        let mut tables = self.tables();
        if !tables.conversations.iter().any(|c| c.id == conversation_id) {
            // foreign key violation in the SQL store
            return Err(AppError::Storage(sqlx::Error::RowNotFound));
        }
        let message = Message {
            id: tables.messages.len() as i64 + 1,
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
            is_read: false,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn messages(&self, conversation_id: i64) -> AppResult<Vec<Message>> {
        let mut rows: Vec<Message> = self
            .tables()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.id));
        Ok(rows)
    }

    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> AppResult<u64> {
        let mut flipped = 0;
        for m in self.tables().messages.iter_mut() {
            if m.conversation_id == conversation_id && m.sender_id != reader_id && !m.is_read {
                m.is_read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn conversations_with_stats(&self, user_id: i64) -> AppResult<Vec<ConversationStats>> {
        let tables = self.tables();
        let mut rows: Vec<ConversationStats> = tables
            .conversations
            .iter()
            .filter(|c| c.has_participant(user_id))
            .map(|c| ConversationStats {
                conversation: c.clone(),
                message_count: tables
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id)
                    .count() as i64,
            })
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse((s.conversation.created_at, s.conversation.id)));
        Ok(rows)
    }
}
