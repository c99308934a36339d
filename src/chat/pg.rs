use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::{
    model::{Conversation, ConversationStats, Message, ParticipantPair},
    resolver::{self, ConversationKeys},
    store::ChatStore,
};
use crate::error::AppResult;

#[derive(Clone)]
pub struct PgChatStore {
    db: PgPool,
}

impl PgChatStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationKeys for PgConnection {
    async fn find_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM conversations
            WHERE participant_one_id = $1 AND participant_two_id = $2
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&mut *self)
        .await?;
        Ok(id)
    }

    async fn insert_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>> {
        // No row back: the pair already exists. A raised unique violation would
        // abort an enclosing transaction before the re-fetch.
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO conversations (participant_one_id, participant_two_id)
            VALUES ($1, $2)
            ON CONFLICT (participant_one_id, participant_two_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&mut *self)
        .await?;
        Ok(id)
    }
}

async fn insert_message(
    conn: &mut PgConnection,
    conversation_id: i64,
    sender_id: i64,
    content: &str,
) -> AppResult<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (conversation_id, sender_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, conversation_id, sender_id, content, created_at, is_read
        "#,
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .fetch_one(conn)
    .await?;
    Ok(message)
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn get_or_create_conversation(&self, a: i64, b: i64) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        resolver::get_or_create(&mut *conn, a, b).await
    }

    async fn conversation(&self, id: i64) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, participant_one_id, participant_two_id, created_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(conversation)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
    ) -> AppResult<Message> {
        let mut conn = self.db.acquire().await?;
        insert_message(&mut conn, conversation_id, sender_id, content).await
    }

    async fn send_message(
        &self,
        sender_id: i64,
        receiver_id: i64,
        content: &str,
    ) -> AppResult<Message> {
        // Dropping `tx` on any error rolls back both writes.
        let mut tx = self.db.begin().await?;
        let conversation_id = resolver::get_or_create(&mut *tx, sender_id, receiver_id).await?;
        let message = insert_message(&mut tx, conversation_id, sender_id, content).await?;
        tx.commit().await?;

        debug!(conversation_id, message_id = message.id, "message stored");
        Ok(message)
    }

    async fn messages(&self, conversation_id: i64) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, conversation_id, sender_id, content, created_at, is_read
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn mark_read(&self, conversation_id: i64, reader_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn conversations_with_stats(&self, user_id: i64) -> AppResult<Vec<ConversationStats>> {
        let rows = sqlx::query_as::<_, ConversationStats>(
            r#"
            SELECT
                c.id,
                c.participant_one_id,
                c.participant_two_id,
                c.created_at,
                COUNT(m.id) AS message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE c.participant_one_id = $1 OR c.participant_two_id = $1
            GROUP BY c.id
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
