use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};

/// Two distinct user ids in canonical order (smaller first), the identity
/// of a conversation no matter who wrote first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    low: i64,
    high: i64,
}

impl ParticipantPair {
    pub fn new(a: i64, b: i64) -> AppResult<Self> {
        if a == b {
            return Err(AppError::validation(
                "user_id",
                "cannot start a conversation with yourself",
            ));
        }
        Ok(Self {
            low: a.min(b),
            high: a.max(b),
        })
    }

    pub fn low(&self) -> i64 {
        self.low
    }

    pub fn high(&self) -> i64 {
        self.high
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub participant_one_id: i64,
    pub participant_two_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Conversation {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.participant_one_id == user_id || self.participant_two_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

/// A conversation with its total message count, read and unread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ConversationStats {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub conversation: Conversation,
    pub message_count: i64,
}
