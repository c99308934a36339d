use serde::{Deserialize, Serialize};

use super::model::ConversationStats;

#[derive(Debug, Deserialize)]
pub struct MessageInput {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub total: usize,
    pub conversations: Vec<ConversationStats>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResult {
    pub updated: u64,
}
