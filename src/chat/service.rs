//! Messaging operations: validation and participant checks over a [`ChatStore`].

use tracing::{debug, warn};

use super::{
    model::{Conversation, ConversationStats, Message, ParticipantPair},
    store::ChatStore,
};
use crate::error::{AppError, AppResult};

fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::validation("content", "must not be empty"));
    }
    Ok(())
}

/// The conversation, if `user_id` takes part in it. Unknown ids are denied
/// the same way so their existence does not leak.
async fn participant_conversation(
    store: &dyn ChatStore,
    conversation_id: i64,
    user_id: i64,
) -> AppResult<Conversation> {
    match store.conversation(conversation_id).await? {
        Some(c) if c.has_participant(user_id) => Ok(c),
        _ => {
            warn!(conversation_id, user_id, "conversation access denied");
            Err(AppError::AccessDenied("not a participant of this conversation"))
        }
    }
}

/// Rejects an outgoing message before anything is looked up or written.
pub fn check_outgoing(sender_id: i64, receiver_id: i64, content: &str) -> AppResult<()> {
    validate_content(content)?;
    ParticipantPair::new(sender_id, receiver_id)?;
    Ok(())
}

/// First message between two users creates their conversation.
pub async fn send(
    store: &dyn ChatStore,
    sender_id: i64,
    receiver_id: i64,
    content: &str,
) -> AppResult<Message> {
    check_outgoing(sender_id, receiver_id, content)?;
    let message = store.send_message(sender_id, receiver_id, content).await?;
    debug!(conversation_id = message.conversation_id, sender_id, "message sent");
    Ok(message)
}

pub async fn list_by_conversation(
    store: &dyn ChatStore,
    conversation_id: i64,
    user_id: i64,
) -> AppResult<Vec<Message>> {
    participant_conversation(store, conversation_id, user_id).await?;
    store.messages(conversation_id).await
}

/// Marks the other participant's messages as read. Repeat calls change nothing.
pub async fn mark_read(store: &dyn ChatStore, conversation_id: i64, user_id: i64) -> AppResult<u64> {
    participant_conversation(store, conversation_id, user_id).await?;
    let flipped = store.mark_read(conversation_id, user_id).await?;
    debug!(conversation_id, user_id, flipped, "messages marked read");
    Ok(flipped)
}

pub async fn list_conversations_with_stats(
    store: &dyn ChatStore,
    user_id: i64,
) -> AppResult<Vec<ConversationStats>> {
    store.conversations_with_stats(user_id).await
}
