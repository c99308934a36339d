//! Maps an unordered pair of users to their single conversation.

use async_trait::async_trait;
use tracing::{debug, error};

use super::model::ParticipantPair;
use crate::error::{AppError, AppResult};

/// Lookups and inserts the resolver needs from a backing store.
#[async_trait]
pub trait ConversationKeys: Send {
    async fn find_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>>;

    /// `Ok(None)` means the pair is already taken (the unique constraint won),
    /// i.e. another writer created the conversation first.
    async fn insert_conversation(&mut self, pair: ParticipantPair) -> AppResult<Option<i64>>;
}

const MAX_ATTEMPTS: usize = 3;

/// Returns the conversation id for `a` and `b`, creating it on first contact.
/// Safe under racing creators: losing the insert means fetching the winner's row.
pub async fn get_or_create<K>(keys: &mut K, a: i64, b: i64) -> AppResult<i64>
where
    K: ConversationKeys + ?Sized,
{
    let pair = ParticipantPair::new(a, b)?;

    for attempt in 1..=MAX_ATTEMPTS {
        if let Some(id) = keys.find_conversation(pair).await? {
            return Ok(id);
        }
        if let Some(id) = keys.insert_conversation(pair).await? {
            debug!(conversation_id = id, low = pair.low(), high = pair.high(), "conversation created");
            return Ok(id);
        }
        debug!(attempt, low = pair.low(), high = pair.high(), "conversation insert conflicted; fetching again");
    }

    error!(low = pair.low(), high = pair.high(), "conversation neither found nor inserted");
    Err(AppError::Storage(sqlx::Error::RowNotFound))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::chat::memory::MemoryChatStore;

    #[tokio::test]
    async fn order_does_not_matter() {
        let mut store = MemoryChatStore::default();
        let ab = get_or_create(&mut store, 5, 9).await.unwrap();
        let ba = get_or_create(&mut store, 9, 5).await.unwrap();
        assert_eq!(ab, ba);

        let other = get_or_create(&mut store, 5, 10).await.unwrap();
        assert_ne!(ab, other);
        assert_eq!(store.conversation_count(), 2);
    }

    #[tokio::test]
    async fn self_conversation_is_rejected() {
        let mut store = MemoryChatStore::default();
        let err = get_or_create(&mut store, 4, 4).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(store.conversation_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creators_share_one_conversation() {
        let store = MemoryChatStore::default();
        let mut tasks = Vec::new();
        for i in 0..32 {
            let mut handle = store.clone();
            tasks.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { (5, 9) } else { (9, 5) };
                get_or_create(&mut handle, a, b).await
            }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(store.conversation_count(), 1);
    }

    /// Misses the lookup, then loses the insert to a writer that committed id 42.
    struct LosingRace {
        lookups: usize,
    }

    #[async_trait]
    impl ConversationKeys for LosingRace {
        async fn find_conversation(&mut self, _pair: ParticipantPair) -> AppResult<Option<i64>> {
            self.lookups += 1;
            Ok((self.lookups > 1).then_some(42))
        }

        async fn insert_conversation(&mut self, _pair: ParticipantPair) -> AppResult<Option<i64>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn lost_insert_refetches_instead_of_failing() {
        let mut keys = LosingRace { lookups: 0 };
        assert_eq!(get_or_create(&mut keys, 1, 2).await.unwrap(), 42);
        assert_eq!(keys.lookups, 2);
    }

    struct AlwaysConflicting;

    #[async_trait]
    impl ConversationKeys for AlwaysConflicting {
        async fn find_conversation(&mut self, _pair: ParticipantPair) -> AppResult<Option<i64>> {
            Ok(None)
        }

        async fn insert_conversation(&mut self, _pair: ParticipantPair) -> AppResult<Option<i64>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let err = get_or_create(&mut AlwaysConflicting, 1, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
