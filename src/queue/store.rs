//! Queue store contract and in-memory implementation
//!
//! The store is the only shared mutable resource in the matching core. Its
//! atomic find-and-remove operation is the mutual-exclusion mechanism that
//! prevents two concurrent joins from consuming the same waiting entry; no
//! additional lock exists anywhere else in the protocol.

use crate::error::{MatchingError, Result};
use crate::types::{MatchRequest, QueueEntry, UserId};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Contract for the shared pool of waiting users.
///
/// `find_and_remove_compatible` must be linearizable with respect to `insert`
/// and other `find_and_remove_compatible` calls: no two concurrent callers may
/// observe and remove the same entry.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Atomically locate one live entry compatible with `request` and remove
    /// it in the same step.
    ///
    /// Compatible means equal complexity, equal language and a non-empty
    /// category intersection. Expired entries are never returned.
    async fn find_and_remove_compatible(
        &self,
        request: &MatchRequest,
    ) -> Result<Option<QueueEntry>>;

    /// Insert a new waiting entry. Fails with a conflict if a live entry for
    /// the same user already exists; a user never holds two entries.
    async fn insert(&self, entry: QueueEntry) -> Result<()>;

    /// Read-only lookup by user. An expired entry is treated as absent and
    /// lazily evicted.
    async fn find_by_user(&self, user_id: &str) -> Result<Option<QueueEntry>>;

    /// Explicit leave. Returns whether an entry was removed.
    async fn remove_by_user(&self, user_id: &str) -> Result<bool>;

    /// Evict every entry whose expiry has passed, returning how many were
    /// removed. Driven by the periodic sweeper.
    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Number of entries currently held, expired-but-unswept included.
    async fn waiting_count(&self) -> Result<usize>;
}

/// In-memory queue store keyed by user id.
///
/// Every operation takes the single mutex once and completes inside it, which
/// makes find-and-remove linearizable against inserts and against other
/// find-and-remove calls on the same store.
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    entries: Mutex<HashMap<UserId, QueueEntry>>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, QueueEntry>>> {
        self.entries.lock().map_err(|_| {
            MatchingError::StoreUnavailable {
                message: "queue store mutex poisoned".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn find_and_remove_compatible(
        &self,
        request: &MatchRequest,
    ) -> Result<Option<QueueEntry>> {
        let now = current_timestamp();
        let mut entries = self.lock()?;

        // Tie-break: oldest entry first, to bound wait time.
        let candidate = entries
            .values()
            .filter(|entry| {
                entry.complexity == request.complexity
                    && entry.language == request.language
                    && !entry.is_expired(now)
                    && entry
                        .categories
                        .iter()
                        .any(|category| request.categories.contains(category))
            })
            .min_by_key(|entry| entry.enqueued_at)
            .map(|entry| entry.user_id.clone());

        Ok(candidate.and_then(|user_id| entries.remove(&user_id)))
    }

    async fn insert(&self, entry: QueueEntry) -> Result<()> {
        let now = current_timestamp();

        if entry.categories.is_empty() {
            return Err(MatchingError::InternalError {
                message: format!(
                    "refusing queue entry with empty categories for user '{}'",
                    entry.user_id
                ),
            }
            .into());
        }
        if entry.is_expired(now) {
            return Err(MatchingError::InternalError {
                message: format!(
                    "refusing queue entry already expired for user '{}'",
                    entry.user_id
                ),
            }
            .into());
        }

        let mut entries = self.lock()?;
        if let Some(existing) = entries.get(&entry.user_id) {
            if !existing.is_expired(now) {
                return Err(MatchingError::QueueConflict {
                    user_id: entry.user_id,
                }
                .into());
            }
            // Expired but unswept: dead entry, safe to supersede.
        }
        entries.insert(entry.user_id.clone(), entry);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<QueueEntry>> {
        let now = current_timestamp();
        let mut entries = self.lock()?;

        match entries.get(user_id) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(user_id);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    async fn remove_by_user(&self, user_id: &str) -> Result<bool> {
        let mut entries = self.lock()?;
        Ok(entries.remove(user_id).is_some())
    }

    async fn remove_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    async fn waiting_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complexity;
    use chrono::Duration;

    fn entry(user_id: &str, categories: &[&str], ttl_seconds: i64) -> QueueEntry {
        let now = current_timestamp();
        QueueEntry {
            user_id: user_id.to_string(),
            complexity: Complexity::Easy,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            language: "python3".to_string(),
            enqueued_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
        }
    }

    fn request(categories: &[&str]) -> MatchRequest {
        MatchRequest {
            complexity: Complexity::Easy,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            language: "python3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_user() {
        let store = InMemoryQueueStore::new();
        store.insert(entry("1", &["Array"], 30)).await.unwrap();

        let found = store.find_by_user("1").await.unwrap().unwrap();
        assert_eq!(found.user_id, "1");
        assert!(store.find_by_user("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemoryQueueStore::new();
        store.insert(entry("1", &["Array"], 30)).await.unwrap();

        let err = store.insert(entry("1", &["Graph"], 30)).await.unwrap_err();
        let matching = err.downcast_ref::<MatchingError>().unwrap();
        assert!(matches!(matching, MatchingError::QueueConflict { .. }));
    }

    #[tokio::test]
    async fn test_insert_supersedes_expired_entry() {
        let store = InMemoryQueueStore::new();
        let mut stale = entry("1", &["Array"], 30);
        stale.expires_at = current_timestamp() - Duration::seconds(1);
        {
            let mut entries = store.entries.lock().unwrap();
            entries.insert(stale.user_id.clone(), stale);
        }

        store.insert(entry("1", &["Graph"], 30)).await.unwrap();
        let found = store.find_by_user("1").await.unwrap().unwrap();
        assert_eq!(found.categories, vec!["Graph"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_categories() {
        let store = InMemoryQueueStore::new();
        assert!(store.insert(entry("1", &[], 30)).await.is_err());
    }

    #[tokio::test]
    async fn test_find_and_remove_requires_overlap() {
        let store = InMemoryQueueStore::new();
        store.insert(entry("1", &["Array", "Graph"], 30)).await.unwrap();

        assert!(store
            .find_and_remove_compatible(&request(&["Stack"]))
            .await
            .unwrap()
            .is_none());

        let matched = store
            .find_and_remove_compatible(&request(&["Graph", "Heap"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(matched.user_id, "1");

        // Consumed: gone from the store.
        assert!(store.find_by_user("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_and_remove_ignores_other_language() {
        let store = InMemoryQueueStore::new();
        let mut other = entry("1", &["Array"], 30);
        other.language = "rust".to_string();
        store.insert(other).await.unwrap();

        assert!(store
            .find_and_remove_compatible(&request(&["Array"]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_and_remove_prefers_oldest() {
        let store = InMemoryQueueStore::new();
        let mut older = entry("old", &["Array"], 30);
        older.enqueued_at = current_timestamp() - Duration::seconds(10);
        store.insert(older).await.unwrap();
        store.insert(entry("new", &["Array"], 30)).await.unwrap();

        let matched = store
            .find_and_remove_compatible(&request(&["Array"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(matched.user_id, "old");
    }

    #[tokio::test]
    async fn test_expired_entry_is_never_matched_and_lazily_evicted() {
        let store = InMemoryQueueStore::new();
        let mut stale = entry("1", &["Array"], 30);
        stale.expires_at = current_timestamp() - Duration::seconds(1);
        {
            let mut entries = store.entries.lock().unwrap();
            entries.insert(stale.user_id.clone(), stale);
        }

        assert!(store
            .find_and_remove_compatible(&request(&["Array"]))
            .await
            .unwrap()
            .is_none());

        // Lazy eviction through the read path.
        assert_eq!(store.waiting_count().await.unwrap(), 1);
        assert!(store.find_by_user("1").await.unwrap().is_none());
        assert_eq!(store.waiting_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_by_user_is_idempotent() {
        let store = InMemoryQueueStore::new();
        store.insert(entry("1", &["Array"], 30)).await.unwrap();

        assert!(store.remove_by_user("1").await.unwrap());
        assert!(!store.remove_by_user("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_expired_sweeps_only_stale_entries() {
        let store = InMemoryQueueStore::new();
        store.insert(entry("live", &["Array"], 300)).await.unwrap();
        let mut stale = entry("stale", &["Array"], 30);
        stale.expires_at = current_timestamp() - Duration::seconds(1);
        {
            let mut entries = store.entries.lock().unwrap();
            entries.insert(stale.user_id.clone(), stale);
        }

        let removed = store.remove_expired(current_timestamp()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.find_by_user("live").await.unwrap().is_some());
    }
}
