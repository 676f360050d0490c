//! Client Cache
//!
//! Keeps constructed clients (provider adapters, cluster clients) keyed by
//! identity. An entry is reused only while its revision stamp matches the
//! caller's current stamp; a newer stamp rebuilds it.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::RwLock;

use crate::error::Result;

struct Entry<V, R> {
    revision: R,
    value: V,
}

/// Cache of clients keyed by `K`, invalidated by revision `R`
pub struct ClientCache<K, V, R = chrono::DateTime<chrono::Utc>> {
    entries: RwLock<HashMap<K, Entry<V, R>>>,
}

impl<K, V, R> Default for ClientCache<K, V, R> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V, R> ClientCache<K, V, R>
where
    K: Eq + Hash + Clone,
    V: Clone,
    R: PartialEq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key` if it was built at `revision`,
    /// otherwise build, store and return a fresh one.
    pub async fn get_or_try_insert<F>(&self, key: &K, revision: &R, build: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(entry) = self.entries.read().await.get(key) {
            if entry.revision == *revision {
                return Ok(entry.value.clone());
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.revision == *revision {
                return Ok(entry.value.clone());
            }
        }
        let value = build()?;
        entries.insert(
            key.clone(),
            Entry {
                revision: revision.clone(),
                value: value.clone(),
            },
        );
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_reuses_until_revision_changes() {
        let cache: ClientCache<String, usize, u64> = ClientCache::new();
        let builds = AtomicUsize::new(0);
        let build = || Ok(builds.fetch_add(1, Ordering::SeqCst));

        let key = "user-1".to_string();
        assert_eq!(cache.get_or_try_insert(&key, &1, build).await.unwrap(), 0);
        assert_eq!(cache.get_or_try_insert(&key, &1, build).await.unwrap(), 0);
        assert_eq!(cache.get_or_try_insert(&key, &2, build).await.unwrap(), 1);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let cache: ClientCache<&str, u8, u8> = ClientCache::new();
        let err = cache
            .get_or_try_insert(&"k", &0, || Err(crate::AgentError::Config("no key".into())))
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty().await);

        assert_eq!(cache.get_or_try_insert(&"k", &0, || Ok(7)).await.unwrap(), 7);
    }
}
