//! Storage primitives the ledgers are built on

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backing storage for this key namespace is not provisioned
    #[error("Storage for namespace '{0}' is unavailable")]
    Unavailable(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Key namespace: everything before the first `:`
pub fn namespace_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

/// Narrow key-value interface with the atomic operations the ledgers need.
///
/// Implementations must make each call atomic with respect to other calls on
/// the same key. A `ttl` refreshes the key's expiry on every write.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Add `delta` to the counter at `key` (missing keys start at 0) and
    /// return the new value
    async fn atomic_increment(
        &self,
        key: &str,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Set `key` to `new` only if it currently holds `expected` (`None`
    /// meaning absent). Returns whether the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<i64>,
        new: i64,
    ) -> Result<bool, StoreError>;

    /// Append to the list at `key`, dropping the oldest entries beyond
    /// `capacity`. Returns the list length after the append.
    async fn bounded_list_append(
        &self,
        key: &str,
        entry: String,
        capacity: usize,
        ttl: Option<Duration>,
    ) -> Result<usize, StoreError>;

    /// Entries oldest first; empty when the key is missing
    async fn list(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

enum Value {
    Counter(i64),
    List(VecDeque<String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    unavailable: HashSet<String>,
}

impl MemoryState {
    fn check(&self, key: &str) -> Result<(), StoreError> {
        let namespace = namespace_of(key);
        if self.unavailable.contains(namespace) {
            Err(StoreError::Unavailable(namespace.to_string()))
        } else {
            Ok(())
        }
    }

    fn evict_expired(&mut self, key: &str) {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
    }

    /// Live entry at `key`, evicting it first if it has expired
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        self.evict_expired(key);
        self.entries.get_mut(key)
    }
}

fn expiry(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|ttl| Instant::now() + ttl)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(format!("Key '{}' holds a different value type", key))
}

/// In-process [`LedgerStore`] guarded by a single async mutex
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every key under `namespace` fail with [`StoreError::Unavailable`],
    /// as when a backing table was never provisioned
    pub async fn disable_namespace(&self, namespace: &str) {
        self.inner
            .lock()
            .await
            .unavailable
            .insert(namespace.to_string());
    }

    pub async fn enable_namespace(&self, namespace: &str) {
        self.inner.lock().await.unavailable.remove(namespace);
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.inner.lock().await;
        state.entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn atomic_increment(
        &self,
        key: &str,
        delta: i64,
        ttl: Option<Duration>,
    ) -> Result<i64, StoreError> {
        let mut state = self.inner.lock().await;
        state.check(key)?;

        let value = match state.live(key) {
            Some(entry) => {
                let Value::Counter(current) = &mut entry.value else {
                    return Err(wrong_type(key));
                };
                *current += delta;
                if ttl.is_some() {
                    entry.expires_at = expiry(ttl);
                }
                *current
            }
            None => {
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Counter(delta),
                        expires_at: expiry(ttl),
                    },
                );
                delta
            }
        };
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut state = self.inner.lock().await;
        state.check(key)?;

        match state.live(key) {
            Some(Entry {
                value: Value::Counter(v),
                ..
            }) => Ok(Some(*v)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<i64>,
        new: i64,
    ) -> Result<bool, StoreError> {
        let mut state = self.inner.lock().await;
        state.check(key)?;

        let current = match state.live(key) {
            Some(Entry {
                value: Value::Counter(v),
                ..
            }) => Some(*v),
            Some(_) => return Err(wrong_type(key)),
            None => None,
        };
        if current != expected {
            return Ok(false);
        }

        match state.live(key) {
            Some(entry) => entry.value = Value::Counter(new),
            None => {
                state.entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Counter(new),
                        expires_at: None,
                    },
                );
            }
        }
        Ok(true)
    }

    async fn bounded_list_append(
        &self,
        key: &str,
        entry: String,
        capacity: usize,
        ttl: Option<Duration>,
    ) -> Result<usize, StoreError> {
        let mut state = self.inner.lock().await;
        state.check(key)?;

        state.evict_expired(key);
        let slot = state.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        let Value::List(items) = &mut slot.value else {
            return Err(wrong_type(key));
        };

        items.push_back(entry);
        while items.len() > capacity {
            items.pop_front();
        }
        let len = items.len();
        if ttl.is_some() {
            slot.expires_at = expiry(ttl);
        }
        Ok(len)
    }

    async fn list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut state = self.inner.lock().await;
        state.check(key)?;

        match state.live(key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increment_starts_at_zero() {
        let store = MemoryLedgerStore::new();
        assert_eq!(store.atomic_increment("quota:a", 5, None).await.unwrap(), 5);
        assert_eq!(store.atomic_increment("quota:a", -2, None).await.unwrap(), 3);
        assert_eq!(store.get("quota:a").await.unwrap(), Some(3));
        assert_eq!(store.get("quota:b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn compare_and_swap_checks_current_value() {
        let store = MemoryLedgerStore::new();
        assert!(store.compare_and_swap("wallet:u", None, 10).await.unwrap());
        assert!(!store.compare_and_swap("wallet:u", None, 20).await.unwrap());
        assert!(!store.compare_and_swap("wallet:u", Some(9), 20).await.unwrap());
        assert!(store.compare_and_swap("wallet:u", Some(10), 4).await.unwrap());
        assert_eq!(store.get("wallet:u").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn bounded_list_drops_oldest() {
        let store = MemoryLedgerStore::new();
        for i in 0..5 {
            store
                .bounded_list_append("usage:k", i.to_string(), 3, None)
                .await
                .unwrap();
        }
        assert_eq!(store.list("usage:k").await.unwrap(), vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn expired_keys_read_as_missing() {
        let store = MemoryLedgerStore::new();
        store
            .atomic_increment("quota:x", 1, Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(store.get("quota:x").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn disabled_namespace_is_unavailable() {
        let store = MemoryLedgerStore::new();
        store.disable_namespace("wallet").await;
        let err = store.get("wallet:u").await.unwrap_err();
        assert_eq!(err, StoreError::Unavailable("wallet".to_string()));
        assert!(store.get("quota:u").await.is_ok());

        store.enable_namespace("wallet").await;
        assert!(store.get("wallet:u").await.is_ok());
    }

    #[tokio::test]
    async fn type_mismatch_is_a_backend_error() {
        let store = MemoryLedgerStore::new();
        store.atomic_increment("quota:k", 1, None).await.unwrap();
        assert!(matches!(
            store.list("quota:k").await,
            Err(StoreError::Backend(_))
        ));
    }
}
