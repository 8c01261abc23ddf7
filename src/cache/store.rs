//! The store boundary and an in-process reference store.
//!
//! The cache layer only ever talks to a [`Store`]. Expiry is the store's
//! business: the layer passes the resolved expiry along with each write and
//! trusts `get` not to return anything stale.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{CacheSettings, StoreError};

/// A captured response as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub body: String,
    pub content_type: String,
}

/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// `None` leaves retention to the store's own default.
    pub expires: Option<Duration>,
}

/// Key-value storage for captured responses.
///
/// Implementations must tolerate concurrent `get`/`set` on the same key. The
/// cache layer adds no locking of its own; two requests missing on one key
/// both write, and the last write wins.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    async fn set(&self, key: &str, entry: CacheEntry, options: SetOptions)
    -> Result<(), StoreError>;

    /// Remove `key`. Used by application code for manual invalidation.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

struct Slot {
    entry: CacheEntry,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Bounded, in-process [`Store`] with least-recently-used eviction.
///
/// Expired entries are dropped lazily when read.
pub struct MemoryStore {
    slots: Mutex<LruCache<String, Slot>>,
    default_expiry: Option<Duration>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            default_expiry: None,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.store_capacity_non_zero())
            .with_default_expiry(settings.store_default_expiry())
    }

    /// Retention for writes that carry no expiry of their own.
    #[must_use]
    pub fn with_default_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.default_expiry = expiry;
        self
    }

    /// Number of slots held, including expired ones not yet read.
    ///
    /// Counts through a poisoned lock; only `get`, `set` and `delete` report
    /// poisoning, as [`StoreError::Unavailable`].
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Slot>>, StoreError> {
        self.slots
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut slots = self.lock()?;
        let now = Instant::now();
        let found = slots
            .get(key)
            .map(|slot| slot.is_live(now).then(|| slot.entry.clone()));
        match found {
            Some(Some(entry)) => Ok(Some(entry)),
            Some(None) => {
                slots.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        entry: CacheEntry,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        // A ttl past the clock's range never expires.
        let expires_at = options
            .expires
            .or(self.default_expiry)
            .and_then(|ttl| Instant::now().checked_add(ttl));
        self.lock()?.put(key.to_owned(), Slot { entry, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?.pop(key);
        Ok(())
    }
}
