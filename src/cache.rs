//! Calculation cache
//!
//! Cart totals are memoized under `shop_<table>_<id>_calculations` for a
//! configurable number of minutes and forgotten whenever the cart changes.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use jiff::{SignedDuration, Timestamp};
use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{pricing::Totals, store::CartId};

/// Errors raised by a [`CalculationCache`] backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key a cart's calculations are cached under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for the calculations of a cart stored in `table`.
    pub fn calculations(table: &str, cart: CartId) -> Self {
        Self(format!("shop_{table}_{cart}_calculations"))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value cache with expiry, holding computed [`Totals`].
#[automock]
pub trait CalculationCache {
    /// Whether an unexpired entry exists.
    fn has(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// The cached totals, if present and unexpired.
    fn get(&self, key: &CacheKey) -> Result<Option<Totals>, CacheError>;

    /// Store totals for `ttl_minutes`.
    fn put(&self, key: &CacheKey, totals: Totals, ttl_minutes: u32) -> Result<(), CacheError>;

    /// Drop the entry.
    fn forget(&self, key: &CacheKey) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    totals: Totals,
    expires_at: Timestamp,
}

/// In-process [`CalculationCache`]; expired entries are evicted on read and
/// swept on every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<FxHashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = entries.get(key).copied()?;

        if entry.expires_at > Timestamp::now() {
            return Some(entry);
        }

        entries.remove(key);

        None
    }
}

impl CalculationCache for MemoryCache {
    fn has(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.live_entry(key).is_some())
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Totals>, CacheError> {
        Ok(self.live_entry(key).map(|entry| entry.totals))
    }

    fn put(&self, key: &CacheKey, totals: Totals, ttl_minutes: u32) -> Result<(), CacheError> {
        let now = Timestamp::now();
        let expires_at = now
            .checked_add(SignedDuration::from_mins(i64::from(ttl_minutes)))
            .unwrap_or(Timestamp::MAX);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key.clone(), CacheEntry { totals, expires_at });

        Ok(())
    }

    fn forget(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        Ok(())
    }
}
