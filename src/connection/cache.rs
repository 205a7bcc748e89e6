//! Time-bounded memo of database handles.

use super::ConnectionConfig;
use crate::db::DatabaseHandle;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A cached handle and the moment it was opened.
#[derive(Clone)]
pub struct CacheEntry {
    pub handle: DatabaseHandle,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

/// Handles keyed by the full connection parameters.
pub struct HandleCache {
    ttl: Duration,
    entries: HashMap<ConnectionConfig, CacheEntry>,
}

impl HandleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Removes every entry older than the TTL and returns their handles so the
    /// caller can close them.
    pub fn evict_expired(&mut self, now: Instant) -> Vec<DatabaseHandle> {
        let ttl = self.ttl;
        let expired: Vec<ConnectionConfig> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(ttl, now))
            .map(|(key, _)| key.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .map(|entry| entry.handle)
            .collect()
    }

    /// Returns the handle for `key` if it is still fresh at `now`.
    pub fn get(&self, key: &ConnectionConfig, now: Instant) -> Option<DatabaseHandle> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl, now))
            .map(|entry| entry.handle.clone())
    }

    pub fn insert(&mut self, key: ConnectionConfig, handle: DatabaseHandle, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                handle,
                created_at: now,
            },
        );
    }

    /// Empties the cache, returning the handles it held.
    pub fn drain(&mut self) -> Vec<DatabaseHandle> {
        self.entries.drain().map(|(_, entry)| entry.handle).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
