use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time;

use super::{RevocationStore, StoreError};
use crate::tokens::clock::{Clock, SystemClock};

#[derive(Clone)]
struct Entry {
    value: String,
    /// Unix seconds; the entry is gone once `now >= expires_at`.
    expires_at: i64,
}

/// In-process TTL map. Expired entries are dropped lazily on read and by the
/// sweeper from [`MemoryStore::spawn_sweeper`].
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of live entries.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a key in whole seconds, if it is live.
    #[cfg(test)]
    pub(crate) fn ttl(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|e| e.expires_at - now)
            .filter(|remaining| *remaining > 0)
    }

    #[cfg(test)]
    pub(crate) fn evict_expired(&self) -> usize {
        evict(&self.entries, self.clock.now())
    }

    /// Drop expired entries every `every`. Keys that are never read again are
    /// otherwise only reclaimed here. The task ends once the store is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let entries = Arc::downgrade(&self.entries);
        let clock = self.clock.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(every);
            loop {
                interval.tick().await;
                let Some(entries) = entries.upgrade() else {
                    break;
                };
                let evicted = evict(&entries, clock.now());
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = entries.len(), "swept expired revocations");
                }
            }
        })
    }
}

fn evict(entries: &DashMap<String, Entry>, now: i64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
            // drop the read guard before removing
            drop(entry);
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = self.clock.now().saturating_add(secs);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
