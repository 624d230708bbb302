//! Revocation store: key-value storage with per-key TTL.
//!
//! The token manager only needs three things from its backing store: read a
//! key, write a key with an expiry, and report liveness. Backends:
//! - [`redis::RedisStore`] for production (shared across replicas)
//! - [`memory::MemoryStore`] for local development and tests

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Fetch a key. `Ok(None)` means the key does not exist (or has expired).
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key that the store drops on its own after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Round-trip liveness check.
    async fn health(&self) -> Result<(), StoreError>;
}

/// How often the in-process store drops expired revocations.
pub const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the configured backend. `memory://` selects the in-process store.
pub async fn connect(url: &str) -> Result<Arc<dyn RevocationStore>, StoreError> {
    if url.starts_with("memory://") {
        tracing::warn!("using in-process revocation store; revocations are not shared across replicas");
        let store = MemoryStore::new();
        store.spawn_sweeper(MEMORY_SWEEP_INTERVAL);
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(RedisStore::connect(url).await?))
}
