use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{RevocationStore, StoreError};

/// Redis-backed revocation store.
///
/// `ConnectionManager` multiplexes one connection and reconnects on its own,
/// so clones are cheap and safe to use from every request task.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl RevocationStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        // SETEX rejects 0; callers never send a non-positive TTL but clamp anyway.
        let secs = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(StoreError::Unavailable(format!(
                "unexpected PING reply: {}",
                pong
            )));
        }
        Ok(())
    }
}
