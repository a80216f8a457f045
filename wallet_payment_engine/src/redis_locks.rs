//! Redis-backed idempotency lock store.
//!
//! Compiled in with the `redis_locks` feature. Acquisition is a single `SET NX PX`, which atomically claims the key
//! only when nobody holds it and lets Redis expire abandoned locks on its own. Deployments running several engine
//! instances against the same settlement database point them all at one Redis to share lock state.
use chrono::Duration;
use log::*;
use redis::{aio::ConnectionManager, AsyncCommands};

use crate::traits::{IdempotencyStore, LockStoreError};

const LOCK_KEY_PREFIX: &str = "wps:lock:";

#[derive(Clone)]
pub struct RedisLockStore {
    manager: ConnectionManager,
}

impl RedisLockStore {
    pub async fn connect(url: &str) -> Result<Self, LockStoreError> {
        let client = redis::Client::open(url).map_err(|e| LockStoreError::StoreError(e.to_string()))?;
        let manager =
            ConnectionManager::new(client).await.map_err(|e| LockStoreError::StoreError(e.to_string()))?;
        info!("🔒️ Connected to the Redis lock store at {url}");
        Ok(Self { manager })
    }

    fn lock_key(key: &str) -> String {
        format!("{LOCK_KEY_PREFIX}{key}")
    }
}

impl IdempotencyStore for RedisLockStore {
    async fn try_acquire(&self, key: &str, transaction_id: i64, ttl: Duration) -> Result<bool, LockStoreError> {
        let mut conn = self.manager.clone();
        let ttl_ms = ttl.num_milliseconds().max(1) as u64;
        let outcome: Option<String> = redis::cmd("SET")
            .arg(Self::lock_key(key))
            .arg(transaction_id)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockStoreError::StoreError(e.to_string()))?;
        let acquired = outcome.is_some();
        trace!("🔒️ Lock acquisition for key {key} by transaction #{transaction_id}: {acquired}");
        Ok(acquired)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, LockStoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> =
            conn.get(Self::lock_key(key)).await.map_err(|e| LockStoreError::StoreError(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(value) => match value.parse::<i64>() {
                Ok(id) => Ok(Some(id)),
                Err(_) => Err(LockStoreError::CorruptEntry(key.to_string(), value)),
            },
        }
    }

    async fn release(&self, key: &str) -> Result<(), LockStoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(Self::lock_key(key)).await.map_err(|e| LockStoreError::StoreError(e.to_string()))?;
        trace!("🔓️ Released lock for key {key}");
        Ok(())
    }
}
