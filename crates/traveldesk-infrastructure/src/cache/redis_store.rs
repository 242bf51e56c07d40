// ============================================================================
// TravelDesk Infrastructure - Redis Token Store
// File: crates/traveldesk-infrastructure/src/cache/redis_store.rs
// ============================================================================

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use tracing::{error, info};

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::TokenStore;

pub struct RedisTokenStore {
    pool: Pool,
}

impl RedisTokenStore {
    pub fn new(url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let mut cfg = Config::from_url(url);
        cfg.pool = Some(PoolConfig::new(max_connections as usize));
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            error!("Failed to create Redis pool: {}", e);
            DomainError::CacheError(e.to_string())
        })?;
        info!("Redis token store configured");
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, DomainError> {
        self.pool.get().await.map_err(|e| {
            error!("Redis connection error: {}", e);
            DomainError::CacheError(e.to_string())
        })
    }

    /// Round-trips a PING, used by readiness checks.
    pub async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| DomainError::CacheError(e.to_string()))?;
        Ok(())
    }
}

fn cache_error(e: deadpool_redis::redis::RedisError) -> DomainError {
    error!("Redis command error: {}", e);
    DomainError::CacheError(e.to_string())
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await.map_err(cache_error)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key).await.map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(cache_error)
    }
}
