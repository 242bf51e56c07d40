//! Token store that keeps working when the primary store is unreachable

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::TokenStore;

use super::MemoryTokenStore;

/// Writes go to the primary store; on failure they land in process memory.
/// Reads consult the primary first, then memory.
pub struct FallbackTokenStore {
    primary: Arc<dyn TokenStore>,
    memory: MemoryTokenStore,
}

impl FallbackTokenStore {
    pub fn new(primary: Arc<dyn TokenStore>) -> Self {
        Self { primary, memory: MemoryTokenStore::new() }
    }

    pub fn cleanup_expired(&self) -> usize {
        self.memory.cleanup_expired()
    }
}

#[async_trait]
impl TokenStore for FallbackTokenStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), DomainError> {
        if let Err(e) = self.primary.set(key, value, ttl_secs).await {
            warn!("Primary token store unavailable, keeping token in memory: {}", e);
            return self.memory.set(key, value, ttl_secs).await;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.primary.get(key).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => self.memory.get(key).await,
            Err(e) => {
                warn!("Primary token store unavailable on read: {}", e);
                self.memory.get(key).await
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        if let Err(e) = self.primary.delete(key).await {
            warn!("Primary token store unavailable on delete: {}", e);
        }
        self.memory.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Primary store that always fails.
    struct DownStore;

    #[async_trait]
    impl TokenStore for DownStore {
        async fn set(&self, _: &str, _: &str, _: u64) -> Result<(), DomainError> {
            Err(DomainError::CacheError("connection refused".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, DomainError> {
            Err(DomainError::CacheError("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<(), DomainError> {
            Err(DomainError::CacheError("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_memory_when_primary_is_down() {
        let store = FallbackTokenStore::new(Arc::new(DownStore));
        store.set("imp_token:1", "session", 60).await.unwrap();
        assert_eq!(store.get("imp_token:1").await.unwrap().as_deref(), Some("session"));
        store.delete("imp_token:1").await.unwrap();
        assert_eq!(store.get("imp_token:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_primary_value_wins() {
        let primary = Arc::new(MemoryTokenStore::new());
        primary.set("k", "from-primary", 60).await.unwrap();
        let store = FallbackTokenStore::new(primary.clone());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("from-primary"));
        store.set("k2", "v", 60).await.unwrap();
        assert_eq!(primary.get("k2").await.unwrap().as_deref(), Some("v"));
    }
}
