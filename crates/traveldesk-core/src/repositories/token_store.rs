//! Short-lived key/value storage for impersonation tokens (port)

use async_trait::async_trait;

use crate::error::DomainError;

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), DomainError>;
    /// `None` when the key is unknown or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}
