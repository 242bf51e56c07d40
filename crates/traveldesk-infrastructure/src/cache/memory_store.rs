//! In-process token store with lazy expiry

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::TokenStore;

#[derive(Default)]
pub struct MemoryTokenStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Removed {} expired tokens", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), DomainError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if entry.1 > now => Some(entry.0.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        if value.is_none() {
            self.entries.remove(key);
        }
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.entries.remove(key);
        Ok(())
    }
}
