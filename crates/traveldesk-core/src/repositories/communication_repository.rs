//! Client communication log storage (port)

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ClientCommunication;
use crate::error::DomainError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommunicationCounts {
    pub total: i64,
    pub email: i64,
    pub phone: i64,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait CommunicationRepository: Send + Sync {
    async fn create(&self, communication: &ClientCommunication) -> Result<ClientCommunication, DomainError>;
    async fn update(&self, communication: &ClientCommunication) -> Result<(), DomainError>;
    /// Newest first; `None` returns the whole history.
    async fn list_for_client(&self, client_id: &Uuid, limit: Option<i64>) -> Result<Vec<ClientCommunication>, DomainError>;
    async fn counts_for_client(&self, client_id: &Uuid) -> Result<CommunicationCounts, DomainError>;
}
