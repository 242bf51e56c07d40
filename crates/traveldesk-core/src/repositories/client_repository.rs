//! CRM client and note storage (port)

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{Client, ClientNote, LeadSource, VipStatus};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Case-insensitive contains over first name, last name, email and phone.
    pub search: Option<String>,
    pub vip_status: Option<VipStatus>,
    pub lead_source: Option<LeadSource>,
    pub is_active: Option<bool>,
}

/// A client as listed, with its trip figures.
#[derive(Debug, Clone, Serialize)]
pub struct ClientListRow {
    #[serde(flatten)]
    pub client: Client,
    pub trip_count: i64,
    /// Cleared for callers without financial access.
    pub total_spent: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientCounts {
    pub total: i64,
    pub active: i64,
    /// VIP and PREMIUM clients.
    pub vip: i64,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Only returns the client when it belongs to `tenant_id`.
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Client>, DomainError>;
    /// Case-insensitive email match across tenants, used for inbound mail.
    async fn find_by_email(&self, email: &str) -> Result<Vec<Client>, DomainError>;
    async fn create(&self, client: &Client) -> Result<Client, DomainError>;
    async fn update(&self, client: &Client) -> Result<Client, DomainError>;
    /// Newest first.
    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &ClientFilter,
        pagination: Pagination,
    ) -> Result<Page<ClientListRow>, DomainError>;
    async fn counts(&self, tenant_id: &Uuid) -> Result<ClientCounts, DomainError>;
    async fn recent(&self, tenant_id: &Uuid, limit: i64) -> Result<Vec<Client>, DomainError>;

    async fn add_note(&self, note: &ClientNote) -> Result<ClientNote, DomainError>;
    /// Newest first; `None` returns every note.
    async fn list_notes(&self, client_id: &Uuid, limit: Option<i64>) -> Result<Vec<ClientNote>, DomainError>;
}
