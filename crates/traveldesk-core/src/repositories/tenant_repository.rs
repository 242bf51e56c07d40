//! Tenant repository trait (port)

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{Tenant, TenantStatus, TenantType};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    /// Matches name, subdomain or contact email.
    pub search: Option<String>,
    pub tenant_type: Option<TenantType>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TenantCounts {
    pub total: i64,
    pub active: i64,
    pub trial: i64,
    pub prospect: i64,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, DomainError>;
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DomainError>;
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, DomainError>;
    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError>;
    /// Ordered by name.
    async fn list(&self, filter: &TenantFilter, pagination: Pagination) -> Result<Page<Tenant>, DomainError>;
    async fn count_users(&self, tenant_id: &Uuid) -> Result<i64, DomainError>;
    async fn counts(&self) -> Result<TenantCounts, DomainError>;
}
