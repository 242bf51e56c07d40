//! Audit log repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{AuditAction, AuditLog};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub action: Option<AuditAction>,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn insert(&self, entry: &AuditLog) -> Result<(), DomainError>;
    /// Newest first.
    async fn list(&self, filter: &AuditLogFilter, pagination: Pagination) -> Result<Page<AuditLog>, DomainError>;
}
