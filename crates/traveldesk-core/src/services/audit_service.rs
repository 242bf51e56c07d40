// ============================================================================
// TravelDesk Core - Audit Service
// File: crates/traveldesk-core/src/services/audit_service.rs
// Description: Records and lists the security audit trail
// ============================================================================

use std::sync::Arc;

use tracing::{debug, error};

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{AuditLog, Principal};
use crate::error::DomainError;
use crate::repositories::{AuditLogFilter, AuditLogRepository};

pub struct AuditService {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Stores the entry. Failures are logged and never reach the caller.
    pub async fn record(&self, entry: AuditLog) {
        debug!("Audit {} for user {:?}", entry.action, entry.user_id);
        if let Err(e) = self.repo.insert(&entry).await {
            error!("Failed to write audit entry {}: {}", entry.action, e);
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &AuditLogFilter,
        pagination: Pagination,
    ) -> Result<Page<AuditLog>, DomainError> {
        principal.require_staff()?;
        principal.require("view_users")?;
        self.repo.list(filter, pagination).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditAction;
    use crate::repositories::MockAuditLogRepository;

    #[tokio::test]
    async fn test_record_swallows_store_errors() {
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(DomainError::DatabaseError("down".into())));

        let service = AuditService::new(Arc::new(repo));
        service.record(AuditLog::new(AuditAction::Login)).await;
    }
}
