// ============================================================================
// TravelDesk Core - Tenant Service
// File: crates/traveldesk-core/src/services/tenant_service.rs
// Description: Staff management of tenant organizations and their lifecycle
// ============================================================================

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};
use traveldesk_shared::utils::is_valid_subdomain;

use crate::domain::{AuditAction, AuditLog, Principal, Tenant, TenantStatus, TenantType};
use crate::error::DomainError;
use crate::repositories::{TenantFilter, TenantRepository};
use crate::services::audit_service::AuditService;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub tenant_type: Option<TenantType>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plan_type: Option<String>,
    pub max_users: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub plan_type: Option<String>,
    pub max_users: Option<i32>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub user_count: i64,
    pub is_trial_expired: bool,
    pub trial_days_remaining: Option<i64>,
}

impl TenantDetail {
    fn new(tenant: Tenant, user_count: i64, today: NaiveDate) -> Self {
        Self {
            is_trial_expired: tenant.is_trial_expired(today),
            trial_days_remaining: tenant.trial_days_remaining(today),
            tenant,
            user_count,
        }
    }
}

pub struct TenantService {
    tenant_repo: Arc<dyn TenantRepository>,
    audit: Arc<AuditService>,
    trial_days: i64,
}

impl TenantService {
    pub fn new(tenant_repo: Arc<dyn TenantRepository>, audit: Arc<AuditService>, trial_days: i64) -> Self {
        Self { tenant_repo, audit, trial_days }
    }

    async fn load(&self, id: &Uuid) -> Result<Tenant, DomainError> {
        self.tenant_repo.find_by_id(id).await?.ok_or(DomainError::TenantNotFound)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &TenantFilter,
        pagination: Pagination,
    ) -> Result<Page<Tenant>, DomainError> {
        principal.require_staff()?;
        principal.require("view_tenants")?;
        self.tenant_repo.list(filter, pagination).await
    }

    pub async fn get(&self, principal: &Principal, id: &Uuid) -> Result<TenantDetail, DomainError> {
        principal.require_staff()?;
        principal.require("view_tenants")?;
        let tenant = self.load(id).await?;
        let user_count = self.tenant_repo.count_users(id).await?;
        Ok(TenantDetail::new(tenant, user_count, Utc::now().date_naive()))
    }

    pub async fn create(&self, principal: &Principal, input: NewTenant) -> Result<Tenant, DomainError> {
        principal.require_staff()?;
        principal.require("create_tenants")?;

        let subdomain = input.subdomain.trim().to_lowercase();
        if !is_valid_subdomain(&subdomain) {
            return Err(DomainError::ValidationError(format!("Invalid subdomain: {}", subdomain)));
        }
        if self.tenant_repo.find_by_subdomain(&subdomain).await?.is_some() {
            warn!("Tenant subdomain already taken: {}", subdomain);
            return Err(DomainError::TenantSubdomainAlreadyExists(subdomain));
        }

        let mut tenant = Tenant::new(input.name, subdomain)?;
        tenant.contact_email = input.contact_email.map(|e| e.trim().to_lowercase());
        tenant.phone = input.phone;
        tenant.address = input.address;
        if let Some(plan) = input.plan_type {
            tenant.plan_type = plan;
        }
        if let Some(max) = input.max_users {
            tenant.max_users = max;
        }
        match input.tenant_type.unwrap_or_default() {
            TenantType::Trial => tenant.start_trial(Utc::now().date_naive(), self.trial_days),
            TenantType::Client => tenant.convert_to_client(),
            TenantType::Prospect => {}
        }
        validator::Validate::validate(&tenant)?;

        let created = self.tenant_repo.create(&tenant).await?;
        self.audit
            .record(
                AuditLog::by(principal, AuditAction::Create)
                    .resource("tenant", created.id)
                    .detail("subdomain", created.subdomain.clone()),
            )
            .await;
        info!("Tenant created: {}", created.subdomain);
        Ok(created)
    }

    pub async fn update(&self, principal: &Principal, id: &Uuid, changes: TenantUpdate) -> Result<Tenant, DomainError> {
        principal.require_staff()?;
        principal.require("edit_tenants")?;
        let mut tenant = self.load(id).await?;

        if let Some(name) = changes.name {
            tenant.name = name.trim().to_string();
        }
        if changes.contact_email.is_some() {
            tenant.contact_email = changes.contact_email.map(|e| e.trim().to_lowercase());
        }
        if changes.phone.is_some() {
            tenant.phone = changes.phone;
        }
        if changes.address.is_some() {
            tenant.address = changes.address;
        }
        if let Some(plan) = changes.plan_type {
            tenant.plan_type = plan;
        }
        if let Some(max) = changes.max_users {
            tenant.max_users = max;
        }
        if let Some(status) = changes.status {
            tenant.status = status;
            tenant.is_active = matches!(status, TenantStatus::Active);
        }
        tenant.updated_at = Utc::now();
        validator::Validate::validate(&tenant)?;

        self.save(principal, tenant, "update").await
    }

    pub async fn start_trial(&self, principal: &Principal, id: &Uuid) -> Result<Tenant, DomainError> {
        self.transition(principal, id, "start_trial", |t, today, days| t.start_trial(today, days))
            .await
    }

    pub async fn convert_to_client(&self, principal: &Principal, id: &Uuid) -> Result<Tenant, DomainError> {
        self.transition(principal, id, "convert_to_client", |t, _, _| t.convert_to_client())
            .await
    }

    pub async fn suspend(&self, principal: &Principal, id: &Uuid) -> Result<Tenant, DomainError> {
        self.transition(principal, id, "suspend", |t, _, _| t.suspend()).await
    }

    pub async fn activate(&self, principal: &Principal, id: &Uuid) -> Result<Tenant, DomainError> {
        self.transition(principal, id, "activate", |t, _, _| t.activate()).await
    }

    async fn transition<F>(&self, principal: &Principal, id: &Uuid, name: &str, apply: F) -> Result<Tenant, DomainError>
    where
        F: FnOnce(&mut Tenant, NaiveDate, i64),
    {
        principal.require_staff()?;
        principal.require("edit_tenants")?;
        let mut tenant = self.load(id).await?;
        apply(&mut tenant, Utc::now().date_naive(), self.trial_days);
        self.save(principal, tenant, name).await
    }

    async fn save(&self, principal: &Principal, tenant: Tenant, operation: &str) -> Result<Tenant, DomainError> {
        let saved = self.tenant_repo.update(&tenant).await?;
        self.audit
            .record(
                AuditLog::by(principal, AuditAction::Update)
                    .resource("tenant", saved.id)
                    .detail("operation", operation)
                    .detail("status", saved.status.as_str())
                    .detail("tenant_type", saved.tenant_type.as_str()),
            )
            .await;
        info!("Tenant {} {}: {}", saved.subdomain, operation, saved.status);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestMeta, RoleName, User};
    use crate::repositories::{MockAuditLogRepository, MockTenantRepository};

    fn staff() -> Principal {
        let user = User::new("ops".into(), "ops@example.com".into(), "h".into(), RoleName::SystemAdmin, None).unwrap();
        let perms = ["view_tenants", "create_tenants", "edit_tenants"].iter().map(|p| p.to_string()).collect();
        Principal::new(user, perms, RequestMeta::default())
    }

    fn service(repo: MockTenantRepository) -> TenantService {
        let mut audit = MockAuditLogRepository::new();
        audit.expect_insert().returning(|_| Ok(()));
        TenantService::new(Arc::new(repo), Arc::new(AuditService::new(Arc::new(audit))), 14)
    }

    fn input(subdomain: &str, tenant_type: Option<TenantType>) -> NewTenant {
        NewTenant {
            name: "Blue Sky Travel".into(),
            subdomain: subdomain.into(),
            tenant_type,
            contact_email: Some("Owner@BlueSky.example".into()),
            phone: None,
            address: None,
            plan_type: None,
            max_users: None,
        }
    }

    #[tokio::test]
    async fn test_create_trial_tenant() {
        let mut repo = MockTenantRepository::new();
        repo.expect_find_by_subdomain().returning(|_| Ok(None));
        repo.expect_create().returning(|t| Ok(t.clone()));

        let tenant = service(repo).create(&staff(), input("BlueSky", Some(TenantType::Trial))).await.unwrap();
        assert_eq!(tenant.subdomain, "bluesky");
        assert_eq!(tenant.tenant_type, TenantType::Trial);
        assert_eq!(tenant.status, TenantStatus::Active);
        assert_eq!(tenant.contact_email.as_deref(), Some("owner@bluesky.example"));
        let (start, end) = (tenant.trial_start_date.unwrap(), tenant.trial_end_date.unwrap());
        assert_eq!((end - start).num_days(), 14);
    }

    #[tokio::test]
    async fn test_duplicate_subdomain_rejected() {
        let mut repo = MockTenantRepository::new();
        repo.expect_find_by_subdomain()
            .returning(|s| Ok(Some(Tenant::new("Existing".into(), s.to_string()).unwrap())));
        let result = service(repo).create(&staff(), input("bluesky", None)).await;
        assert!(matches!(result, Err(DomainError::TenantSubdomainAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_invalid_subdomain_rejected() {
        let result = service(MockTenantRepository::new()).create(&staff(), input("blue sky!", None)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_suspend_deactivates() {
        let tenant = Tenant::new("Blue".into(), "blue".into()).unwrap();
        let id = tenant.id;
        let mut repo = MockTenantRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        repo.expect_update().returning(|t| Ok(t.clone()));
        let suspended = service(repo).suspend(&staff(), &id).await.unwrap();
        assert_eq!(suspended.status, TenantStatus::Suspended);
        assert!(!suspended.is_active);
    }

    #[tokio::test]
    async fn test_tenant_user_cannot_list_tenants() {
        let user = User::new("adv".into(), "adv@example.com".into(), "h".into(), RoleName::ClientAdmin, Some(Uuid::new_v4()))
            .unwrap();
        let principal = Principal::new(user, ["view_tenants".to_string()].into_iter().collect(), RequestMeta::default());
        let result = service(MockTenantRepository::new())
            .list(&principal, &TenantFilter::default(), Pagination::default())
            .await;
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }
}
