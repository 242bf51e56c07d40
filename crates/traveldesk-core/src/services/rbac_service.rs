// ============================================================================
// TravelDesk Core - RBAC Service
// File: crates/traveldesk-core/src/services/rbac_service.rs
// Description: Permission seeding, cached role grants and effective permissions
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::permission::default_grants;
use crate::domain::user::effective_permissions;
use crate::domain::{PermissionDef, Principal, RoleInfo, RoleName, User, PERMISSION_CATALOG};
use crate::error::DomainError;
use crate::repositories::PermissionRepository;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub permissions: usize,
    pub grants_added: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleSummary {
    #[serde(flatten)]
    pub role: RoleInfo,
    pub permissions: Vec<String>,
}

pub struct RbacService {
    permission_repo: Arc<dyn PermissionRepository>,
    role_cache: DashMap<RoleName, Arc<Vec<String>>>,
}

impl RbacService {
    pub fn new(permission_repo: Arc<dyn PermissionRepository>) -> Self {
        Self {
            permission_repo,
            role_cache: DashMap::new(),
        }
    }

    /// Idempotently stores the permission catalog and every role's default grants.
    pub async fn seed(&self, granted_by: Option<uuid::Uuid>) -> Result<SeedReport, DomainError> {
        let mut report = SeedReport::default();

        // 1. Permissions
        for def in PERMISSION_CATALOG {
            self.permission_repo.upsert_permission(def).await?;
            report.permissions += 1;
        }

        // 2. Role grants
        for role in RoleName::ALL {
            for codename in default_grants(*role) {
                if self.permission_repo.grant_to_role(*role, codename, granted_by).await? {
                    report.grants_added += 1;
                }
            }
        }

        self.invalidate_role_cache();
        info!(
            "RBAC seeded: {} permissions, {} new role grants",
            report.permissions, report.grants_added
        );
        Ok(report)
    }

    /// Seeding through the API is reserved to super admins.
    pub async fn seed_as(&self, principal: &Principal) -> Result<SeedReport, DomainError> {
        if principal.role() != RoleName::SuperAdmin {
            warn!("RBAC seed refused for {}", principal.user.username);
            return Err(DomainError::PermissionDenied("super admin required".into()));
        }
        self.seed(Some(principal.id())).await
    }

    pub async fn role_permissions(&self, role: RoleName) -> Result<Arc<Vec<String>>, DomainError> {
        if let Some(cached) = self.role_cache.get(&role) {
            return Ok(cached.clone());
        }
        let grants = Arc::new(self.permission_repo.role_grants(role).await?);
        self.role_cache.insert(role, grants.clone());
        Ok(grants)
    }

    pub fn invalidate_role_cache(&self) {
        self.role_cache.clear();
    }

    pub async fn effective_permissions(&self, user: &User) -> Result<BTreeSet<String>, DomainError> {
        let grants = self.role_permissions(user.role).await?;
        let overrides = self.permission_repo.list_overrides(&user.id).await?;
        Ok(effective_permissions(
            grants.iter().map(String::as_str),
            &overrides,
            Utc::now(),
        ))
    }

    pub fn catalog(&self) -> &'static [PermissionDef] {
        PERMISSION_CATALOG
    }

    pub async fn roles(&self) -> Result<Vec<RoleSummary>, DomainError> {
        let mut roles = Vec::with_capacity(RoleName::ALL.len());
        for role in RoleName::ALL {
            let permissions = self.role_permissions(*role).await?;
            roles.push(RoleSummary {
                role: role.info(),
                permissions: permissions.as_ref().clone(),
            });
        }
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockPermissionRepository;

    #[tokio::test]
    async fn test_seed_upserts_catalog_and_counts_new_grants() {
        let mut repo = MockPermissionRepository::new();
        repo.expect_upsert_permission()
            .times(PERMISSION_CATALOG.len())
            .returning(|_| Ok(()));
        repo.expect_grant_to_role()
            .returning(|role, _, _| Ok(role == RoleName::SuperAdmin));

        let service = RbacService::new(Arc::new(repo));
        let report = service.seed(None).await.unwrap();

        assert_eq!(report.permissions, PERMISSION_CATALOG.len());
        assert_eq!(report.grants_added, PERMISSION_CATALOG.len());
    }

    #[tokio::test]
    async fn test_role_grants_are_cached() {
        let mut repo = MockPermissionRepository::new();
        repo.expect_role_grants()
            .times(1)
            .returning(|_| Ok(vec!["view_crm".to_string()]));

        let service = RbacService::new(Arc::new(repo));
        let first = service.role_permissions(RoleName::ClientUser).await.unwrap();
        let second = service.role_permissions(RoleName::ClientUser).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_effective_permissions_apply_overrides() {
        let user = User::new("advisor".into(), "advisor@example.com".into(), "h".into(), RoleName::ClientUser, None)
            .unwrap();
        let user_id = user.id;

        let mut repo = MockPermissionRepository::new();
        repo.expect_role_grants()
            .returning(|_| Ok(vec!["view_crm".to_string(), "view_trips".to_string()]));
        repo.expect_list_overrides().returning(move |_| {
            Ok(vec![crate::domain::UserPermissionOverride {
                id: uuid::Uuid::new_v4(),
                user_id,
                codename: "view_trips".into(),
                is_granted: false,
                granted_by: None,
                reason: None,
                expires_at: None,
                created_at: Utc::now(),
            }])
        });

        let service = RbacService::new(Arc::new(repo));
        let perms = service.effective_permissions(&user).await.unwrap();
        assert!(perms.contains("view_crm"));
        assert!(!perms.contains("view_trips"));
    }

    #[tokio::test]
    async fn test_seed_as_requires_super_admin() {
        let repo = MockPermissionRepository::new();
        let service = RbacService::new(Arc::new(repo));
        let user = User::new("helper".into(), "helper@example.com".into(), "h".into(), RoleName::SystemAdmin, None)
            .unwrap();
        let principal = Principal::new(user, BTreeSet::new(), Default::default());
        assert!(matches!(
            service.seed_as(&principal).await,
            Err(DomainError::PermissionDenied(_))
        ));
    }
}
