// ============================================================================
// TravelDesk Core - User Administration Service
// File: crates/traveldesk-core/src/services/user_admin_service.rs
// Description: User CRUD for managers, role assignment and permission overrides
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use traveldesk_security::password::PasswordService;
use traveldesk_shared::types::{Page, Pagination};
use traveldesk_shared::utils::mask_email;

use crate::domain::permission::find_permission;
use crate::domain::{AuditAction, AuditLog, Principal, RoleInfo, RoleName, User, UserPermissionOverride};
use crate::error::DomainError;
use crate::repositories::{PermissionRepository, TenantRepository, UserFilter, UserRepository};
use crate::services::audit_service::AuditService;
use crate::services::auth_service::UserInfo;
use crate::services::rbac_service::RbacService;

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: RoleName,
    /// Ignored for client admins, who always create users in their own tenant.
    pub tenant_id: Option<Uuid>,
    pub phone: Option<String>,
    #[serde(default)]
    pub has_financial_access: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<RoleName>,
    pub is_active: Option<bool>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub has_financial_access: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRequest {
    pub codename: String,
    pub is_granted: bool,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub user: UserInfo,
    pub permissions: BTreeSet<String>,
    pub overrides: Vec<UserPermissionOverride>,
}

/// Entry of the tenant users lookup.
#[derive(Debug, Clone, Serialize)]
pub struct TenantUserSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: RoleName,
}

pub struct UserAdminService {
    user_repo: Arc<dyn UserRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    permission_repo: Arc<dyn PermissionRepository>,
    rbac: Arc<RbacService>,
    audit: Arc<AuditService>,
}

impl UserAdminService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        rbac: Arc<RbacService>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self { user_repo, tenant_repo, permission_repo, rbac, audit }
    }

    fn require_manager(principal: &Principal) -> Result<(), DomainError> {
        if principal.role().can_manage_users() {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied("user management requires an admin role".into()))
        }
    }

    /// Loads a user the manager may see. Client admins only reach their own tenant.
    async fn load_managed(&self, principal: &Principal, id: &Uuid) -> Result<User, DomainError> {
        Self::require_manager(principal)?;
        let user = self.user_repo.find_by_id(id).await?.ok_or(DomainError::UserNotFound)?;
        if !principal.is_staff() {
            let tenant_id = principal.require_tenant()?;
            if !user.belongs_to(&tenant_id) {
                return Err(DomainError::UserNotFound);
            }
        }
        Ok(user)
    }

    /// Loads a user the manager may change. Super admins are only changed by super admins.
    async fn load_for_change(&self, principal: &Principal, id: &Uuid) -> Result<User, DomainError> {
        let user = self.load_managed(principal, id).await?;
        if user.role == RoleName::SuperAdmin && principal.role() != RoleName::SuperAdmin {
            warn!("{} may not change super admin {}", principal.user.username, user.username);
            return Err(DomainError::PermissionDenied("only a super admin may change a super admin".into()));
        }
        Ok(user)
    }

    async fn ensure_seat_available(&self, tenant_id: &Uuid) -> Result<(), DomainError> {
        let tenant = self
            .tenant_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or(DomainError::TenantNotFound)?;
        if self.user_repo.count_active_in_tenant(&tenant.id).await? >= i64::from(tenant.max_users) {
            warn!("Tenant {} reached max users ({})", tenant.subdomain, tenant.max_users);
            return Err(DomainError::TenantMaxUsersReached);
        }
        Ok(())
    }

    pub async fn list(
        &self,
        principal: &Principal,
        mut filter: UserFilter,
        pagination: Pagination,
    ) -> Result<Page<UserInfo>, DomainError> {
        Self::require_manager(principal)?;
        if !principal.is_staff() {
            filter.tenant_id = Some(principal.require_tenant()?);
        }
        let page = self.user_repo.list(&filter, pagination).await?;
        Ok(page.map(|u| UserInfo::from(&u)))
    }

    pub async fn get(&self, principal: &Principal, id: &Uuid) -> Result<UserDetail, DomainError> {
        let user = self.load_managed(principal, id).await?;
        let permissions = self.rbac.effective_permissions(&user).await?;
        let overrides = self.permission_repo.list_overrides(&user.id).await?;
        Ok(UserDetail { user: UserInfo::from(&user), permissions, overrides })
    }

    pub fn assignable_roles(&self, principal: &Principal) -> Vec<RoleInfo> {
        principal.role().assignable_roles().iter().map(|r| r.info()).collect()
    }

    pub async fn create(&self, principal: &Principal, input: NewUser) -> Result<User, DomainError> {
        Self::require_manager(principal)?;
        info!("Creating user {} ({})", input.username, mask_email(&input.email));

        // 1. Role and tenant
        if !principal.role().can_assign(input.role) {
            warn!("{} may not assign role {}", principal.user.username, input.role);
            return Err(DomainError::RoleNotAssignable(input.role.to_string()));
        }
        let tenant_id = if principal.is_staff() {
            input.tenant_id
        } else {
            Some(principal.require_tenant()?)
        };
        if input.role.is_tenant_role() {
            let tenant_id = tenant_id.ok_or(DomainError::NoTenant)?;
            self.ensure_seat_available(&tenant_id).await?;
        }

        // 2. Uniqueness
        if self.user_repo.find_by_username(input.username.trim()).await?.is_some() {
            return Err(DomainError::UsernameAlreadyExists(input.username));
        }
        if self.user_repo.find_by_email(input.email.trim()).await?.is_some() {
            return Err(DomainError::EmailAlreadyExists(input.email));
        }

        // 3. Password
        if input.password != input.password_confirm {
            return Err(DomainError::PasswordMismatch);
        }
        PasswordService::validate_strength(&input.password, &[&input.username, &input.email])?;
        let hash = PasswordService::hash(&input.password)?;

        // 4. Persist
        let mut user = User::new(input.username, input.email, hash, input.role, tenant_id)?
            .with_names(&input.first_name, &input.last_name);
        user.phone = input.phone;
        user.has_financial_access = input.has_financial_access;
        user.created_by = Some(principal.id());
        let created = self.user_repo.create(&user).await?;

        self.audit
            .record(
                AuditLog::by(principal, AuditAction::UserCreate)
                    .resource("user", created.id)
                    .detail("username", created.username.clone())
                    .detail("role", created.role.as_str()),
            )
            .await;
        info!("User created: {}", created.username);
        Ok(created)
    }

    /// Staff shortcut for creating a tenant-role user in a chosen tenant.
    pub async fn create_tenant_user(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        mut input: NewUser,
    ) -> Result<User, DomainError> {
        principal.require_staff()?;
        if !input.role.is_tenant_role() {
            return Err(DomainError::RoleNotAssignable(input.role.to_string()));
        }
        input.tenant_id = Some(tenant_id);
        self.create(principal, input).await
    }

    pub async fn update(&self, principal: &Principal, id: &Uuid, changes: UserUpdate) -> Result<User, DomainError> {
        if principal.id() == *id {
            return Err(DomainError::CannotEditSelf);
        }
        let mut user = self.load_for_change(principal, id).await?;
        let previous_role = user.role;

        if let Some(email) = changes.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                if self.user_repo.find_by_email(&email).await?.is_some() {
                    return Err(DomainError::EmailAlreadyExists(email));
                }
                user.email = email;
            }
        }
        if let Some(first) = changes.first_name {
            user.first_name = first.trim().to_string();
        }
        if let Some(last) = changes.last_name {
            user.last_name = last.trim().to_string();
        }
        if let Some(active) = changes.is_active {
            if active && !user.is_active && user.role.is_tenant_role() {
                if let Some(tenant_id) = user.tenant_id {
                    self.ensure_seat_available(&tenant_id).await?;
                }
            }
            user.is_active = active;
        }
        if changes.phone.is_some() {
            user.phone = changes.phone;
        }
        if let Some(tz) = changes.timezone {
            user.timezone = tz;
        }
        if let Some(flag) = changes.has_financial_access {
            user.has_financial_access = flag;
        }
        if let Some(role) = changes.role {
            if role != user.role {
                if !principal.role().can_assign(role) {
                    return Err(DomainError::RoleNotAssignable(role.to_string()));
                }
                user.set_role(role);
            }
        }
        user.updated_at = Utc::now();
        validator::Validate::validate(&user)?;
        let updated = self.user_repo.update(&user).await?;

        self.audit
            .record(AuditLog::by(principal, AuditAction::UserUpdate).resource("user", updated.id))
            .await;
        if updated.role != previous_role {
            self.audit
                .record(
                    AuditLog::by(principal, AuditAction::RoleChange)
                        .resource("user", updated.id)
                        .detail("old_role", previous_role.as_str())
                        .detail("new_role", updated.role.as_str()),
                )
                .await;
        }
        info!("User updated: {}", updated.username);
        Ok(updated)
    }

    /// Sets another user's password. Managers change their own through the profile.
    pub async fn set_password(
        &self,
        principal: &Principal,
        id: &Uuid,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), DomainError> {
        if principal.id() == *id {
            return Err(DomainError::CannotEditSelf);
        }
        let mut user = self.load_for_change(principal, id).await?;

        if new_password != confirm_password {
            return Err(DomainError::PasswordMismatch);
        }
        PasswordService::validate_strength(new_password, &[&user.username, &user.email])?;
        user.password_hash = PasswordService::hash(new_password)?;
        user.updated_at = Utc::now();
        self.user_repo.update(&user).await?;

        self.audit
            .record(
                AuditLog::by(principal, AuditAction::PasswordReset)
                    .resource("user", user.id)
                    .detail("target_user", user.username.clone())
                    .detail("changed_by_admin", true),
            )
            .await;
        info!("Password set for {} by {}", user.username, principal.user.username);
        Ok(())
    }

    pub async fn deactivate(&self, principal: &Principal, id: &Uuid) -> Result<(), DomainError> {
        self.update(principal, id, UserUpdate { is_active: Some(false), ..Default::default() })
            .await
            .map(|_| ())
    }

    /// Active, non-staff users of a tenant.
    pub async fn tenant_users(&self, principal: &Principal, tenant_id: &Uuid) -> Result<Vec<TenantUserSummary>, DomainError> {
        if !principal.is_staff() && principal.require_tenant()? != *tenant_id {
            return Err(DomainError::TenantNotFound);
        }
        let users = self
            .user_repo
            .list_active_in_tenant(tenant_id, &[RoleName::ClientAdmin, RoleName::ClientUser])
            .await?;
        Ok(users
            .iter()
            .map(|u| TenantUserSummary {
                id: u.id,
                display_name: u.display_name(),
                email: u.email.clone(),
                role: u.role,
            })
            .collect())
    }

    pub async fn set_override(
        &self,
        principal: &Principal,
        user_id: &Uuid,
        request: OverrideRequest,
    ) -> Result<UserPermissionOverride, DomainError> {
        principal.require("manage_user_roles")?;
        let user = self.load_for_change(principal, user_id).await?;
        let def = find_permission(&request.codename)
            .ok_or_else(|| DomainError::UnknownPermission(request.codename.clone()))?;

        let ov = UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: user.id,
            codename: def.codename.to_string(),
            is_granted: request.is_granted,
            granted_by: Some(principal.id()),
            reason: request.reason,
            expires_at: request.expires_at,
            created_at: Utc::now(),
        };
        let saved = self.permission_repo.upsert_override(&ov).await?;

        let action = if saved.is_granted { AuditAction::PermissionGrant } else { AuditAction::PermissionRevoke };
        self.audit
            .record(
                AuditLog::by(principal, action)
                    .resource("user", user.id)
                    .detail("permission", saved.codename.clone())
                    .detail("reason", saved.reason.clone().unwrap_or_default()),
            )
            .await;
        info!("Permission override {} ({}) for {}", saved.codename, saved.is_granted, user.username);
        Ok(saved)
    }

    pub async fn remove_override(&self, principal: &Principal, user_id: &Uuid, codename: &str) -> Result<bool, DomainError> {
        principal.require("manage_user_roles")?;
        let user = self.load_for_change(principal, user_id).await?;
        let removed = self.permission_repo.delete_override(&user.id, codename).await?;
        if removed {
            self.audit
                .record(
                    AuditLog::by(principal, AuditAction::PermissionRevoke)
                        .resource("user", user.id)
                        .detail("permission", codename)
                        .detail("override_removed", true),
                )
                .await;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestMeta, Tenant};
    use crate::repositories::{MockAuditLogRepository, MockPermissionRepository, MockTenantRepository, MockUserRepository};

    fn principal(role: RoleName, tenant_id: Option<Uuid>, perms: &[&str]) -> Principal {
        let user = User::new("manager".into(), "manager@example.com".into(), "h".into(), role, tenant_id).unwrap();
        Principal::new(user, perms.iter().map(|p| p.to_string()).collect(), RequestMeta::default())
    }

    fn new_user(role: RoleName) -> NewUser {
        NewUser {
            username: "newbie".into(),
            email: "newbie@example.com".into(),
            password: "Plum-Tangerine-Voyage-42".into(),
            password_confirm: "Plum-Tangerine-Voyage-42".into(),
            first_name: "New".into(),
            last_name: "Bie".into(),
            role,
            tenant_id: None,
            phone: None,
            has_financial_access: false,
        }
    }

    fn audit_ok() -> Arc<AuditService> {
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert().returning(|_| Ok(()));
        Arc::new(AuditService::new(Arc::new(repo)))
    }

    fn service(users: MockUserRepository, tenants: MockTenantRepository, perms: MockPermissionRepository) -> UserAdminService {
        let perms = Arc::new(perms);
        UserAdminService::new(
            Arc::new(users),
            Arc::new(tenants),
            perms.clone(),
            Arc::new(RbacService::new(perms)),
            audit_ok(),
        )
    }

    #[tokio::test]
    async fn test_client_admin_cannot_assign_client_admin() {
        let admin = principal(RoleName::ClientAdmin, Some(Uuid::new_v4()), &[]);
        let svc = service(MockUserRepository::new(), MockTenantRepository::new(), MockPermissionRepository::new());
        let result = svc.create(&admin, new_user(RoleName::ClientAdmin)).await;
        assert!(matches!(result, Err(DomainError::RoleNotAssignable(_))));
    }

    #[tokio::test]
    async fn test_client_admin_creates_in_own_tenant() {
        let tenant = Tenant::new("Blue Sky Travel".into(), "bluesky".into()).unwrap();
        let tenant_id = tenant.id;
        let admin = principal(RoleName::ClientAdmin, Some(tenant_id), &[]);

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_count_active_in_tenant().returning(|_| Ok(1));
        users.expect_find_by_username().returning(|_| Ok(None));
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(move |u| u.tenant_id == Some(tenant_id) && u.role == RoleName::ClientUser)
            .returning(|u| Ok(u.clone()));

        let mut input = new_user(RoleName::ClientUser);
        input.tenant_id = Some(Uuid::new_v4());
        let created = service(users, tenants, MockPermissionRepository::new())
            .create(&admin, input)
            .await
            .unwrap();
        assert_eq!(created.tenant_id, Some(tenant_id));
    }

    #[tokio::test]
    async fn test_max_users_enforced() {
        let tenant = Tenant::new("Tiny".into(), "tiny".into()).unwrap();
        let admin = principal(RoleName::SystemAdmin, None, &[]);
        let tenant_id = tenant.id;
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_count_active_in_tenant().returning(|_| Ok(5));

        let mut input = new_user(RoleName::ClientUser);
        input.tenant_id = Some(tenant_id);
        let result = service(users, tenants, MockPermissionRepository::new()).create(&admin, input).await;
        assert!(matches!(result, Err(DomainError::TenantMaxUsersReached)));
    }

    #[tokio::test]
    async fn test_cannot_edit_self() {
        let admin = principal(RoleName::SystemAdmin, None, &[]);
        let id = admin.id();
        let svc = service(MockUserRepository::new(), MockTenantRepository::new(), MockPermissionRepository::new());
        assert!(matches!(
            svc.update(&admin, &id, UserUpdate::default()).await,
            Err(DomainError::CannotEditSelf)
        ));
    }

    #[tokio::test]
    async fn test_client_admin_cannot_see_other_tenant_users() {
        let admin = principal(RoleName::ClientAdmin, Some(Uuid::new_v4()), &[]);
        let other = User::new("other".into(), "other@example.com".into(), "h".into(), RoleName::ClientUser, Some(Uuid::new_v4()))
            .unwrap();
        let other_id = other.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(other.clone())));
        let svc = service(users, MockTenantRepository::new(), MockPermissionRepository::new());
        assert!(matches!(svc.get(&admin, &other_id).await, Err(DomainError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_override_rejects_unknown_permission() {
        let admin = principal(RoleName::SuperAdmin, None, &["manage_user_roles"]);
        let target = User::new("target".into(), "target@example.com".into(), "h".into(), RoleName::ClientUser, Some(Uuid::new_v4()))
            .unwrap();
        let target_id = target.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(target.clone())));
        let svc = service(users, MockTenantRepository::new(), MockPermissionRepository::new());
        let result = svc
            .set_override(
                &admin,
                &target_id,
                OverrideRequest { codename: "fly_planes".into(), is_granted: true, reason: None, expires_at: None },
            )
            .await;
        assert!(matches!(result, Err(DomainError::UnknownPermission(_))));
    }

    #[tokio::test]
    async fn test_role_change_is_audited() {
        let admin = principal(RoleName::SystemAdmin, None, &[]);
        let target = User::new("target".into(), "target@example.com".into(), "h".into(), RoleName::ClientUser, Some(Uuid::new_v4()))
            .unwrap();
        let target_id = target.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(target.clone())));
        users.expect_update().returning(|u| Ok(u.clone()));

        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo.expect_insert().withf(|e| e.action == AuditAction::UserUpdate).times(1).returning(|_| Ok(()));
        audit_repo.expect_insert().withf(|e| e.action == AuditAction::RoleChange).times(1).returning(|_| Ok(()));

        let perms = Arc::new(MockPermissionRepository::new());
        let svc = UserAdminService::new(
            Arc::new(users),
            Arc::new(MockTenantRepository::new()),
            perms.clone(),
            Arc::new(RbacService::new(perms)),
            Arc::new(AuditService::new(Arc::new(audit_repo))),
        );
        let updated = svc
            .update(&admin, &target_id, UserUpdate { role: Some(RoleName::ClientAdmin), ..Default::default() })
            .await
            .unwrap();
        assert!(updated.is_tenant_admin);
    }

    fn target(role: RoleName, tenant_id: Option<Uuid>) -> User {
        User::new("target".into(), "target@example.com".into(), "h".into(), role, tenant_id).unwrap()
    }

    #[tokio::test]
    async fn test_system_admin_cannot_change_super_admin() {
        let admin = principal(RoleName::SystemAdmin, None, &[]);
        let root = target(RoleName::SuperAdmin, None);
        let root_id = root.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(root.clone())));
        users.expect_update().never();
        let svc = service(users, MockTenantRepository::new(), MockPermissionRepository::new());

        let deactivate = svc.deactivate(&admin, &root_id).await;
        assert!(matches!(deactivate, Err(DomainError::PermissionDenied(_))));
        let reset = svc
            .set_password(&admin, &root_id, "Plum-Tangerine-Voyage-42", "Plum-Tangerine-Voyage-42")
            .await;
        assert!(matches!(reset, Err(DomainError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_super_admin_can_change_super_admin() {
        let admin = principal(RoleName::SuperAdmin, None, &[]);
        let root = target(RoleName::SuperAdmin, None);
        let root_id = root.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(root.clone())));
        users
            .expect_update()
            .withf(|u| !u.is_active)
            .times(1)
            .returning(|u| Ok(u.clone()));

        service(users, MockTenantRepository::new(), MockPermissionRepository::new())
            .deactivate(&admin, &root_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reactivation_respects_max_users() {
        let tenant = Tenant::new("Tiny".into(), "tiny".into()).unwrap();
        let admin = principal(RoleName::ClientAdmin, Some(tenant.id), &[]);
        let mut inactive = target(RoleName::ClientUser, Some(tenant.id));
        inactive.is_active = false;
        let inactive_id = inactive.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(inactive.clone())));
        users.expect_count_active_in_tenant().returning(|_| Ok(5));
        users.expect_update().never();

        let result = service(users, tenants, MockPermissionRepository::new())
            .update(&admin, &inactive_id, UserUpdate { is_active: Some(true), ..Default::default() })
            .await;
        assert!(matches!(result, Err(DomainError::TenantMaxUsersReached)));
    }

    #[tokio::test]
    async fn test_reactivation_with_free_seat() {
        let tenant = Tenant::new("Tiny".into(), "tiny".into()).unwrap();
        let admin = principal(RoleName::ClientAdmin, Some(tenant.id), &[]);
        let mut inactive = target(RoleName::ClientUser, Some(tenant.id));
        inactive.is_active = false;
        let inactive_id = inactive.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(inactive.clone())));
        users.expect_count_active_in_tenant().returning(|_| Ok(4));
        users.expect_update().times(1).returning(|u| Ok(u.clone()));

        let updated = service(users, tenants, MockPermissionRepository::new())
            .update(&admin, &inactive_id, UserUpdate { is_active: Some(true), ..Default::default() })
            .await
            .unwrap();
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn test_set_password_hashes_and_audits() {
        let tenant_id = Uuid::new_v4();
        let admin = principal(RoleName::ClientAdmin, Some(tenant_id), &[]);
        let user = target(RoleName::ClientUser, Some(tenant_id));
        let user_id = user.id;

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update()
            .withf(|u| PasswordService::verify("Plum-Tangerine-Voyage-42", &u.password_hash).unwrap_or(false))
            .times(1)
            .returning(|u| Ok(u.clone()));
        let mut audit_repo = MockAuditLogRepository::new();
        audit_repo
            .expect_insert()
            .withf(|e| e.action == AuditAction::PasswordReset && e.details["changed_by_admin"] == true)
            .times(1)
            .returning(|_| Ok(()));

        let perms = Arc::new(MockPermissionRepository::new());
        let svc = UserAdminService::new(
            Arc::new(users),
            Arc::new(MockTenantRepository::new()),
            perms.clone(),
            Arc::new(RbacService::new(perms)),
            Arc::new(AuditService::new(Arc::new(audit_repo))),
        );
        svc.set_password(&admin, &user_id, "Plum-Tangerine-Voyage-42", "Plum-Tangerine-Voyage-42")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_password_rejects_mismatch_and_self() {
        let admin = principal(RoleName::SystemAdmin, None, &[]);
        let own_id = admin.id();
        let user = target(RoleName::ClientUser, Some(Uuid::new_v4()));
        let user_id = user.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        users.expect_update().never();
        let svc = service(users, MockTenantRepository::new(), MockPermissionRepository::new());

        assert!(matches!(
            svc.set_password(&admin, &own_id, "Plum-Tangerine-Voyage-42", "Plum-Tangerine-Voyage-42").await,
            Err(DomainError::CannotEditSelf)
        ));
        assert!(matches!(
            svc.set_password(&admin, &user_id, "Plum-Tangerine-Voyage-42", "Plum-Tangerine-Voyage-43").await,
            Err(DomainError::PasswordMismatch)
        ));
    }
}
