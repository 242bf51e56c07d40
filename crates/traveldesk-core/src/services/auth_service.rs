// ============================================================================
// TravelDesk Core - Authentication Service
// File: crates/traveldesk-core/src/services/auth_service.rs
// ============================================================================
//! Login, logout, own profile and password, request principal resolution

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use traveldesk_security::jwt::JwtService;
use traveldesk_security::password::PasswordService;
use traveldesk_shared::utils::mask_email;

use crate::domain::{AuditAction, AuditLog, Principal, RequestMeta, RoleName, User};
use crate::error::DomainError;
use crate::repositories::UserRepository;
use crate::services::audit_service::AuditService;
use crate::services::rbac_service::RbacService;

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    rbac: Arc<RbacService>,
    audit: Arc<AuditService>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        rbac: Arc<RbacService>,
        audit: Arc<AuditService>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self { user_repo, rbac, audit, jwt }
    }

    /// Login with username or email and password
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        meta: RequestMeta,
    ) -> Result<LoginResult, DomainError> {
        let identifier = identifier.trim();
        info!("Login attempt for: {}", mask_email(identifier));

        // 1. Find user
        let user = self.user_repo.find_by_login(identifier).await?.ok_or_else(|| {
            warn!("Login failed: unknown user {}", mask_email(identifier));
            DomainError::InvalidCredentials
        })?;

        // 2. Verify password
        let valid = PasswordService::verify(password, &user.password_hash)
            .map_err(|_| DomainError::InvalidCredentials)?;
        if !valid {
            warn!("Login failed: invalid password for {}", user.username);
            return Err(DomainError::InvalidCredentials);
        }

        // 3. Check account state
        if !user.is_active {
            warn!("Login failed: user {} is not active", user.username);
            return Err(DomainError::UserNotActive);
        }

        // 4. Issue access token
        let access_token = self
            .jwt
            .generate_access_token(&user.id, user.role.as_str(), user.tenant_id.as_ref())
            .map_err(|e| DomainError::TokenGenerationError(e.to_string()))?;

        // 5. Record login
        let mut user = user;
        user.record_login(meta.ip);
        if let Err(e) = self.user_repo.update(&user).await {
            error!("Failed to update last login for {}: {}", user.username, e);
        }

        self.audit
            .record(
                AuditLog::new(AuditAction::Login)
                    .user(user.id, user.tenant_id)
                    .meta(&meta)
                    .detail("login_method", "password"),
            )
            .await;

        info!("Login successful for: {}", user.username);

        Ok(LoginResult {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry(),
            user: UserInfo::from(&user),
        })
    }

    /// Loads the acting user of an authenticated request with their effective permissions.
    pub async fn principal_for(&self, user_id: &Uuid, meta: RequestMeta) -> Result<Principal, DomainError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        if !user.is_active {
            return Err(DomainError::UserNotActive);
        }
        let permissions = self.rbac.effective_permissions(&user).await?;
        Ok(Principal::new(user, permissions, meta))
    }

    pub async fn logout(&self, principal: &Principal) {
        self.audit
            .record(AuditLog::by(principal, AuditAction::Logout))
            .await;
        info!("Logout for: {}", principal.user.username);
    }

    pub async fn change_password(
        &self,
        principal: &Principal,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), DomainError> {
        // 1. Verify the current password
        let mut user = self
            .user_repo
            .find_by_id(&principal.id())
            .await?
            .ok_or(DomainError::UserNotFound)?;
        if !PasswordService::verify(current_password, &user.password_hash)? {
            warn!("Password change refused for {}: wrong current password", user.username);
            return Err(DomainError::InvalidCredentials);
        }

        // 2. Validate the new one
        if new_password != confirm_password {
            return Err(DomainError::PasswordMismatch);
        }
        PasswordService::validate_strength(new_password, &[&user.username, &user.email])?;

        // 3. Store
        user.password_hash = PasswordService::hash(new_password)?;
        user.updated_at = Utc::now();
        self.user_repo.update(&user).await?;

        self.audit
            .record(AuditLog::by(principal, AuditAction::PasswordReset).resource("user", user.id))
            .await;
        info!("Password changed for: {}", user.username);
        Ok(())
    }

    /// Edits the caller's own contact details. Role, tenant and access flags stay untouched.
    pub async fn update_profile(&self, principal: &Principal, changes: ProfileUpdate) -> Result<UserInfo, DomainError> {
        let mut user = self
            .user_repo
            .find_by_id(&principal.id())
            .await?
            .ok_or(DomainError::UserNotFound)?;
        let mut fields_updated = Vec::new();

        if let Some(email) = changes.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                if let Some(other) = self.user_repo.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(DomainError::EmailAlreadyExists(email));
                    }
                }
                user.email = email;
                fields_updated.push("email");
            }
        }
        if let Some(first) = changes.first_name {
            user.first_name = first.trim().to_string();
            fields_updated.push("first_name");
        }
        if let Some(last) = changes.last_name {
            user.last_name = last.trim().to_string();
            fields_updated.push("last_name");
        }
        if changes.phone.is_some() {
            user.phone = changes.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
            fields_updated.push("phone");
        }
        if let Some(tz) = changes.timezone.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            user.timezone = tz;
            fields_updated.push("timezone");
        }

        user.updated_at = Utc::now();
        validator::Validate::validate(&user)?;
        let updated = self.user_repo.update(&user).await?;

        self.audit
            .record(
                AuditLog::by(principal, AuditAction::UserUpdate)
                    .resource("user_profile", updated.id)
                    .detail("fields_updated", fields_updated),
            )
            .await;
        info!("Profile updated for: {}", updated.username);
        Ok(UserInfo::from(&updated))
    }

    pub fn me(&self, principal: &Principal) -> MeResult {
        MeResult {
            user: UserInfo::from(&principal.user),
            permissions: principal.permissions.clone(),
            can_access_financial_data: principal.can_access_financial_data(),
            is_impersonating: principal.is_impersonating(),
            impersonated_by: principal.impersonator.as_ref().map(|i| i.username.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
}

/// Result of successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResult {
    pub user: UserInfo,
    pub permissions: BTreeSet<String>,
    pub can_access_financial_data: bool,
    pub is_impersonating: bool,
    pub impersonated_by: Option<String>,
}

/// User info returned in auth and admin responses
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub role: RoleName,
    pub role_display: &'static str,
    pub tenant_id: Option<Uuid>,
    pub is_active: bool,
    pub is_tenant_admin: bool,
    pub has_financial_access: bool,
    pub phone: Option<String>,
    pub timezone: String,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            display_name: user.display_name(),
            role: user.role,
            role_display: user.role.label(),
            tenant_id: user.tenant_id,
            is_active: user.is_active,
            is_tenant_admin: user.is_tenant_admin,
            has_financial_access: user.has_financial_access,
            phone: user.phone.clone(),
            timezone: user.timezone.clone(),
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MockAuditLogRepository, MockPermissionRepository, MockUserRepository};

    const PASSWORD: &str = "Correct-Horse-Battery-9";

    fn stored_user(active: bool) -> User {
        let hash = PasswordService::hash(PASSWORD).unwrap();
        let mut user = User::new("advisor".into(), "advisor@example.com".into(), hash, RoleName::ClientAdmin, Some(Uuid::new_v4()))
            .unwrap();
        user.is_active = active;
        user
    }

    fn service(user_repo: MockUserRepository, audit_repo: MockAuditLogRepository) -> AuthService {
        let mut perms = MockPermissionRepository::new();
        perms.expect_role_grants().returning(|_| Ok(vec!["view_crm".into()]));
        perms.expect_list_overrides().returning(|_| Ok(vec![]));
        AuthService::new(
            Arc::new(user_repo),
            Arc::new(RbacService::new(Arc::new(perms))),
            Arc::new(AuditService::new(Arc::new(audit_repo))),
            Arc::new(JwtService::new("test-secret-test-secret-test-secret", 3600)),
        )
    }

    #[tokio::test]
    async fn test_login_success_records_audit_and_last_login() {
        let user = stored_user(true);
        let mut users = MockUserRepository::new();
        let found = user.clone();
        users.expect_find_by_login().returning(move |_| Ok(Some(found.clone())));
        users
            .expect_update()
            .withf(|u| u.last_login.is_some() && u.last_login_ip.is_some())
            .returning(|u| Ok(u.clone()));

        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_insert()
            .withf(|e| e.action == AuditAction::Login && e.details["login_method"] == "password")
            .times(1)
            .returning(|_| Ok(()));

        let meta = RequestMeta { ip: Some("203.0.113.9".parse().unwrap()), user_agent: None };
        let result = service(users, audit).login("advisor", PASSWORD, meta).await.unwrap();
        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.user.username, "advisor");
        assert!(!result.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_invalid_credentials() {
        let user = stored_user(true);
        let mut users = MockUserRepository::new();
        users.expect_find_by_login().returning(move |_| Ok(Some(user.clone())));

        let result = service(users, MockAuditLogRepository::new())
            .login("advisor", "wrong-password", RequestMeta::default())
            .await;
        assert!(matches!(result, Err(DomainError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_invalid_credentials() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_login().returning(|_| Ok(None));
        let result = service(users, MockAuditLogRepository::new())
            .login("ghost@example.com", PASSWORD, RequestMeta::default())
            .await;
        assert!(matches!(result, Err(DomainError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_inactive_user() {
        let user = stored_user(false);
        let mut users = MockUserRepository::new();
        users.expect_find_by_login().returning(move |_| Ok(Some(user.clone())));
        let result = service(users, MockAuditLogRepository::new())
            .login("advisor", PASSWORD, RequestMeta::default())
            .await;
        assert!(matches!(result, Err(DomainError::UserNotActive)));
    }

    #[tokio::test]
    async fn test_principal_for_loads_permissions() {
        let user = stored_user(true);
        let id = user.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));

        let principal = service(users, MockAuditLogRepository::new())
            .principal_for(&id, RequestMeta::default())
            .await
            .unwrap();
        assert!(principal.has_permission("view_crm"));
        assert!(!principal.is_impersonating());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_email() {
        let user = stored_user(true);
        let principal = Principal::new(user.clone(), BTreeSet::new(), RequestMeta::default());
        let other = User::new("other".into(), "taken@example.com".into(), "h".into(), RoleName::ClientUser, user.tenant_id)
            .unwrap();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        users.expect_find_by_email().returning(move |_| Ok(Some(other.clone())));
        users.expect_update().never();

        let changes = ProfileUpdate { email: Some(" Taken@Example.com ".into()), ..Default::default() };
        let result = service(users, MockAuditLogRepository::new())
            .update_profile(&principal, changes)
            .await;
        assert!(matches!(result, Err(DomainError::EmailAlreadyExists(e)) if e == "taken@example.com"));
    }

    #[tokio::test]
    async fn test_update_profile_saves_contact_details_only() {
        let user = stored_user(true);
        let principal = Principal::new(user.clone(), BTreeSet::new(), RequestMeta::default());
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_update()
            .withf(|u| {
                u.email == "new@example.com"
                    && u.first_name == "Ana"
                    && u.timezone == "America/Denver"
                    && u.role == RoleName::ClientAdmin
            })
            .times(1)
            .returning(|u| Ok(u.clone()));
        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_insert()
            .withf(|e| e.action == AuditAction::UserUpdate && e.details["fields_updated"].as_array().map(|a| a.len()) == Some(3))
            .times(1)
            .returning(|_| Ok(()));

        let changes = ProfileUpdate {
            first_name: Some(" Ana ".into()),
            email: Some("new@example.com".into()),
            timezone: Some("America/Denver".into()),
            ..Default::default()
        };
        let info = service(users, audit).update_profile(&principal, changes).await.unwrap();
        assert_eq!(info.email, "new@example.com");
        assert_eq!(info.first_name, "Ana");
    }

    #[tokio::test]
    async fn test_change_password_rejects_mismatch() {
        let user = stored_user(true);
        let principal = Principal::new(user.clone(), BTreeSet::new(), RequestMeta::default());
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));

        let result = service(users, MockAuditLogRepository::new())
            .change_password(&principal, PASSWORD, "N3w-Passphrase-Long", "different")
            .await;
        assert!(matches!(result, Err(DomainError::PasswordMismatch)));
    }
}
