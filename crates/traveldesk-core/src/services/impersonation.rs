// ============================================================================
// TravelDesk Core - Impersonation
// File: crates/traveldesk-core/src/services/impersonation.rs
// Description: Time-limited tokens that let staff act as another user
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use traveldesk_security::token::{fingerprint, generate_url_safe_token};
use traveldesk_shared::constants::IMPERSONATION_KEY_PREFIX;

use crate::domain::{AuditAction, AuditLog, Principal, RoleName, User};
use crate::error::DomainError;
use crate::repositories::{TenantRepository, TokenStore, UserRepository};
use crate::services::audit_service::AuditService;

const TOKEN_BYTES: usize = 32;

/// Payload stored under `imp_token:{token}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpersonationSession {
    pub original_user_id: Uuid,
    pub target_user_id: Uuid,
    pub original_username: String,
    pub target_username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ImpersonationSession {
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }
}

pub struct ImpersonationTokenManager {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl ImpersonationTokenManager {
    pub fn new(store: Arc<dyn TokenStore>, ttl_hours: i64) -> Self {
        Self { store, ttl: Duration::hours(ttl_hours) }
    }

    fn key(token: &str) -> String {
        format!("{}{}", IMPERSONATION_KEY_PREFIX, token)
    }

    async fn write(&self, token: &str, session: &ImpersonationSession, ttl: Duration) -> Result<(), DomainError> {
        let payload = serde_json::to_string(session).map_err(|e| DomainError::InternalError(e.to_string()))?;
        let ttl_secs = u64::try_from(ttl.num_seconds()).unwrap_or(0);
        self.store.set(&Self::key(token), &payload, ttl_secs).await
    }

    pub async fn create(&self, original: &User, target: &User) -> Result<(String, ImpersonationSession), DomainError> {
        let token = generate_url_safe_token(TOKEN_BYTES);
        let now = Utc::now();
        let session = ImpersonationSession {
            original_user_id: original.id,
            target_user_id: target.id,
            original_username: original.username.clone(),
            target_username: target.username.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.write(&token, &session, self.ttl).await?;
        info!(
            "Created impersonation token for {} -> {}",
            original.username, target.username
        );
        Ok((token, session))
    }

    /// Missing, malformed and expired tokens all read as `None`; the last two are removed.
    pub async fn get(&self, token: &str) -> Result<Option<ImpersonationSession>, DomainError> {
        if token.is_empty() {
            return Ok(None);
        }
        let Some(raw) = self.store.get(&Self::key(token)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<ImpersonationSession>(&raw) {
            Ok(session) if session.expires_at > Utc::now() => Ok(Some(session)),
            Ok(_) => {
                self.invalidate(token).await?;
                Ok(None)
            }
            Err(e) => {
                warn!("Discarding malformed impersonation token {}: {}", fingerprint(token), e);
                self.invalidate(token).await?;
                Ok(None)
            }
        }
    }

    /// Pushes expiry to now + `hours`.
    pub async fn extend(&self, token: &str, hours: i64) -> Result<Option<ImpersonationSession>, DomainError> {
        let Some(mut session) = self.get(token).await? else {
            return Ok(None);
        };
        let extension = Duration::hours(hours);
        session.expires_at = Utc::now() + extension;
        self.write(token, &session, extension).await?;
        Ok(Some(session))
    }

    pub async fn invalidate(&self, token: &str) -> Result<(), DomainError> {
        self.store.delete(&Self::key(token)).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpersonationCandidate {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: RoleName,
    pub tenant_id: Option<Uuid>,
}

impl From<&User> for ImpersonationCandidate {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpersonationStarted {
    pub token: String,
    pub target: ImpersonationCandidate,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpersonationStatus {
    pub original_username: String,
    pub target_user_id: Uuid,
    pub target_username: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_minutes: i64,
}

impl From<ImpersonationSession> for ImpersonationStatus {
    fn from(s: ImpersonationSession) -> Self {
        Self {
            remaining_minutes: s.remaining_minutes(Utc::now()),
            original_username: s.original_username,
            target_user_id: s.target_user_id,
            target_username: s.target_username,
            started_at: s.created_at,
            expires_at: s.expires_at,
        }
    }
}

/// Whether `actor` may act as `target`. A `None` target asks whether the
/// actor may impersonate at all.
pub fn can_impersonate(actor: &User, target: Option<&User>) -> bool {
    if !actor.role.is_staff() {
        return false;
    }
    let Some(target) = target else {
        return true;
    };
    if actor.id == target.id {
        return false;
    }
    match actor.role {
        RoleName::SuperAdmin => true,
        RoleName::SystemAdmin => target.role != RoleName::SuperAdmin,
        RoleName::HelpdeskUser => target.role.is_tenant_role(),
        _ => false,
    }
}

pub struct ImpersonationService {
    tokens: Arc<ImpersonationTokenManager>,
    user_repo: Arc<dyn UserRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    audit: Arc<AuditService>,
    extend_hours: i64,
}

impl ImpersonationService {
    pub fn new(
        tokens: Arc<ImpersonationTokenManager>,
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        audit: Arc<AuditService>,
        extend_hours: i64,
    ) -> Self {
        Self { tokens, user_repo, tenant_repo, audit, extend_hours }
    }

    /// Users the actor may impersonate, ordered by role level then username.
    pub async fn impersonable_users(
        &self,
        principal: &Principal,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<ImpersonationCandidate>, DomainError> {
        let actor = &principal.user;
        if principal.is_impersonating() || !can_impersonate(actor, None) {
            return Err(DomainError::ImpersonationNotAllowed("staff role required".into()));
        }

        let tenant_roles: &[RoleName] = match actor.role {
            RoleName::HelpdeskUser => &[RoleName::ClientAdmin, RoleName::ClientUser],
            _ => RoleName::ALL,
        };
        let mut users = match tenant_id {
            Some(id) => {
                self.tenant_repo.find_by_id(&id).await?.ok_or(DomainError::TenantNotFound)?;
                self.user_repo.list_active_in_tenant(&id, tenant_roles).await?
            }
            None => Vec::new(),
        };
        if actor.role != RoleName::HelpdeskUser {
            users.extend(self.user_repo.list_active_system_users().await?);
        }

        users.retain(|u| can_impersonate(actor, Some(u)));
        users.sort_by(|a, b| {
            a.role
                .hierarchy_level()
                .cmp(&b.role.hierarchy_level())
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users.iter().map(ImpersonationCandidate::from).collect())
    }

    pub async fn start(&self, principal: &Principal, target_id: &Uuid) -> Result<ImpersonationStarted, DomainError> {
        if principal.is_impersonating() {
            return Err(DomainError::ImpersonationNotAllowed("already impersonating".into()));
        }
        let actor = &principal.user;

        // 1. Target and permission
        let target = self
            .user_repo
            .find_by_id(target_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        if !can_impersonate(actor, Some(&target)) {
            warn!("{} may not impersonate {}", actor.username, target.username);
            return Err(DomainError::ImpersonationNotAllowed(format!(
                "cannot impersonate {}",
                target.username
            )));
        }

        // 2. Token
        let (token, session) = self.tokens.create(actor, &target).await?;

        // 3. Audit
        let tenant_name = match target.tenant_id {
            Some(id) => self
                .tenant_repo
                .find_by_id(&id)
                .await?
                .map(|t| t.name)
                .unwrap_or_else(|| "System".to_string()),
            None => "System".to_string(),
        };
        self.audit
            .record(
                AuditLog::by(principal, AuditAction::ImpersonationStart)
                    .tenant(target.tenant_id)
                    .resource("user", target.id)
                    .detail("impersonated_user", target.username.clone())
                    .detail("impersonated_user_id", target.id.to_string())
                    .detail("role", target.role.as_str())
                    .detail("tenant", tenant_name)
                    .detail("token", fingerprint(&token)),
            )
            .await;
        info!("Impersonation started: {} -> {}", actor.username, target.username);

        Ok(ImpersonationStarted {
            token,
            target: ImpersonationCandidate::from(&target),
            expires_at: session.expires_at,
        })
    }

    /// Only the staff member who created the token may use or end it.
    async fn owned_session(&self, principal: &Principal, token: &str) -> Result<ImpersonationSession, DomainError> {
        let session = self.tokens.get(token).await?.ok_or(DomainError::ImpersonationNotFound)?;
        if session.original_user_id != principal.authenticated_user_id() {
            warn!("Impersonation token {} presented by a different user", fingerprint(token));
            return Err(DomainError::ImpersonationNotFound);
        }
        Ok(session)
    }

    pub async fn stop(&self, principal: &Principal, token: &str) -> Result<i64, DomainError> {
        let session = self.owned_session(principal, token).await?;
        let original = self
            .user_repo
            .find_by_id(&session.original_user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;
        let target_tenant = match self.user_repo.find_by_id(&session.target_user_id).await {
            Ok(Some(target)) => target.tenant_id,
            Ok(None) => None,
            Err(e) => {
                error!("Failed to load impersonated user: {}", e);
                None
            }
        };

        let duration_minutes = (Utc::now() - session.created_at).num_minutes();
        self.audit
            .record(
                AuditLog::new(AuditAction::ImpersonationEnd)
                    .user(original.id, target_tenant)
                    .meta(&principal.meta)
                    .resource("user", session.target_user_id)
                    .detail("impersonated_user", session.target_username.clone())
                    .detail("duration_minutes", duration_minutes)
                    .detail("token", fingerprint(token)),
            )
            .await;
        self.tokens.invalidate(token).await?;
        info!(
            "Impersonation ended: {} -> {} after {} minutes",
            session.original_username, session.target_username, duration_minutes
        );
        Ok(duration_minutes)
    }

    pub async fn status(&self, principal: &Principal, token: &str) -> Result<Option<ImpersonationStatus>, DomainError> {
        match self.owned_session(principal, token).await {
            Ok(session) => Ok(Some(session.into())),
            Err(DomainError::ImpersonationNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn extend(&self, principal: &Principal, token: &str) -> Result<ImpersonationStatus, DomainError> {
        self.owned_session(principal, token).await?;
        let session = self
            .tokens
            .extend(token, self.extend_hours)
            .await?
            .ok_or(DomainError::ImpersonationNotFound)?;
        info!("Impersonation extended until {}", session.expires_at);
        Ok(session.into())
    }

    /// Session for request substitution. Tokens created by someone other than
    /// the authenticated user are ignored.
    pub async fn resolve(&self, token: &str, authenticated_user_id: &Uuid) -> Option<ImpersonationSession> {
        match self.tokens.get(token).await {
            Ok(Some(session)) if session.original_user_id == *authenticated_user_id => Some(session),
            Ok(Some(_)) => {
                warn!("Ignoring impersonation token {} of another user", fingerprint(token));
                None
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read impersonation token: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;

    use crate::domain::{Impersonator, RequestMeta, Tenant};
    use crate::repositories::{MockAuditLogRepository, MockTenantRepository, MockTokenStore, MockUserRepository};

    fn user(name: &str, role: RoleName) -> User {
        let tenant = if role.is_tenant_role() { Some(Uuid::new_v4()) } else { None };
        User::new(name.into(), format!("{}@example.com", name), "h".into(), role, tenant).unwrap()
    }

    /// Token store mock backed by a map.
    fn memory_store() -> MockTokenStore {
        let data: Arc<Mutex<HashMap<String, String>>> = Arc::default();
        let mut store = MockTokenStore::new();
        let d = data.clone();
        store.expect_set().returning(move |k, v, _| {
            d.lock().unwrap().insert(k.to_string(), v.to_string());
            Ok(())
        });
        let d = data.clone();
        store.expect_get().returning(move |k| Ok(d.lock().unwrap().get(k).cloned()));
        let d = data;
        store.expect_delete().returning(move |k| {
            d.lock().unwrap().remove(k);
            Ok(())
        });
        store
    }

    #[test]
    fn test_can_impersonate_rules() {
        let sa = user("sa", RoleName::SuperAdmin);
        let sys = user("sys", RoleName::SystemAdmin);
        let help = user("help", RoleName::HelpdeskUser);
        let admin = user("admin", RoleName::ClientAdmin);
        let advisor = user("advisor", RoleName::ClientUser);

        assert!(can_impersonate(&sa, None));
        assert!(!can_impersonate(&admin, None));
        assert!(!can_impersonate(&sa, Some(&sa)));
        assert!(can_impersonate(&sa, Some(&sys)));
        assert!(!can_impersonate(&sys, Some(&sa)));
        assert!(can_impersonate(&sys, Some(&help)));
        assert!(!can_impersonate(&help, Some(&sys)));
        assert!(can_impersonate(&help, Some(&admin)));
        assert!(can_impersonate(&help, Some(&advisor)));
        assert!(!can_impersonate(&admin, Some(&advisor)));
    }

    #[tokio::test]
    async fn test_token_roundtrip_and_extend() {
        let manager = ImpersonationTokenManager::new(Arc::new(memory_store()), 8);
        let (token, session) = manager
            .create(&user("sa", RoleName::SuperAdmin), &user("advisor", RoleName::ClientUser))
            .await
            .unwrap();
        assert_eq!(token.len(), 43);
        assert_eq!((session.expires_at - session.created_at).num_hours(), 8);
        assert_eq!(manager.get(&token).await.unwrap(), Some(session.clone()));

        let extended = manager.extend(&token, 2).await.unwrap().unwrap();
        assert!(extended.expires_at < session.expires_at);
        assert!(extended.remaining_minutes(Utc::now()) >= 119);

        manager.invalidate(&token).await.unwrap();
        assert_eq!(manager.get(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_and_expired_tokens_are_removed() {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(|k| {
            if k.ends_with("bad") {
                Ok(Some("{not json".to_string()))
            } else {
                let past = Utc::now() - Duration::hours(1);
                Ok(Some(
                    serde_json::json!({
                        "original_user_id": Uuid::new_v4(),
                        "target_user_id": Uuid::new_v4(),
                        "original_username": "a",
                        "target_username": "b",
                        "created_at": past - Duration::hours(8),
                        "expires_at": past,
                    })
                    .to_string(),
                ))
            }
        });
        store.expect_delete().times(2).returning(|_| Ok(()));

        let manager = ImpersonationTokenManager::new(Arc::new(store), 8);
        assert_eq!(manager.get("bad").await.unwrap(), None);
        assert_eq!(manager.get("old").await.unwrap(), None);
    }

    fn service(users: MockUserRepository, tenants: MockTenantRepository, audit: MockAuditLogRepository) -> ImpersonationService {
        ImpersonationService::new(
            Arc::new(ImpersonationTokenManager::new(Arc::new(memory_store()), 8)),
            Arc::new(users),
            Arc::new(tenants),
            Arc::new(AuditService::new(Arc::new(audit))),
            2,
        )
    }

    #[tokio::test]
    async fn test_start_stop_flow() {
        let staff = user("help", RoleName::HelpdeskUser);
        let target = user("advisor", RoleName::ClientUser);
        let tenant = Tenant::new("Blue Sky".into(), "bluesky".into()).unwrap();
        let (staff_c, target_c) = (staff.clone(), target.clone());

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |id| {
            Ok([&staff_c, &target_c].into_iter().find(|u| u.id == *id).cloned())
        });
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_insert()
            .withf(|e| {
                e.action == AuditAction::ImpersonationStart
                    && e.details["tenant"] == "Blue Sky"
                    && e.details["token"].as_str().map(|t| t.len()) == Some(16)
            })
            .times(1)
            .returning(|_| Ok(()));
        audit
            .expect_insert()
            .withf(|e| e.action == AuditAction::ImpersonationEnd && e.details["duration_minutes"] == 0)
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(users, tenants, audit);
        let principal = Principal::new(staff.clone(), BTreeSet::new(), RequestMeta::default());
        let started = svc.start(&principal, &target.id).await.unwrap();
        assert_eq!(started.target.username, "advisor");

        assert!(svc.resolve(&started.token, &staff.id).await.is_some());
        assert!(svc.resolve(&started.token, &target.id).await.is_none());

        let mut impersonated = Principal::new(target.clone(), BTreeSet::new(), RequestMeta::default());
        impersonated.impersonator = Some(Impersonator {
            user_id: staff.id,
            username: staff.username.clone(),
            token: started.token.clone(),
        });
        assert!(svc.status(&impersonated, &started.token).await.unwrap().is_some());

        assert_eq!(svc.stop(&impersonated, &started.token).await.unwrap(), 0);
        assert!(svc.status(&principal, &started.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_refused_for_disallowed_target() {
        let staff = user("help", RoleName::HelpdeskUser);
        let target = user("sys", RoleName::SystemAdmin);
        let target_id = target.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(target.clone())));
        let svc = service(users, MockTenantRepository::new(), MockAuditLogRepository::new());
        let principal = Principal::new(staff, BTreeSet::new(), RequestMeta::default());
        assert!(matches!(
            svc.start(&principal, &target_id).await,
            Err(DomainError::ImpersonationNotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn test_impersonable_users_for_system_admin() {
        let actor = user("sys", RoleName::SystemAdmin);
        let actor_c = actor.clone();
        let tenant = Tenant::new("Blue Sky".into(), "bluesky".into()).unwrap();
        let tenant_id = tenant.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users
            .expect_list_active_in_tenant()
            .returning(|_, _| Ok(vec![user("zed", RoleName::ClientUser), user("amy", RoleName::ClientAdmin)]));
        users.expect_list_active_system_users().returning(move || {
            Ok(vec![user("root", RoleName::SuperAdmin), actor_c.clone(), user("desk", RoleName::HelpdeskUser)])
        });

        let svc = service(users, tenants, MockAuditLogRepository::new());
        let principal = Principal::new(actor, BTreeSet::new(), RequestMeta::default());
        let names: Vec<String> = svc
            .impersonable_users(&principal, Some(tenant_id))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.username)
            .collect();
        assert_eq!(names, vec!["desk", "amy", "zed"]);
    }
}
