// ============================================================================
// TravelDesk Core - Password Reset
// File: crates/traveldesk-core/src/services/password_reset.rs
// Description: Emailed single-use links for setting a forgotten password
// ============================================================================

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use traveldesk_security::password::PasswordService;
use traveldesk_security::token::{fingerprint, generate_url_safe_token};
use traveldesk_shared::constants::PASSWORD_RESET_KEY_PREFIX;
use traveldesk_shared::utils::mask_email;

use crate::domain::{AuditAction, AuditLog, RequestMeta};
use crate::error::DomainError;
use crate::repositories::{TokenStore, UserRepository};
use crate::services::audit_service::AuditService;
use crate::services::email_service::TenantEmailService;

const TOKEN_BYTES: usize = 32;

/// Payload stored under `pwd_reset:{token}`. The stamp ties the link to the
/// password it was issued for, so any later password change voids it.
#[derive(Debug, Serialize, Deserialize)]
struct ResetTicket {
    user_id: Uuid,
    stamp: String,
}

pub struct PasswordResetService {
    store: Arc<dyn TokenStore>,
    user_repo: Arc<dyn UserRepository>,
    email: Arc<TenantEmailService>,
    audit: Arc<AuditService>,
    ttl: Duration,
    reset_url: String,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        user_repo: Arc<dyn UserRepository>,
        email: Arc<TenantEmailService>,
        audit: Arc<AuditService>,
        ttl_hours: i64,
        reset_url: &str,
    ) -> Self {
        Self {
            store,
            user_repo,
            email,
            audit,
            ttl: Duration::hours(ttl_hours),
            reset_url: reset_url.trim_end_matches('/').to_string(),
        }
    }

    fn key(token: &str) -> String {
        format!("{}{}", PASSWORD_RESET_KEY_PREFIX, token)
    }

    /// Emails a reset link to the active user with this address. Unknown
    /// addresses succeed silently so the endpoint does not reveal accounts.
    pub async fn request(&self, email: &str) -> Result<(), DomainError> {
        let email = email.trim().to_lowercase();
        let user = match self.user_repo.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                info!("Password reset requested for unknown or inactive {}", mask_email(&email));
                return Ok(());
            }
        };

        let token = generate_url_safe_token(TOKEN_BYTES);
        let ticket = ResetTicket { user_id: user.id, stamp: fingerprint(&user.password_hash) };
        let payload = serde_json::to_string(&ticket).map_err(|e| DomainError::InternalError(e.to_string()))?;
        let ttl_secs = u64::try_from(self.ttl.num_seconds()).unwrap_or(0);
        self.store.set(&Self::key(&token), &payload, ttl_secs).await?;

        let context = json!({
            "recipient_name": user.display_name(),
            "username": user.username,
            "reset_url": format!("{}?token={}", self.reset_url, token),
            "expires_hours": self.ttl.num_hours(),
        });
        match self
            .email
            .send_system_email(&user.email, "Reset your TravelDesk password", "password_reset", context)
            .await
        {
            Ok(true) => info!("Password reset link {} sent to {}", fingerprint(&token), mask_email(&user.email)),
            Ok(false) => warn!("Password reset email to {} was not accepted", mask_email(&user.email)),
            Err(e) => warn!("Password reset email to {} failed: {}", mask_email(&user.email), e),
        }
        Ok(())
    }

    /// Sets the new password and consumes the link.
    pub async fn confirm(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
        meta: RequestMeta,
    ) -> Result<(), DomainError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DomainError::InvalidResetToken);
        }
        let raw = self
            .store
            .get(&Self::key(token))
            .await?
            .ok_or(DomainError::InvalidResetToken)?;
        let ticket: ResetTicket = serde_json::from_str(&raw).map_err(|e| {
            warn!("Discarding malformed reset token {}: {}", fingerprint(token), e);
            DomainError::InvalidResetToken
        })?;

        let mut user = self
            .user_repo
            .find_by_id(&ticket.user_id)
            .await?
            .filter(|u| u.is_active && fingerprint(&u.password_hash) == ticket.stamp)
            .ok_or(DomainError::InvalidResetToken)?;

        if new_password != confirm_password {
            return Err(DomainError::PasswordMismatch);
        }
        PasswordService::validate_strength(new_password, &[&user.username, &user.email])?;
        user.password_hash = PasswordService::hash(new_password)?;
        user.updated_at = Utc::now();
        self.user_repo.update(&user).await?;
        self.store.delete(&Self::key(token)).await?;

        self.audit
            .record(
                AuditLog::new(AuditAction::PasswordReset)
                    .user(user.id, user.tenant_id)
                    .meta(&meta)
                    .resource("user", user.id)
                    .detail("action", "password_reset_completed"),
            )
            .await;
        info!("Password reset completed for: {}", user.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::domain::{RoleName, User};
    use crate::repositories::{
        MockAuditLogRepository, MockClientRepository, MockCommunicationRepository, MockEmailTransport,
        MockTenantRepository, MockTokenStore, MockUserRepository,
    };
    use traveldesk_shared::config::{EmailSettings, EmailTransportKind};

    const NEW_PASSWORD: &str = "Plum-Tangerine-Voyage-42";

    fn email_settings() -> EmailSettings {
        EmailSettings {
            transport: EmailTransportKind::Log,
            mailgun_api_key: String::new(),
            mailgun_domain: String::new(),
            mailgun_api_base: String::new(),
            multi_domain_enabled: false,
            development_domain: "mail.traveldesk.app".into(),
            base_domain: "traveldesk.app".into(),
            default_domain: "traveldesk.app".into(),
            default_from_email: "noreply@traveldesk.app".into(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }

    fn email(transport: MockEmailTransport) -> Arc<TenantEmailService> {
        Arc::new(
            TenantEmailService::new(
                Arc::new(transport),
                Arc::new(MockCommunicationRepository::new()),
                Arc::new(MockClientRepository::new()),
                Arc::new(MockTenantRepository::new()),
                &email_settings(),
                true,
            )
            .unwrap(),
        )
    }

    fn audit(expected: usize) -> Arc<AuditService> {
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert()
            .withf(|e| e.action == AuditAction::PasswordReset)
            .times(expected)
            .returning(|_| Ok(()));
        Arc::new(AuditService::new(Arc::new(repo)))
    }

    type Shared = Arc<Mutex<HashMap<String, String>>>;

    fn memory_store(data: Shared) -> MockTokenStore {
        let mut store = MockTokenStore::new();
        let d = data.clone();
        store.expect_set().returning(move |k, v, _| {
            d.lock().unwrap().insert(k.to_string(), v.to_string());
            Ok(())
        });
        let d = data.clone();
        store.expect_get().returning(move |k| Ok(d.lock().unwrap().get(k).cloned()));
        store.expect_delete().returning(move |k| {
            data.lock().unwrap().remove(k);
            Ok(())
        });
        store
    }

    fn stored_user() -> User {
        let hash = PasswordService::hash("Old-Passphrase-Long-7").unwrap();
        User::new("advisor".into(), "advisor@example.com".into(), hash, RoleName::ClientUser, Some(Uuid::new_v4())).unwrap()
    }

    fn token_from(body: &str) -> String {
        body.split("token=")
            .nth(1)
            .map(|rest| rest.chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_').collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_unknown_email_sends_nothing() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let mut store = MockTokenStore::new();
        store.expect_set().never();
        let mut transport = MockEmailTransport::new();
        transport.expect_send().never();

        let svc = PasswordResetService::new(
            Arc::new(store),
            Arc::new(users),
            email(transport),
            audit(0),
            72,
            "https://app.traveldesk.app/reset-password",
        );
        svc.request("ghost@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_link_resets_password_once() {
        let user = stored_user();
        let saved: Arc<Mutex<Option<User>>> = Arc::default();
        let data: Shared = Arc::default();
        let sent: Arc<Mutex<String>> = Arc::default();

        let mut users = MockUserRepository::new();
        let found = user.clone();
        users.expect_find_by_email().returning(move |_| Ok(Some(found.clone())));
        let current = user.clone();
        let latest = saved.clone();
        users.expect_find_by_id().returning(move |_| {
            Ok(Some(latest.lock().unwrap().clone().unwrap_or_else(|| current.clone())))
        });
        let store_to = saved.clone();
        users.expect_update().times(1).returning(move |u| {
            *store_to.lock().unwrap() = Some(u.clone());
            Ok(u.clone())
        });

        let mut transport = MockEmailTransport::new();
        let body = sent.clone();
        transport
            .expect_send()
            .withf(|m| m.subject == "Reset your TravelDesk password" && m.to == vec!["advisor@example.com".to_string()])
            .times(1)
            .returning(move |m| {
                *body.lock().unwrap() = m.text.clone();
                Ok(true)
            });

        let svc = PasswordResetService::new(
            Arc::new(memory_store(data.clone())),
            Arc::new(users),
            email(transport),
            audit(1),
            72,
            "https://app.traveldesk.app/reset-password/",
        );
        svc.request(" Advisor@Example.com ").await.unwrap();
        assert_eq!(data.lock().unwrap().len(), 1);

        let text = sent.lock().unwrap().clone();
        assert!(text.contains("https://app.traveldesk.app/reset-password?token="));
        let token = token_from(&text);
        assert_eq!(token.len(), 43);

        svc.confirm(&token, NEW_PASSWORD, NEW_PASSWORD, RequestMeta::default()).await.unwrap();
        let updated = saved.lock().unwrap().clone().unwrap();
        assert!(PasswordService::verify(NEW_PASSWORD, &updated.password_hash).unwrap());
        assert!(data.lock().unwrap().is_empty());

        let again = svc.confirm(&token, NEW_PASSWORD, NEW_PASSWORD, RequestMeta::default()).await;
        assert!(matches!(again, Err(DomainError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_link_void_after_password_change() {
        let user = stored_user();
        let mut changed = user.clone();
        changed.password_hash = PasswordService::hash("Another-Passphrase-9").unwrap();

        let data: Shared = Arc::default();
        let ticket = ResetTicket { user_id: user.id, stamp: fingerprint(&user.password_hash) };
        data.lock()
            .unwrap()
            .insert(PasswordResetService::key("tok"), serde_json::to_string(&ticket).unwrap());

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(changed.clone())));
        users.expect_update().never();

        let svc = PasswordResetService::new(
            Arc::new(memory_store(data)),
            Arc::new(users),
            email(MockEmailTransport::new()),
            audit(0),
            72,
            "https://app.traveldesk.app/reset-password",
        );
        let result = svc.confirm("tok", NEW_PASSWORD, NEW_PASSWORD, RequestMeta::default()).await;
        assert!(matches!(result, Err(DomainError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let svc = PasswordResetService::new(
            Arc::new(memory_store(Arc::default())),
            Arc::new(MockUserRepository::new()),
            email(MockEmailTransport::new()),
            audit(0),
            72,
            "https://app.traveldesk.app/reset-password",
        );
        let result = svc.confirm("missing", NEW_PASSWORD, NEW_PASSWORD, RequestMeta::default()).await;
        assert!(matches!(result, Err(DomainError::InvalidResetToken)));
    }
}
