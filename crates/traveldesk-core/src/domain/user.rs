//! User domain entity and per-user permission overrides

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use traveldesk_shared::constants::DEFAULT_TIMEZONE;

use super::role::RoleName;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: Uuid,
    /// None for platform staff.
    pub tenant_id: Option<Uuid>,

    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,

    pub role: RoleName,
    pub is_active: bool,
    pub is_tenant_admin: bool,
    pub mfa_enabled: bool,
    pub phone: Option<String>,
    pub timezone: String,
    pub has_financial_access: bool,

    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: Option<IpAddr>,

    // Audit
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        role: RoleName,
        tenant_id: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let user = Self {
            id: Uuid::new_v4(),
            tenant_id: if role.is_system_role() { None } else { tenant_id },
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            first_name: String::new(),
            last_name: String::new(),
            role,
            is_active: true,
            is_tenant_admin: role == RoleName::ClientAdmin,
            mfa_enabled: false,
            phone: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            has_financial_access: false,
            last_login: None,
            last_login_ip: None,
            created_at: now,
            created_by: None,
            updated_at: now,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn with_names(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.trim().to_string();
        self.last_name = last_name.trim().to_string();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Full name, falling back to the username.
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }

    pub fn is_system_user(&self) -> bool {
        self.role.is_system_role()
    }

    pub fn belongs_to(&self, tenant_id: &Uuid) -> bool {
        self.tenant_id.as_ref() == Some(tenant_id)
    }

    pub fn set_role(&mut self, role: RoleName) {
        self.role = role;
        self.is_tenant_admin = role == RoleName::ClientAdmin;
        if role.is_system_role() {
            self.tenant_id = None;
        }
        self.updated_at = Utc::now();
    }

    pub fn record_login(&mut self, ip: Option<IpAddr>) {
        self.last_login = Some(Utc::now());
        self.last_login_ip = ip;
    }
}

/// Explicit grant or revocation of one permission for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPermissionOverride {
    pub id: Uuid,
    pub user_id: Uuid,
    pub codename: String,
    pub is_granted: bool,
    pub granted_by: Option<Uuid>,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserPermissionOverride {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

/// Role grants adjusted by the user's active overrides.
pub fn effective_permissions<'a, I>(
    role_grants: I,
    overrides: &[UserPermissionOverride],
    now: DateTime<Utc>,
) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut set: BTreeSet<String> = role_grants.into_iter().map(str::to_string).collect();
    for ov in overrides.iter().filter(|o| o.is_active_at(now)) {
        if ov.is_granted {
            set.insert(ov.codename.clone());
        } else {
            set.remove(&ov.codename);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(role: RoleName) -> User {
        User::new("jdoe".into(), "JDoe@Example.com ".into(), "hash".into(), role, Some(Uuid::new_v4()))
            .unwrap()
    }

    fn override_for(codename: &str, granted: bool, expires_at: Option<DateTime<Utc>>) -> UserPermissionOverride {
        UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            codename: codename.into(),
            is_granted: granted,
            granted_by: None,
            reason: None,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_user_normalizes_email() {
        let u = user(RoleName::ClientUser);
        assert_eq!(u.email, "jdoe@example.com");
        assert_eq!(u.timezone, "UTC");
        assert!(u.is_active);
    }

    #[test]
    fn test_staff_users_have_no_tenant() {
        let u = user(RoleName::HelpdeskUser);
        assert!(u.tenant_id.is_none());
        assert!(u.is_system_user());
    }

    #[test]
    fn test_invalid_email_rejected() {
        assert!(User::new("jdoe".into(), "nope".into(), "h".into(), RoleName::ClientUser, None).is_err());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let u = user(RoleName::ClientUser);
        assert_eq!(u.display_name(), "jdoe");
        let named = u.with_names("Jane", "Doe");
        assert_eq!(named.display_name(), "Jane Doe");
    }

    #[test]
    fn test_set_role_tracks_tenant_admin_flag() {
        let mut u = user(RoleName::ClientUser);
        u.set_role(RoleName::ClientAdmin);
        assert!(u.is_tenant_admin);
        u.set_role(RoleName::SystemAdmin);
        assert!(!u.is_tenant_admin);
        assert!(u.tenant_id.is_none());
    }

    #[test]
    fn test_effective_permissions_apply_active_overrides() {
        let now = Utc::now();
        let overrides = vec![
            override_for("view_financial_data", true, None),
            override_for("view_crm", false, Some(now + Duration::hours(1))),
            override_for("edit_trips", true, Some(now - Duration::hours(1))),
        ];
        let set = effective_permissions(["view_crm", "view_trips"], &overrides, now);
        assert!(set.contains("view_financial_data"));
        assert!(!set.contains("view_crm"));
        assert!(set.contains("view_trips"));
        assert!(!set.contains("edit_trips"));
    }
}
