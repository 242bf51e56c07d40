//! The acting user of a request, with resolved permissions

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Serialize;
use uuid::Uuid;

use super::role::RoleName;
use super::user::User;
use crate::error::DomainError;

/// Where a request came from, recorded on audit entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestMeta {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// The staff member behind an impersonated request.
#[derive(Debug, Clone, Serialize)]
pub struct Impersonator {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub permissions: BTreeSet<String>,
    pub impersonator: Option<Impersonator>,
    pub meta: RequestMeta,
}

impl Principal {
    pub fn new(user: User, permissions: BTreeSet<String>, meta: RequestMeta) -> Self {
        Self { user, permissions, impersonator: None, meta }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> RoleName {
        self.user.role
    }

    pub fn is_staff(&self) -> bool {
        self.user.role.is_staff()
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonator.is_some()
    }

    /// The user who actually authenticated: the staff member when impersonating.
    pub fn authenticated_user_id(&self) -> Uuid {
        self.impersonator.as_ref().map(|i| i.user_id).unwrap_or(self.user.id)
    }

    pub fn has_permission(&self, codename: &str) -> bool {
        self.permissions.contains(codename)
    }

    pub fn require(&self, codename: &str) -> Result<(), DomainError> {
        if self.has_permission(codename) {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied(format!("missing permission {}", codename)))
        }
    }

    pub fn require_staff(&self) -> Result<(), DomainError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied("staff access required".into()))
        }
    }

    /// Tenant of the acting user. CRM data is only reachable through it.
    pub fn require_tenant(&self) -> Result<Uuid, DomainError> {
        self.user.tenant_id.ok_or(DomainError::NoTenant)
    }

    /// Client users need the explicit flag; every other role goes through RBAC.
    pub fn can_access_financial_data(&self) -> bool {
        match self.user.role {
            RoleName::ClientUser => self.user.has_financial_access,
            _ => self.has_permission("view_financial_data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: RoleName, perms: &[&str]) -> Principal {
        let user = User::new("someone".into(), "someone@example.com".into(), "h".into(), role, Some(Uuid::new_v4()))
            .unwrap();
        Principal::new(user, perms.iter().map(|p| p.to_string()).collect(), RequestMeta::default())
    }

    #[test]
    fn test_require_permission() {
        let p = principal(RoleName::ClientUser, &["view_crm"]);
        assert!(p.require("view_crm").is_ok());
        assert!(matches!(p.require("delete_trips"), Err(DomainError::PermissionDenied(_))));
    }

    #[test]
    fn test_client_user_financial_access_uses_flag() {
        let mut p = principal(RoleName::ClientUser, &["view_financial_data"]);
        assert!(!p.can_access_financial_data());
        p.user.has_financial_access = true;
        assert!(p.can_access_financial_data());
    }

    #[test]
    fn test_other_roles_financial_access_uses_permission() {
        let p = principal(RoleName::ClientAdmin, &["view_financial_data"]);
        assert!(p.can_access_financial_data());
        let helpdesk = principal(RoleName::HelpdeskUser, &["view_crm"]);
        assert!(!helpdesk.can_access_financial_data());
    }

    #[test]
    fn test_staff_has_no_tenant() {
        let p = principal(RoleName::SystemAdmin, &[]);
        assert!(p.require_staff().is_ok());
        assert!(matches!(p.require_tenant(), Err(DomainError::NoTenant)));
    }
}
