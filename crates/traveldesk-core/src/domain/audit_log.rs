//! Audit trail entries

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::principal::{Principal, RequestMeta};

text_enum! {
    pub enum AuditAction {
        Login => ("LOGIN", "User Login"),
        Logout => ("LOGOUT", "User Logout"),
        Create => ("CREATE", "Create Record"),
        Update => ("UPDATE", "Update Record"),
        Delete => ("DELETE", "Delete Record"),
        PermissionGrant => ("PERMISSION_GRANT", "Permission Granted"),
        PermissionRevoke => ("PERMISSION_REVOKE", "Permission Revoked"),
        RoleChange => ("ROLE_CHANGE", "Role Changed"),
        MfaEnable => ("MFA_ENABLE", "MFA Enabled"),
        MfaDisable => ("MFA_DISABLE", "MFA Disabled"),
        ImpersonationStart => ("IMPERSONATION_START", "Impersonation Started"),
        ImpersonationEnd => ("IMPERSONATION_END", "Impersonation Ended"),
        UserCreate => ("USER_CREATE", "User Created"),
        UserUpdate => ("USER_UPDATE", "User Updated"),
        PasswordReset => ("PASSWORD_RESET", "Password Reset"),
        TicketCreate => ("TICKET_CREATE", "Ticket Created"),
        TicketComment => ("TICKET_COMMENT", "Ticket Comment"),
        TicketAssign => ("TICKET_ASSIGN", "Ticket Assigned"),
        TicketResolve => ("TICKET_RESOLVE", "Ticket Resolved"),
        TicketStatusChange => ("TICKET_STATUS_CHANGE", "Ticket Status Changed"),
    }
    default = Update;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Value,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLog {
    pub fn new(action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: None,
            tenant_id: None,
            action,
            resource_type: None,
            resource_id: None,
            details: Value::Object(Default::default()),
            ip_address: None,
            user_agent: None,
            timestamp: Utc::now(),
        }
    }

    /// Entry attributed to the acting principal. Impersonated requests also
    /// carry the staff member behind them.
    pub fn by(principal: &Principal, action: AuditAction) -> Self {
        let mut entry = Self::new(action)
            .user(principal.user.id, principal.user.tenant_id)
            .meta(&principal.meta);
        if let Some(imp) = &principal.impersonator {
            entry = entry.detail("impersonated_by", imp.username.clone());
        }
        entry
    }

    pub fn user(mut self, user_id: Uuid, tenant_id: Option<Uuid>) -> Self {
        self.user_id = Some(user_id);
        self.tenant_id = tenant_id;
        self
    }

    pub fn tenant(mut self, tenant_id: Option<Uuid>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn meta(mut self, meta: &RequestMeta) -> Self {
        self.ip_address = meta.ip;
        self.user_agent = meta.user_agent.clone();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_details() {
        let user_id = Uuid::new_v4();
        let meta = RequestMeta {
            ip: Some("198.51.100.4".parse().unwrap()),
            user_agent: Some("curl/8".into()),
        };
        let entry = AuditLog::new(AuditAction::Login)
            .user(user_id, None)
            .resource("user", user_id)
            .detail("login_method", "password")
            .meta(&meta);

        assert_eq!(entry.user_id, Some(user_id));
        assert_eq!(entry.resource_type.as_deref(), Some("user"));
        assert_eq!(entry.details["login_method"], "password");
        assert_eq!(entry.ip_address, meta.ip);
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn test_action_codes() {
        assert_eq!(AuditAction::ImpersonationStart.as_str(), "IMPERSONATION_START");
        assert_eq!(
            AuditAction::from_str("ticket_status_change"),
            Some(AuditAction::TicketStatusChange)
        );
    }
}
