// ============================================================================
// TravelDesk Core - Role
// File: crates/traveldesk-core/src/domain/role.rs
// Description: Fixed role tiers and the rules attached to them
// ============================================================================

use serde::Serialize;

text_enum! {
    /// Role tier. A lower hierarchy level carries more authority.
    pub enum RoleName {
        SuperAdmin => ("SUPER_ADMIN", "Super Admin"),
        SystemAdmin => ("SYSTEM_ADMIN", "System Admin"),
        HelpdeskUser => ("HELPDESK_USER", "Help Desk User"),
        ClientAdmin => ("CLIENT_ADMIN", "Client Admin"),
        ClientUser => ("CLIENT_USER", "Client User"),
    }
    default = ClientUser;
}

impl RoleName {
    pub fn hierarchy_level(&self) -> i32 {
        match self {
            RoleName::SuperAdmin => 1,
            RoleName::SystemAdmin => 2,
            RoleName::HelpdeskUser => 3,
            RoleName::ClientAdmin => 4,
            RoleName::ClientUser => 5,
        }
    }

    /// Platform-operator roles. Users holding them belong to no tenant.
    pub fn is_system_role(&self) -> bool {
        matches!(
            self,
            RoleName::SuperAdmin | RoleName::SystemAdmin | RoleName::HelpdeskUser
        )
    }

    pub fn is_staff(&self) -> bool {
        self.is_system_role()
    }

    pub fn is_tenant_role(&self) -> bool {
        !self.is_system_role()
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(
            self,
            RoleName::ClientAdmin | RoleName::SuperAdmin | RoleName::SystemAdmin
        )
    }

    pub fn assignable_roles(&self) -> Vec<RoleName> {
        match self {
            RoleName::ClientAdmin => vec![RoleName::ClientUser],
            RoleName::SuperAdmin | RoleName::SystemAdmin => RoleName::ALL
                .iter()
                .copied()
                .filter(|r| *r != RoleName::SuperAdmin)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn can_assign(&self, role: RoleName) -> bool {
        self.assignable_roles().contains(&role)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleName::SuperAdmin => "Full platform access including every tenant",
            RoleName::SystemAdmin => "Platform administration, tenants, support and sales",
            RoleName::HelpdeskUser => "Support desk with read access across tenants",
            RoleName::ClientAdmin => "Administrator of a travel agency tenant",
            RoleName::ClientUser => "Travel advisor within a tenant",
        }
    }

    pub fn info(&self) -> RoleInfo {
        RoleInfo {
            name: *self,
            display_name: self.label(),
            description: self.description(),
            hierarchy_level: self.hierarchy_level(),
            is_system_role: self.is_system_role(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub name: RoleName,
    pub display_name: &'static str,
    pub description: &'static str,
    pub hierarchy_level: i32,
    pub is_system_role: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_levels_are_ordered() {
        let levels: Vec<i32> = RoleName::ALL.iter().map(|r| r.hierarchy_level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_system_roles() {
        assert!(RoleName::SuperAdmin.is_system_role());
        assert!(RoleName::HelpdeskUser.is_system_role());
        assert!(!RoleName::ClientAdmin.is_system_role());
        assert!(!RoleName::ClientUser.is_system_role());
    }

    #[test]
    fn test_assignable_roles() {
        assert_eq!(RoleName::ClientAdmin.assignable_roles(), vec![RoleName::ClientUser]);
        let by_super = RoleName::SuperAdmin.assignable_roles();
        assert_eq!(by_super.len(), 4);
        assert!(!by_super.contains(&RoleName::SuperAdmin));
        assert!(RoleName::SystemAdmin.can_assign(RoleName::SystemAdmin));
        assert!(RoleName::HelpdeskUser.assignable_roles().is_empty());
        assert!(RoleName::ClientUser.assignable_roles().is_empty());
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(RoleName::from_str("client_admin"), Some(RoleName::ClientAdmin));
        assert_eq!(RoleName::from_str("SUPER_ADMIN"), Some(RoleName::SuperAdmin));
        assert_eq!(RoleName::from_str("ROOT"), None);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&RoleName::HelpdeskUser).unwrap();
        assert_eq!(json, "\"HELPDESK_USER\"");
    }
}
