// ============================================================================
// TravelDesk Core - Permission Catalog
// File: crates/traveldesk-core/src/domain/permission.rs
// Description: Permission categories, the built-in catalog and default grants
// ============================================================================

use serde::Serialize;

use super::role::RoleName;

text_enum! {
    pub enum PermissionCategory {
        UserManagement => ("USER_MANAGEMENT", "User Management"),
        TenantManagement => ("TENANT_MANAGEMENT", "Tenant Management"),
        Crm => ("CRM", "CRM"),
        Supplier => ("SUPPLIER", "Supplier Management"),
        Forms => ("FORMS", "Form Builder"),
        EmailMarketing => ("EMAIL_MARKETING", "Email Marketing"),
        TripBuilder => ("TRIP_BUILDER", "Trip Builder"),
        Invoice => ("INVOICE", "Invoice Management"),
        Payment => ("PAYMENT", "Payment Processing"),
        Destination => ("DESTINATION", "Destination Management"),
        Tour => ("TOUR", "Tour Management"),
        Cruise => ("CRUISE", "Cruise Management"),
        Network => ("NETWORK", "Network Portal"),
        Financial => ("FINANCIAL", "Financial Data"),
        Reports => ("REPORTS", "Reports & Analytics"),
        AdminSystem => ("ADMIN_SYSTEM", "Admin System"),
        Support => ("SUPPORT", "Support Desk"),
        Sales => ("SALES", "Sales Pipeline"),
        Onboarding => ("ONBOARDING", "Client Onboarding"),
    }
    default = Crm;
}

/// One built-in permission.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionDef {
    pub name: &'static str,
    pub codename: &'static str,
    pub category: PermissionCategory,
    pub description: &'static str,
    pub is_sensitive: bool,
}

const fn perm(
    name: &'static str,
    codename: &'static str,
    category: PermissionCategory,
    description: &'static str,
) -> PermissionDef {
    PermissionDef { name, codename, category, description, is_sensitive: false }
}

const fn sensitive(
    name: &'static str,
    codename: &'static str,
    category: PermissionCategory,
    description: &'static str,
) -> PermissionDef {
    PermissionDef { name, codename, category, description, is_sensitive: true }
}

use PermissionCategory as C;

pub const PERMISSION_CATALOG: &[PermissionDef] = &[
    perm("View Users", "view_users", C::UserManagement, "View user accounts"),
    perm("Create Users", "create_users", C::UserManagement, "Create new user accounts"),
    perm("Edit Users", "edit_users", C::UserManagement, "Edit existing user accounts"),
    perm("Delete Users", "delete_users", C::UserManagement, "Delete user accounts"),
    perm("Manage User Roles", "manage_user_roles", C::UserManagement, "Assign and modify user roles"),
    perm("View Tenants", "view_tenants", C::TenantManagement, "View tenant organizations"),
    perm("Create Tenants", "create_tenants", C::TenantManagement, "Create new tenant organizations"),
    perm("Edit Tenants", "edit_tenants", C::TenantManagement, "Edit tenant organizations"),
    perm("Delete Tenants", "delete_tenants", C::TenantManagement, "Delete tenant organizations"),
    perm("View CRM", "view_crm", C::Crm, "View customer relationship data"),
    perm("Create CRM Contacts", "create_crm_contacts", C::Crm, "Create new CRM contacts"),
    perm("Edit CRM Contacts", "edit_crm_contacts", C::Crm, "Edit CRM contacts"),
    perm("Delete CRM Contacts", "delete_crm_contacts", C::Crm, "Delete CRM contacts"),
    perm("View Suppliers", "view_suppliers", C::Supplier, "View supplier/vendor information"),
    perm("Create Suppliers", "create_suppliers", C::Supplier, "Add new suppliers/vendors"),
    perm("Edit Suppliers", "edit_suppliers", C::Supplier, "Edit supplier/vendor information"),
    perm("Delete Suppliers", "delete_suppliers", C::Supplier, "Delete suppliers/vendors"),
    perm("View Forms", "view_forms", C::Forms, "View custom forms"),
    perm("Create Forms", "create_forms", C::Forms, "Create custom forms"),
    perm("Edit Forms", "edit_forms", C::Forms, "Edit custom forms"),
    perm("Delete Forms", "delete_forms", C::Forms, "Delete custom forms"),
    perm("View Email Campaigns", "view_email_campaigns", C::EmailMarketing, "View email marketing campaigns"),
    perm("Create Email Campaigns", "create_email_campaigns", C::EmailMarketing, "Create email marketing campaigns"),
    perm("Send Email Campaigns", "send_email_campaigns", C::EmailMarketing, "Send email marketing campaigns"),
    perm("Edit Email Campaigns", "edit_email_campaigns", C::EmailMarketing, "Edit email marketing campaigns"),
    perm("View Trips", "view_trips", C::TripBuilder, "View trip itineraries"),
    perm("Create Trips", "create_trips", C::TripBuilder, "Create trip itineraries"),
    perm("Edit Trips", "edit_trips", C::TripBuilder, "Edit trip itineraries"),
    perm("Delete Trips", "delete_trips", C::TripBuilder, "Delete trip itineraries"),
    perm("View Invoices", "view_invoices", C::Invoice, "View invoices"),
    perm("Create Invoices", "create_invoices", C::Invoice, "Create invoices"),
    perm("Edit Invoices", "edit_invoices", C::Invoice, "Edit invoices"),
    perm("Send Invoices", "send_invoices", C::Invoice, "Send invoices to customers"),
    perm("View Payments", "view_payments", C::Payment, "View payment records"),
    perm("Process Payments", "process_payments", C::Payment, "Process customer payments"),
    perm("Refund Payments", "refund_payments", C::Payment, "Process payment refunds"),
    sensitive("View Financial Data", "view_financial_data", C::Financial, "View financial reports and data"),
    sensitive("Edit Financial Data", "edit_financial_data", C::Financial, "Edit financial data"),
    perm("View Destinations", "view_destinations", C::Destination, "View destination information"),
    perm("Edit Destinations", "edit_destinations", C::Destination, "Edit destination information"),
    perm("View Tours", "view_tours", C::Tour, "View tour itineraries"),
    perm("Create Tours", "create_tours", C::Tour, "Create tour itineraries"),
    perm("Edit Tours", "edit_tours", C::Tour, "Edit tour itineraries"),
    perm("View Cruises", "view_cruises", C::Cruise, "View cruise itineraries"),
    perm("Create Cruises", "create_cruises", C::Cruise, "Create cruise itineraries"),
    perm("Edit Cruises", "edit_cruises", C::Cruise, "Edit cruise itineraries"),
    perm("View Network", "view_network", C::Network, "View network portal"),
    perm("Post to Network", "post_to_network", C::Network, "Post group space to network"),
    perm("View Client Accounts", "view_client_accounts", C::AdminSystem, "View client account information"),
    perm("Create Client Accounts", "create_client_accounts", C::AdminSystem, "Create new client accounts"),
    perm("Edit Client Accounts", "edit_client_accounts", C::AdminSystem, "Edit client account information"),
    perm("Delete Client Accounts", "delete_client_accounts", C::AdminSystem, "Delete client accounts"),
    perm("View Support Tickets", "view_support_tickets", C::Support, "View support tickets"),
    perm("Create Support Tickets", "create_support_tickets", C::Support, "Create new support tickets"),
    perm("Edit Support Tickets", "edit_support_tickets", C::Support, "Edit support tickets"),
    perm("Assign Support Tickets", "assign_support_tickets", C::Support, "Assign tickets to support staff"),
    perm("Resolve Support Tickets", "resolve_support_tickets", C::Support, "Mark tickets as resolved"),
    perm("View Sales Opportunities", "view_sales_opportunities", C::Sales, "View sales pipeline and opportunities"),
    perm("Create Sales Opportunities", "create_sales_opportunities", C::Sales, "Create new sales opportunities"),
    perm("Edit Sales Opportunities", "edit_sales_opportunities", C::Sales, "Edit sales opportunities"),
    perm("Delete Sales Opportunities", "delete_sales_opportunities", C::Sales, "Delete sales opportunities"),
    perm("View Sales Reports", "view_sales_reports", C::Sales, "View sales analytics and reports"),
    perm("View Onboarding Tasks", "view_onboarding_tasks", C::Onboarding, "View client onboarding tasks"),
    perm("Create Onboarding Tasks", "create_onboarding_tasks", C::Onboarding, "Create onboarding task templates"),
    perm("Edit Onboarding Tasks", "edit_onboarding_tasks", C::Onboarding, "Edit onboarding tasks"),
    perm("Complete Onboarding Tasks", "complete_onboarding_tasks", C::Onboarding, "Mark onboarding tasks as complete"),
    perm("View Reports", "view_reports", C::Reports, "View analytics and reports"),
    perm("Create Reports", "create_reports", C::Reports, "Create custom reports"),
];

/// Codenames a client user never receives by default even though their
/// category is granted.
const CLIENT_USER_EXCLUDED: &[&str] = &[
    "delete_crm_contacts",
    "delete_suppliers",
    "delete_forms",
    "delete_trips",
    "refund_payments",
    "create_reports",
];

pub fn find_permission(codename: &str) -> Option<&'static PermissionDef> {
    PERMISSION_CATALOG.iter().find(|p| p.codename == codename)
}

impl PermissionDef {
    pub fn is_granted_by_default(&self, role: RoleName) -> bool {
        match role {
            RoleName::SuperAdmin => true,
            RoleName::SystemAdmin => matches!(
                self.category,
                C::UserManagement
                    | C::TenantManagement
                    | C::AdminSystem
                    | C::Support
                    | C::Sales
                    | C::Onboarding
                    | C::Reports
            ),
            RoleName::HelpdeskUser => {
                (self.codename.starts_with("view_") && self.category != C::Financial)
                    || self.category == C::Support
            }
            RoleName::ClientAdmin => self.category != C::TenantManagement,
            RoleName::ClientUser => {
                !matches!(
                    self.category,
                    C::TenantManagement | C::UserManagement | C::Financial
                ) && !CLIENT_USER_EXCLUDED.contains(&self.codename)
            }
        }
    }
}

/// Default grant set of a role, in catalog order.
pub fn default_grants(role: RoleName) -> Vec<&'static str> {
    PERMISSION_CATALOG
        .iter()
        .filter(|p| p.is_granted_by_default(role))
        .map(|p| p.codename)
        .collect()
}
