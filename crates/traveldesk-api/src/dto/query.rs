//! List query parameters
//!
//! Enum filters arrive as text and are matched case-insensitively; values
//! that match nothing leave the filter unset.

use serde::Deserialize;
use uuid::Uuid;

use traveldesk_core::domain::{
    AuditAction, InvoiceStatus, LeadSource, RoleName, TenantStatus, TenantType, TicketPriority, TicketStatus,
    TripStatus, VipStatus,
};
use traveldesk_core::repositories::{
    AssignedFilter, AuditLogFilter, ClientFilter, InvoiceFilter, TenantFilter, TicketFilter, TripFilter,
    TripTimeFilter, UserFilter,
};
use traveldesk_shared::constants::{
    AUDIT_PAGE_SIZE, CLIENT_PAGE_SIZE, INVOICE_PAGE_SIZE, TENANT_PAGE_SIZE, TICKET_PAGE_SIZE, TRIP_PAGE_SIZE,
    USER_PAGE_SIZE,
};
use traveldesk_shared::types::Pagination;

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub tenant_id: Option<Uuid>,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, USER_PAGE_SIZE)
    }

    pub fn filter(&self) -> UserFilter {
        UserFilter {
            tenant_id: self.tenant_id,
            search: non_empty(&self.search),
            role: self.role.as_deref().and_then(RoleName::from_str),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantListQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub tenant_type: Option<String>,
    pub status: Option<String>,
}

impl TenantListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, TENANT_PAGE_SIZE)
    }

    pub fn filter(&self) -> TenantFilter {
        TenantFilter {
            search: non_empty(&self.search),
            tenant_type: self.tenant_type.as_deref().and_then(TenantType::from_str),
            status: self.status.as_deref().and_then(TenantStatus::from_str),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub page: Option<u32>,
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub action: Option<String>,
}

impl AuditLogQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, AUDIT_PAGE_SIZE)
    }

    pub fn filter(&self) -> AuditLogFilter {
        AuditLogFilter {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            action: self.action.as_deref().and_then(AuditAction::from_str),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub vip_status: Option<String>,
    pub lead_source: Option<String>,
    pub is_active: Option<bool>,
}

impl ClientListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, CLIENT_PAGE_SIZE)
    }

    pub fn filter(&self) -> ClientFilter {
        ClientFilter {
            search: non_empty(&self.search),
            vip_status: self.vip_status.as_deref().and_then(VipStatus::from_str),
            lead_source: self.lead_source.as_deref().and_then(LeadSource::from_str),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TripListQuery {
    pub page: Option<u32>,
    pub status: Option<String>,
    /// `upcoming`, `past` or `current`.
    pub time: Option<String>,
    pub search: Option<String>,
    pub client_id: Option<Uuid>,
}

impl TripListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, TRIP_PAGE_SIZE)
    }

    pub fn filter(&self) -> TripFilter {
        let time = match self.time.as_deref().map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("upcoming") => Some(TripTimeFilter::Upcoming),
            Some("past") => Some(TripTimeFilter::Past),
            Some("current") => Some(TripTimeFilter::Current),
            _ => None,
        };
        TripFilter {
            status: self.status.as_deref().and_then(TripStatus::from_str),
            time,
            search: non_empty(&self.search),
            client_id: self.client_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub page: Option<u32>,
    /// A status code, or `overdue`.
    pub status: Option<String>,
    pub search: Option<String>,
    pub client_id: Option<Uuid>,
}

impl InvoiceListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, INVOICE_PAGE_SIZE)
    }

    pub fn filter(&self) -> InvoiceFilter {
        let status = self.status.as_deref().map(str::trim).unwrap_or_default();
        let overdue_only = status.eq_ignore_ascii_case("overdue");
        InvoiceFilter {
            status: if overdue_only { None } else { InvoiceStatus::from_str(status) },
            overdue_only,
            search: non_empty(&self.search),
            client_id: self.client_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub page: Option<u32>,
    pub tenant_id: Option<Uuid>,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// `me`, `unassigned` or a staff user id.
    pub assigned: Option<String>,
    pub search: Option<String>,
}

impl TicketListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, TICKET_PAGE_SIZE)
    }

    /// `me` resolves to `current_user`.
    pub fn filter(&self, current_user: Uuid) -> TicketFilter {
        let assigned = match self.assigned.as_deref().map(str::trim) {
            Some(a) if a.eq_ignore_ascii_case("me") => Some(AssignedFilter::To(current_user)),
            Some(a) if a.eq_ignore_ascii_case("unassigned") => Some(AssignedFilter::Unassigned),
            Some(a) => Uuid::parse_str(a).ok().map(AssignedFilter::To),
            None => None,
        };
        TicketFilter {
            tenant_id: self.tenant_id,
            status: self.status.as_deref().and_then(TicketStatus::from_str),
            priority: self.priority.as_deref().and_then(TicketPriority::from_str),
            assigned,
            search: non_empty(&self.search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_overdue_pseudo_status() {
        let q = InvoiceListQuery { status: Some("overdue".into()), ..Default::default() };
        let f = q.filter();
        assert!(f.overdue_only);
        assert_eq!(f.status, None);

        let q = InvoiceListQuery { status: Some("paid".into()), ..Default::default() };
        assert_eq!(q.filter().status, Some(InvoiceStatus::Paid));
    }

    #[test]
    fn test_ticket_assigned_filter() {
        let me = Uuid::new_v4();
        let q = TicketListQuery { assigned: Some("me".into()), ..Default::default() };
        assert_eq!(q.filter(me).assigned, Some(AssignedFilter::To(me)));

        let q = TicketListQuery { assigned: Some("unassigned".into()), ..Default::default() };
        assert_eq!(q.filter(me).assigned, Some(AssignedFilter::Unassigned));

        let q = TicketListQuery { assigned: Some("nobody".into()), ..Default::default() };
        assert_eq!(q.filter(me).assigned, None);
    }

    #[test]
    fn test_unknown_enum_values_are_ignored() {
        let q = ClientListQuery {
            vip_status: Some("gold".into()),
            search: Some("   ".into()),
            ..Default::default()
        };
        let f = q.filter();
        assert_eq!(f.vip_status, None);
        assert_eq!(f.search, None);
    }

    #[test]
    fn test_trip_time_filter_is_case_insensitive() {
        let q = TripListQuery { time: Some("Upcoming".into()), ..Default::default() };
        assert_eq!(q.filter().time, Some(TripTimeFilter::Upcoming));
    }

    #[test]
    fn test_page_sizes_per_list() {
        assert_eq!(TripListQuery::default().pagination().per_page, TRIP_PAGE_SIZE);
        assert_eq!(AuditLogQuery { page: Some(3), ..Default::default() }.pagination().offset(), 100);
    }
}
