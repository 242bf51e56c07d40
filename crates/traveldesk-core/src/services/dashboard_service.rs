//! Summary figures for the tenant CRM home page and the staff support desk

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Client, Invoice, Principal, Trip};
use crate::error::DomainError;
use crate::repositories::{
    ClientRepository, InvoiceRepository, TenantCounts, TenantRepository, TicketRepository, TicketStats,
    TripRepository,
};

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CrmDashboard {
    pub total_clients: i64,
    pub active_clients: i64,
    pub vip_clients: i64,
    pub total_trips: i64,
    pub upcoming_trips: i64,
    /// Financial figures are omitted without financial access.
    pub total_revenue: Option<Decimal>,
    pub pending_payments: Option<Decimal>,
    pub recent_clients: Vec<Client>,
    pub upcoming_departures: Vec<Trip>,
    pub overdue_invoices: Vec<Invoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffDashboard {
    pub tickets: TicketStats,
    pub tenants: TenantCounts,
}

pub struct DashboardService {
    client_repo: Arc<dyn ClientRepository>,
    trip_repo: Arc<dyn TripRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    ticket_repo: Arc<dyn TicketRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
}

impl DashboardService {
    pub fn new(
        client_repo: Arc<dyn ClientRepository>,
        trip_repo: Arc<dyn TripRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        ticket_repo: Arc<dyn TicketRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
    ) -> Self {
        Self { client_repo, trip_repo, invoice_repo, ticket_repo, tenant_repo }
    }

    pub async fn crm(&self, principal: &Principal) -> Result<CrmDashboard, DomainError> {
        principal.require("view_crm")?;
        let tenant_id = principal.require_tenant()?;
        let today = Utc::now().date_naive();
        let financial = principal.can_access_financial_data();

        let clients = self.client_repo.counts(&tenant_id).await?;
        let trips = self.trip_repo.tenant_totals(&tenant_id).await?;
        let pending_payments = if financial {
            Some(self.invoice_repo.pending_payments(&tenant_id).await?)
        } else {
            None
        };
        let overdue_invoices = if principal.has_permission("view_invoices") {
            self.invoice_repo.overdue(&tenant_id, today, RECENT_LIMIT).await?
        } else {
            Vec::new()
        };

        Ok(CrmDashboard {
            total_clients: clients.total,
            active_clients: clients.active,
            vip_clients: clients.vip,
            total_trips: trips.trip_count,
            upcoming_trips: self.trip_repo.count_upcoming(&tenant_id, today).await?,
            total_revenue: financial.then_some(trips.total_amount),
            pending_payments,
            recent_clients: self.client_repo.recent(&tenant_id, RECENT_LIMIT).await?,
            upcoming_departures: self.trip_repo.upcoming_departures(&tenant_id, today, RECENT_LIMIT).await?,
            overdue_invoices,
        })
    }

    pub async fn staff(&self, principal: &Principal) -> Result<StaffDashboard, DomainError> {
        principal.require_staff()?;
        Ok(StaffDashboard {
            tickets: self.ticket_repo.stats(&principal.id()).await?,
            tenants: self.tenant_repo.counts().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestMeta, RoleName, User};
    use crate::repositories::{
        ClientCounts, MockClientRepository, MockInvoiceRepository, MockTenantRepository, MockTicketRepository,
        MockTripRepository, TripTotals,
    };
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn principal(role: RoleName, tenant_id: Option<Uuid>, perms: &[&str]) -> Principal {
        let user = User::new("someone".into(), "someone@example.com".into(), "h".into(), role, tenant_id).unwrap();
        Principal::new(user, perms.iter().map(|p| p.to_string()).collect(), RequestMeta::default())
    }

    fn crm_mocks() -> (MockClientRepository, MockTripRepository) {
        let mut clients = MockClientRepository::new();
        clients
            .expect_counts()
            .returning(|_| Ok(ClientCounts { total: 40, active: 35, vip: 6 }));
        clients.expect_recent().returning(|_, _| Ok(vec![]));
        let mut trips = MockTripRepository::new();
        trips
            .expect_tenant_totals()
            .returning(|_| Ok(TripTotals { trip_count: 18, total_amount: dec!(96500) }));
        trips.expect_count_upcoming().returning(|_, _| Ok(7));
        trips.expect_upcoming_departures().returning(|_, _, _| Ok(vec![]));
        (clients, trips)
    }

    #[tokio::test]
    async fn test_crm_dashboard_with_financial_access() {
        let (clients, trips) = crm_mocks();
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_pending_payments().returning(|_| Ok(dec!(12000)));
        invoices.expect_overdue().returning(|_, _, _| Ok(vec![]));

        let svc = DashboardService::new(
            Arc::new(clients),
            Arc::new(trips),
            Arc::new(invoices),
            Arc::new(MockTicketRepository::new()),
            Arc::new(MockTenantRepository::new()),
        );
        let p = principal(
            RoleName::ClientAdmin,
            Some(Uuid::new_v4()),
            &["view_crm", "view_invoices", "view_financial_data"],
        );
        let dash = svc.crm(&p).await.unwrap();
        assert_eq!(dash.vip_clients, 6);
        assert_eq!(dash.upcoming_trips, 7);
        assert_eq!(dash.total_revenue, Some(dec!(96500)));
        assert_eq!(dash.pending_payments, Some(dec!(12000)));
    }

    #[tokio::test]
    async fn test_crm_dashboard_hides_money_without_access() {
        let (clients, trips) = crm_mocks();
        let svc = DashboardService::new(
            Arc::new(clients),
            Arc::new(trips),
            Arc::new(MockInvoiceRepository::new()),
            Arc::new(MockTicketRepository::new()),
            Arc::new(MockTenantRepository::new()),
        );
        let p = principal(RoleName::ClientUser, Some(Uuid::new_v4()), &["view_crm"]);
        let dash = svc.crm(&p).await.unwrap();
        assert_eq!(dash.total_revenue, None);
        assert_eq!(dash.pending_payments, None);
        assert!(dash.overdue_invoices.is_empty());
    }

    #[tokio::test]
    async fn test_staff_dashboard_requires_staff() {
        let svc = DashboardService::new(
            Arc::new(MockClientRepository::new()),
            Arc::new(MockTripRepository::new()),
            Arc::new(MockInvoiceRepository::new()),
            Arc::new(MockTicketRepository::new()),
            Arc::new(MockTenantRepository::new()),
        );
        let p = principal(RoleName::ClientAdmin, Some(Uuid::new_v4()), &["view_crm"]);
        assert!(matches!(svc.staff(&p).await, Err(DomainError::PermissionDenied(_))));
    }
}
