//! Invoice, payment and installment storage (port)

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentSchedule, Trip};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Due before today while still SENT or VIEWED.
    pub overdue_only: bool,
    /// Invoice number or client first/last name.
    pub search: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListRow {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub client_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvoiceTotals {
    /// Balance over SENT and VIEWED invoices.
    pub outstanding: Decimal,
    /// Balance over SENT and VIEWED invoices past due.
    pub overdue: Decimal,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Only returns the invoice when its client belongs to `tenant_id`.
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Invoice>, DomainError>;
    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, DomainError>;
    async fn find_for_trip(&self, trip_id: &Uuid) -> Result<Option<Invoice>, DomainError>;
    /// All invoices ever issued, used to number new ones.
    async fn count_all(&self) -> Result<i64, DomainError>;
    async fn create(&self, invoice: &Invoice) -> Result<Invoice, DomainError>;
    /// Stores the invoice and its line items in one transaction.
    async fn create_with_lines(&self, invoice: &Invoice, lines: &[InvoiceLineItem]) -> Result<Invoice, DomainError>;
    /// Saves the trip's status and creates its invoice in one transaction.
    async fn create_for_trip_status(&self, trip: &Trip, invoice: &Invoice) -> Result<Invoice, DomainError>;
    async fn update(&self, invoice: &Invoice) -> Result<Invoice, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError>;
    /// Ordered by invoice date desc.
    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &InvoiceFilter,
        today: NaiveDate,
        pagination: Pagination,
    ) -> Result<Page<InvoiceListRow>, DomainError>;
    async fn totals(&self, tenant_id: &Uuid, today: NaiveDate) -> Result<InvoiceTotals, DomainError>;
    /// Balance over SENT and VIEWED invoices of one client.
    async fn pending_balance_for_client(&self, client_id: &Uuid) -> Result<Decimal, DomainError>;
    /// Balance over SENT, VIEWED and PARTIALLY_PAID invoices of a tenant.
    async fn pending_payments(&self, tenant_id: &Uuid) -> Result<Decimal, DomainError>;
    async fn recent_for_client(&self, client_id: &Uuid, limit: i64) -> Result<Vec<Invoice>, DomainError>;
    /// Open invoices past due, oldest due date first.
    async fn overdue(&self, tenant_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Invoice>, DomainError>;

    async fn list_lines(&self, invoice_id: &Uuid) -> Result<Vec<InvoiceLineItem>, DomainError>;
    async fn add_line(&self, line: &InvoiceLineItem) -> Result<InvoiceLineItem, DomainError>;

    /// Newest first.
    async fn list_payments(&self, invoice_id: &Uuid) -> Result<Vec<Payment>, DomainError>;
    /// Stores the payment, adds it to the invoice's paid amount and, when
    /// given, marks the installment paid, in one transaction. Fails with
    /// `PaymentExceedsBalance` when the stored balance is smaller than the
    /// payment at the time of writing.
    async fn record_payment(
        &self,
        payment: &Payment,
        installment_id: Option<Uuid>,
    ) -> Result<(Payment, Invoice), DomainError>;

    /// Ordered by installment number.
    async fn list_schedule(&self, invoice_id: &Uuid) -> Result<Vec<PaymentSchedule>, DomainError>;
    async fn find_installment(&self, invoice_id: &Uuid, id: &Uuid) -> Result<Option<PaymentSchedule>, DomainError>;
    async fn add_installment(&self, installment: &PaymentSchedule) -> Result<PaymentSchedule, DomainError>;
}
