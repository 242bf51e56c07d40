// ============================================================================
// TravelDesk Core - Invoice Service
// File: crates/traveldesk-core/src/services/invoice_service.rs
// Description: Invoices, payments, installment schedules and reminders
// ============================================================================

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use traveldesk_shared::constants::INVOICE_DUE_DAYS;
use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{
    format_usd_cents, Client, Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentMethod,
    PaymentSchedule, Principal, ScheduleStatus, Trip,
};
use crate::error::DomainError;
use crate::repositories::{
    ClientRepository, InvoiceFilter, InvoiceListRow, InvoiceRepository, InvoiceTotals, TripRepository,
};
use crate::services::email_service::{EmailSender, TenantEmailService};

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoiceLine {
    pub description: String,
    #[serde(default = "one")]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Option<Decimal>,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub client_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub notes: Option<String>,
    pub terms: Option<String>,
    #[serde(default)]
    pub lines: Vec<NewInvoiceLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceUpdate {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
    pub tax_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub installment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInstallment {
    pub installment_number: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceListResult {
    pub invoices: Page<InvoiceListRow>,
    pub totals: InvoiceTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub client: Client,
    pub trip: Option<Trip>,
    pub lines: Vec<InvoiceLineItem>,
    pub payments: Vec<Payment>,
    pub schedule: Vec<PaymentSchedule>,
    pub balance_due: Decimal,
    pub is_overdue: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSent {
    pub invoice: Invoice,
    pub email_sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecorded {
    pub payment: Payment,
    pub invoice: Invoice,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderResult {
    pub sent: bool,
    pub reason: Option<String>,
}

pub struct InvoiceService {
    invoice_repo: Arc<dyn InvoiceRepository>,
    client_repo: Arc<dyn ClientRepository>,
    trip_repo: Arc<dyn TripRepository>,
    email: Arc<TenantEmailService>,
}

impl InvoiceService {
    pub fn new(
        invoice_repo: Arc<dyn InvoiceRepository>,
        client_repo: Arc<dyn ClientRepository>,
        trip_repo: Arc<dyn TripRepository>,
        email: Arc<TenantEmailService>,
    ) -> Self {
        Self { invoice_repo, client_repo, trip_repo, email }
    }

    async fn load(&self, principal: &Principal, id: &Uuid) -> Result<Invoice, DomainError> {
        let tenant_id = principal.require_tenant()?;
        self.invoice_repo
            .find_by_id(&tenant_id, id)
            .await?
            .ok_or(DomainError::InvoiceNotFound)
    }

    async fn client_of(&self, principal: &Principal, invoice: &Invoice) -> Result<Client, DomainError> {
        let tenant_id = principal.require_tenant()?;
        self.client_repo
            .find_by_id(&tenant_id, &invoice.client_id)
            .await?
            .ok_or(DomainError::ClientNotFound)
    }

    async fn trip_of(&self, principal: &Principal, invoice: &Invoice) -> Result<Option<Trip>, DomainError> {
        match invoice.trip_id {
            Some(trip_id) => {
                let tenant_id = principal.require_tenant()?;
                self.trip_repo.find_by_id(&tenant_id, &trip_id).await
            }
            None => Ok(None),
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &InvoiceFilter,
        pagination: Pagination,
    ) -> Result<InvoiceListResult, DomainError> {
        principal.require("view_invoices")?;
        let tenant_id = principal.require_tenant()?;
        let today = Utc::now().date_naive();
        Ok(InvoiceListResult {
            invoices: self.invoice_repo.list(&tenant_id, filter, today, pagination).await?,
            totals: self.invoice_repo.totals(&tenant_id, today).await?,
        })
    }

    pub async fn detail(&self, principal: &Principal, id: &Uuid) -> Result<InvoiceDetail, DomainError> {
        principal.require("view_invoices")?;
        let invoice = self.load(principal, id).await?;
        let today = Utc::now().date_naive();
        let payments = if principal.has_permission("view_payments") {
            self.invoice_repo.list_payments(&invoice.id).await?
        } else {
            Vec::new()
        };

        Ok(InvoiceDetail {
            client: self.client_of(principal, &invoice).await?,
            trip: self.trip_of(principal, &invoice).await?,
            lines: self.invoice_repo.list_lines(&invoice.id).await?,
            payments,
            schedule: self.invoice_repo.list_schedule(&invoice.id).await?,
            balance_due: invoice.balance_due(),
            is_overdue: invoice.is_overdue(today),
            can_delete: invoice.can_delete(),
            invoice,
        })
    }

    pub async fn create(&self, principal: &Principal, input: NewInvoice) -> Result<Invoice, DomainError> {
        principal.require("create_invoices")?;
        let tenant_id = principal.require_tenant()?;
        let today = Utc::now().date_naive();

        // 1. Client of the tenant, trip of that client
        let client = self
            .client_repo
            .find_by_id(&tenant_id, &input.client_id)
            .await?
            .ok_or(DomainError::ClientNotFound)?;
        if let Some(trip_id) = input.trip_id {
            let trip = self
                .trip_repo
                .find_by_id(&tenant_id, &trip_id)
                .await?
                .ok_or(DomainError::TripNotFound)?;
            if trip.client_id != client.id {
                return Err(DomainError::ValidationError("Trip belongs to another client".into()));
            }
        }

        // 2. Number
        let number = match input.invoice_number.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(n) => n,
            None => Invoice::dated_number(today, self.invoice_repo.count_all().await? + 1),
        };
        if self.invoice_repo.find_by_number(&number).await?.is_some() {
            return Err(DomainError::ValidationError(format!("Invoice number {} already exists", number)));
        }

        // 3. Build, then store with its lines
        let invoice_date = input.invoice_date.unwrap_or(today);
        let mut invoice = Invoice::new(client.id, number, invoice_date);
        invoice.trip_id = input.trip_id;
        invoice.created_by = Some(principal.id());
        invoice.due_date = Some(input.due_date.unwrap_or(invoice_date + Duration::days(INVOICE_DUE_DAYS)));
        invoice.tax_amount = input.tax_amount;
        invoice.notes = input.notes;
        invoice.terms = input.terms;

        let lines = input
            .lines
            .iter()
            .map(|l| InvoiceLineItem::new(invoice.id, &l.description, l.quantity, l.unit_price, l.total_price))
            .collect::<Result<Vec<_>, _>>()?;
        invoice.recalculate(&lines);

        let created = self.invoice_repo.create_with_lines(&invoice, &lines).await?;
        info!("Invoice {} created for client {}", created.invoice_number, client.id);
        Ok(created)
    }

    pub async fn update(&self, principal: &Principal, id: &Uuid, changes: InvoiceUpdate) -> Result<Invoice, DomainError> {
        principal.require("edit_invoices")?;
        let mut invoice = self.load(principal, id).await?;

        if let Some(status) = changes.status {
            invoice.status = status;
        }
        if changes.due_date.is_some() {
            invoice.due_date = changes.due_date;
        }
        if changes.notes.is_some() {
            invoice.notes = changes.notes;
        }
        if changes.terms.is_some() {
            invoice.terms = changes.terms;
        }
        if let Some(tax) = changes.tax_amount {
            let lines = self.invoice_repo.list_lines(&invoice.id).await?;
            invoice.set_tax(tax, &lines);
        }
        invoice.updated_at = Utc::now();
        self.invoice_repo.update(&invoice).await
    }

    pub async fn delete(&self, principal: &Principal, id: &Uuid) -> Result<(), DomainError> {
        principal.require("edit_invoices")?;
        let invoice = self.load(principal, id).await?;
        if !invoice.can_delete() {
            let reason = if invoice.paid_amount > Decimal::ZERO {
                "payments have been recorded".to_string()
            } else {
                format!("status is {}", invoice.status.label())
            };
            return Err(DomainError::InvoiceNotDeletable(reason));
        }
        self.invoice_repo.delete(&invoice.id).await?;
        info!("Invoice {} deleted", invoice.invoice_number);
        Ok(())
    }

    /// Emails the invoice; a DRAFT becomes SENT.
    pub async fn send(&self, principal: &Principal, id: &Uuid) -> Result<InvoiceSent, DomainError> {
        principal.require("send_invoices")?;
        let mut invoice = self.load(principal, id).await?;
        let client = self.client_of(principal, &invoice).await?;
        if !client.has_email() {
            return Err(DomainError::ClientHasNoEmail);
        }
        let trip = self.trip_of(principal, &invoice).await?;
        let lines = self.invoice_repo.list_lines(&invoice.id).await?;

        let outcome = self
            .email
            .send_invoice(&client, &invoice, &lines, trip.as_ref(), EmailSender::from_principal(principal))
            .await?;
        let email_sent = outcome.map(|o| o.sent).unwrap_or(false);
        if !email_sent {
            warn!("Invoice {} email was not delivered", invoice.invoice_number);
        }

        if invoice.status == InvoiceStatus::Draft {
            invoice.status = InvoiceStatus::Sent;
            invoice.updated_at = Utc::now();
            invoice = self.invoice_repo.update(&invoice).await?;
        }
        Ok(InvoiceSent { invoice, email_sent })
    }

    pub async fn record_payment(
        &self,
        principal: &Principal,
        id: &Uuid,
        input: NewPayment,
    ) -> Result<PaymentRecorded, DomainError> {
        principal.require("process_payments")?;
        let invoice = self.load(principal, id).await?;

        // 1. Amount within the balance
        if input.amount <= Decimal::ZERO {
            return Err(DomainError::ValidationError("Payment amount must be positive".into()));
        }
        let balance = invoice.balance_due();
        if input.amount > balance {
            return Err(DomainError::PaymentExceedsBalance(format_usd_cents(balance)));
        }

        // 2. Installment, when given, must belong to this invoice and be open
        if let Some(installment_id) = input.installment_id {
            let installment = self
                .invoice_repo
                .find_installment(&invoice.id, &installment_id)
                .await?
                .ok_or(DomainError::InstallmentNotFound)?;
            if installment.status == ScheduleStatus::Paid {
                return Err(DomainError::ValidationError(format!(
                    "Installment {} is already paid",
                    installment.installment_number
                )));
            }
        }

        // 3. Store payment and totals together
        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            amount: input.amount,
            payment_date: input.payment_date.unwrap_or_else(|| Utc::now().date_naive()),
            payment_method: input.payment_method,
            reference_number: input.reference_number,
            notes: input.notes,
            created_by: Some(principal.id()),
            created_at: Utc::now(),
        };
        let (payment, invoice) = self
            .invoice_repo
            .record_payment(&payment, input.installment_id)
            .await?;

        info!(
            "Payment of {} recorded on invoice {} ({})",
            format_usd_cents(payment.amount),
            invoice.invoice_number,
            invoice.status
        );
        Ok(PaymentRecorded { payment, invoice })
    }

    pub async fn schedule(&self, principal: &Principal, id: &Uuid) -> Result<Vec<PaymentSchedule>, DomainError> {
        principal.require("view_payments")?;
        let invoice = self.load(principal, id).await?;
        self.invoice_repo.list_schedule(&invoice.id).await
    }

    pub async fn add_installment(
        &self,
        principal: &Principal,
        id: &Uuid,
        input: NewInstallment,
    ) -> Result<PaymentSchedule, DomainError> {
        principal.require("edit_invoices")?;
        let invoice = self.load(principal, id).await?;
        if input.installment_number < 1 {
            return Err(DomainError::ValidationError("Installment number must be at least 1".into()));
        }
        if input.amount <= Decimal::ZERO {
            return Err(DomainError::ValidationError("Installment amount must be positive".into()));
        }
        let existing = self.invoice_repo.list_schedule(&invoice.id).await?;
        if existing.iter().any(|s| s.installment_number == input.installment_number) {
            return Err(DomainError::InstallmentExists(input.installment_number));
        }

        let installment = PaymentSchedule {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            installment_number: input.installment_number,
            amount: input.amount,
            due_date: input.due_date,
            status: ScheduleStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
        };
        self.invoice_repo.add_installment(&installment).await
    }

    pub async fn send_reminder(&self, principal: &Principal, id: &Uuid) -> Result<ReminderResult, DomainError> {
        principal.require("send_invoices")?;
        let invoice = self.load(principal, id).await?;
        let today = Utc::now().date_naive();
        if !invoice.needs_payment_reminder(today) {
            return Ok(ReminderResult {
                sent: false,
                reason: Some("Invoice is not open, has no balance, or is not due within 3 days".into()),
            });
        }

        let client = self.client_of(principal, &invoice).await?;
        let trip = self.trip_of(principal, &invoice).await?;
        let outcome = self
            .email
            .send_payment_reminder(&client, &invoice, trip.as_ref(), EmailSender::from_principal(principal), today)
            .await?;
        Ok(match outcome {
            Some(o) if o.sent => ReminderResult { sent: true, reason: None },
            Some(_) => ReminderResult { sent: false, reason: Some("Email delivery failed".into()) },
            None => ReminderResult { sent: false, reason: Some("Client has no email address".into()) },
        })
    }
}
