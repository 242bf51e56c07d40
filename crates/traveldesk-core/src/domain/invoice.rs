// ============================================================================
// TravelDesk Core - Invoice Entities
// File: crates/traveldesk-core/src/domain/invoice.rs
// Description: Client invoices, their lines, payments and installment plans
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use traveldesk_shared::constants::PAYMENT_REMINDER_WINDOW_DAYS;

text_enum! {
    pub enum InvoiceStatus {
        Draft => ("DRAFT", "Draft"),
        Sent => ("SENT", "Sent"),
        Viewed => ("VIEWED", "Viewed"),
        PartiallyPaid => ("PARTIALLY_PAID", "Partially Paid"),
        Paid => ("PAID", "Paid"),
        Overdue => ("OVERDUE", "Overdue"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
    default = Draft;
}

impl InvoiceStatus {
    /// Sent to the client and not yet paid.
    pub fn is_open(&self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Viewed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub client_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(client_id: Uuid, invoice_number: String, invoice_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            trip_id: None,
            created_by: None,
            invoice_number,
            status: InvoiceStatus::Draft,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            invoice_date,
            due_date: None,
            notes: None,
            terms: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `INV-YYYYMMDD-NNNN` where NNNN is a running sequence.
    pub fn dated_number(date: NaiveDate, sequence: i64) -> String {
        format!("INV-{}-{:04}", date.format("%Y%m%d"), sequence)
    }

    /// `INV-XXXXXXXX` from the first eight hex digits of the trip id.
    pub fn trip_number(trip_id: &Uuid) -> String {
        let simple = trip_id.simple().to_string();
        format!("INV-{}", simple[..8].to_uppercase())
    }

    pub fn balance_due(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.map(|due| due < today).unwrap_or(false) && self.balance_due() > Decimal::ZERO
    }

    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    /// Open with a balance, and due within the reminder window or already past due.
    pub fn needs_payment_reminder(&self, today: NaiveDate) -> bool {
        self.status.is_open()
            && self.balance_due() > Decimal::ZERO
            && self
                .days_until_due(today)
                .map(|days| days <= PAYMENT_REMINDER_WINDOW_DAYS)
                .unwrap_or(false)
    }

    /// Drafts and unpaid sent invoices may be deleted.
    pub fn can_delete(&self) -> bool {
        matches!(
            self.status,
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Viewed
        ) && self.paid_amount.is_zero()
    }

    pub fn recalculate(&mut self, lines: &[InvoiceLineItem]) {
        self.subtotal = lines.iter().map(|l| l.total_price).sum();
        self.total_amount = self.subtotal + self.tax_amount;
        self.updated_at = Utc::now();
    }

    /// Invoices without line items keep their stored subtotal.
    pub fn set_tax(&mut self, tax: Decimal, lines: &[InvoiceLineItem]) {
        self.tax_amount = tax;
        if lines.is_empty() {
            self.total_amount = self.subtotal + self.tax_amount;
            self.updated_at = Utc::now();
        } else {
            self.recalculate(lines);
        }
    }

    pub fn apply_payment(&mut self, amount: Decimal) {
        self.paid_amount += amount;
        self.status = if self.paid_amount >= self.total_amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvoiceLineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    #[validate(length(min = 1, max = 300, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl InvoiceLineItem {
    pub fn new(
        invoice_id: Uuid,
        description: &str,
        quantity: i32,
        unit_price: Decimal,
        total_price: Option<Decimal>,
    ) -> Result<Self, validator::ValidationErrors> {
        let line = Self {
            id: Uuid::new_v4(),
            invoice_id,
            description: description.trim().to_string(),
            quantity,
            unit_price,
            total_price: match total_price {
                Some(t) if !t.is_zero() => t,
                _ => Decimal::from(quantity) * unit_price,
            },
        };
        line.validate()?;
        Ok(line)
    }
}

text_enum! {
    pub enum PaymentMethod {
        Cash => ("CASH", "Cash"),
        Check => ("CHECK", "Check"),
        CreditCard => ("CREDIT_CARD", "Credit Card"),
        BankTransfer => ("BANK_TRANSFER", "Bank Transfer"),
        Online => ("ONLINE", "Online Payment"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

text_enum! {
    pub enum ScheduleStatus {
        Pending => ("PENDING", "Pending"),
        Paid => ("PAID", "Paid"),
        Overdue => ("OVERDUE", "Overdue"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
    default = Pending;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub installment_number: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: ScheduleStatus,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PaymentSchedule {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status == ScheduleStatus::Pending
    }

    pub fn mark_paid(&mut self, payment_id: Uuid) {
        self.status = ScheduleStatus::Paid;
        self.payment_id = Some(payment_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(total: Decimal) -> Invoice {
        let mut inv = Invoice::new(Uuid::new_v4(), "INV-TEST".into(), date(2025, 1, 1));
        inv.total_amount = total;
        inv
    }

    #[test]
    fn test_invoice_numbers() {
        assert_eq!(Invoice::dated_number(date(2025, 2, 7), 12), "INV-20250207-0012");
        let trip_id = Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
        assert_eq!(Invoice::trip_number(&trip_id), "INV-3FA85F64");
    }

    #[test]
    fn test_balance_and_overdue() {
        let mut inv = invoice(dec!(1000));
        inv.paid_amount = dec!(400);
        inv.due_date = Some(date(2025, 1, 31));
        assert_eq!(inv.balance_due(), dec!(600));
        assert!(!inv.is_overdue(date(2025, 1, 31)));
        assert!(inv.is_overdue(date(2025, 2, 1)));
        inv.paid_amount = dec!(1000);
        assert!(!inv.is_overdue(date(2025, 2, 1)));
    }

    #[test]
    fn test_payment_reminder_window() {
        let mut inv = invoice(dec!(800));
        inv.due_date = Some(date(2025, 3, 10));
        assert!(!inv.needs_payment_reminder(date(2025, 3, 7)));

        inv.status = InvoiceStatus::Sent;
        assert!(inv.needs_payment_reminder(date(2025, 3, 7)));
        assert!(!inv.needs_payment_reminder(date(2025, 3, 6)));
        assert!(inv.needs_payment_reminder(date(2025, 4, 1)));

        inv.paid_amount = dec!(800);
        assert!(!inv.needs_payment_reminder(date(2025, 3, 9)));
    }

    #[test]
    fn test_delete_rules() {
        let mut inv = invoice(dec!(100));
        assert!(inv.can_delete());
        inv.status = InvoiceStatus::Viewed;
        assert!(inv.can_delete());
        inv.paid_amount = dec!(10);
        assert!(!inv.can_delete());
        inv.paid_amount = Decimal::ZERO;
        inv.status = InvoiceStatus::Paid;
        assert!(!inv.can_delete());
    }

    #[test]
    fn test_recalculate_adds_tax() {
        let mut inv = invoice(Decimal::ZERO);
        inv.tax_amount = dec!(8.25);
        let lines = vec![
            InvoiceLineItem::new(inv.id, "Cruise: Alaska", 2, dec!(1200), None).unwrap(),
            InvoiceLineItem::new(inv.id, "Fees/Taxes: Port", 1, dec!(150), None).unwrap(),
        ];
        inv.recalculate(&lines);
        assert_eq!(inv.subtotal, dec!(2550));
        assert_eq!(inv.total_amount, dec!(2558.25));
    }

    #[test]
    fn test_set_tax_keeps_subtotal_without_lines() {
        let mut inv = invoice(dec!(4200));
        inv.set_tax(dec!(100), &[]);
        assert_eq!(inv.subtotal, dec!(4200));
        assert_eq!(inv.total_amount, dec!(4300));

        let lines = vec![InvoiceLineItem::new(inv.id, "Hotel", 1, dec!(900), None).unwrap()];
        inv.set_tax(dec!(50), &lines);
        assert_eq!(inv.subtotal, dec!(900));
        assert_eq!(inv.total_amount, dec!(950));
    }

    #[test]
    fn test_apply_payment_sets_status() {
        let mut inv = invoice(dec!(500));
        inv.apply_payment(dec!(200));
        assert_eq!(inv.status, InvoiceStatus::PartiallyPaid);
        inv.apply_payment(dec!(300));
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.balance_due(), Decimal::ZERO);
    }

    #[test]
    fn test_schedule_overdue() {
        let mut s = PaymentSchedule {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            installment_number: 1,
            amount: dec!(250),
            due_date: date(2025, 3, 1),
            status: ScheduleStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
        };
        assert!(s.is_overdue(date(2025, 3, 2)));
        s.mark_paid(Uuid::new_v4());
        assert!(!s.is_overdue(date(2025, 3, 2)));
    }
}
