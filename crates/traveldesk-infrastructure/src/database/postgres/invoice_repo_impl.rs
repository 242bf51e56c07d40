// ============================================================================
// TravelDesk Infrastructure - PostgreSQL Invoice Repository
// File: crates/traveldesk-infrastructure/src/database/postgres/invoice_repo_impl.rs
// Description: Invoices, their lines, payments and installment schedules
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use traveldesk_core::domain::{
    format_usd_cents, Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentMethod, PaymentSchedule,
    ScheduleStatus, Trip,
};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{InvoiceFilter, InvoiceListRow, InvoiceRepository, InvoiceTotals};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, is_unique_violation, like_pattern};

const INVOICE_COLUMNS: &str = r#"
    i.id, i.client_id, i.trip_id, i.created_by, i.invoice_number, i.status, i.subtotal,
    i.tax_amount, i.total_amount, i.paid_amount, i.invoice_date, i.due_date, i.notes, i.terms,
    i.created_at, i.updated_at
"#;

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, payment_date, payment_method, reference_number, notes, created_by, created_at";

const SCHEDULE_COLUMNS: &str = "id, invoice_id, installment_number, amount, due_date, status, payment_id, created_at";

/// Statuses whose balance is still owed.
const OPEN_STATUSES: &str = "('SENT', 'VIEWED')";

pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, tenant_id: Uuid, filter: &InvoiceFilter, today: NaiveDate) {
        qb.push(" WHERE c.tenant_id = ").push_bind(tenant_id);
        if let Some(status) = filter.status {
            qb.push(" AND i.status = ").push_bind(status.as_str());
        }
        if filter.overdue_only {
            qb.push(" AND i.status IN ")
                .push(OPEN_STATUSES)
                .push(" AND i.due_date < ")
                .push_bind(today);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND i.client_id = ").push_bind(client_id);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (i.invoice_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn open_balance(&self, context: &str, sql: &str, id: &Uuid) -> Result<Decimal, DomainError> {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(context, e))
    }
}

async fn insert_invoice<'e, E>(executor: E, invoice: &Invoice) -> Result<InvoiceRow, DomainError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        r#"
        INSERT INTO invoices AS i (
            id, client_id, trip_id, created_by, invoice_number, status, subtotal,
            tax_amount, total_amount, paid_amount, invoice_date, due_date, notes, terms,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {}
        "#,
        INVOICE_COLUMNS
    ))
    .bind(invoice.id)
    .bind(invoice.client_id)
    .bind(invoice.trip_id)
    .bind(invoice.created_by)
    .bind(&invoice.invoice_number)
    .bind(invoice.status.as_str())
    .bind(invoice.subtotal)
    .bind(invoice.tax_amount)
    .bind(invoice.total_amount)
    .bind(invoice.paid_amount)
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(&invoice.notes)
    .bind(&invoice.terms)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .fetch_one(executor)
    .await
    .map_err(|e: sqlx::Error| {
        if is_unique_violation(&e) {
            DomainError::UnableToGenerateUniqueNumber
        } else {
            error!("Database error creating invoice: {}", e);
            DomainError::DatabaseError(e.to_string())
        }
    })
}

async fn insert_line<'e, E>(executor: E, line: &InvoiceLineItem) -> Result<LineRow, DomainError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO invoice_line_items (id, invoice_id, description, quantity, unit_price, total_price)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, invoice_id, description, quantity, unit_price, total_price
        "#,
    )
    .bind(line.id)
    .bind(line.invoice_id)
    .bind(&line.description)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.total_price)
    .fetch_one(executor)
    .await
    .map_err(|e| db_error("adding invoice line", e))
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    client_id: Uuid,
    trip_id: Option<Uuid>,
    created_by: Option<Uuid>,
    invoice_number: String,
    status: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    paid_amount: Decimal,
    invoice_date: NaiveDate,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    terms: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            client_id: row.client_id,
            trip_id: row.trip_id,
            created_by: row.created_by,
            invoice_number: row.invoice_number,
            status: InvoiceStatus::from_str(&row.status).unwrap_or_default(),
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            invoice_date: row.invoice_date,
            due_date: row.due_date,
            notes: row.notes,
            terms: row.terms,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceListDbRow {
    #[sqlx(flatten)]
    invoice: InvoiceRow,
    client_name: String,
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    outstanding: Decimal,
    overdue: Decimal,
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    invoice_id: Uuid,
    description: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

impl From<LineRow> for InvoiceLineItem {
    fn from(row: LineRow) -> Self {
        InvoiceLineItem {
            id: row.id,
            invoice_id: row.invoice_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    invoice_id: Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    payment_method: String,
    reference_number: Option<String>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            invoice_id: row.invoice_id,
            amount: row.amount,
            payment_date: row.payment_date,
            payment_method: PaymentMethod::from_str(&row.payment_method).unwrap_or_default(),
            reference_number: row.reference_number,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: Uuid,
    invoice_id: Uuid,
    installment_number: i32,
    amount: Decimal,
    due_date: NaiveDate,
    status: String,
    payment_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ScheduleRow> for PaymentSchedule {
    fn from(row: ScheduleRow) -> Self {
        PaymentSchedule {
            id: row.id,
            invoice_id: row.invoice_id,
            installment_number: row.installment_number,
            amount: row.amount,
            due_date: row.due_date,
            status: ScheduleStatus::from_str(&row.status).unwrap_or_default(),
            payment_id: row.payment_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE i.id = $1 AND c.tenant_id = $2
            "#,
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding invoice by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices i WHERE i.invoice_number = $1",
            INVOICE_COLUMNS
        ))
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding invoice by number", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_for_trip(&self, trip_id: &Uuid) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices i WHERE i.trip_id = $1 ORDER BY i.created_at LIMIT 1",
            INVOICE_COLUMNS
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding invoice for trip", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn count_all(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting invoices", e))
    }

    async fn create(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let row = insert_invoice(&self.pool, invoice).await?;
        info!("Invoice created: {} ({})", row.invoice_number, row.id);
        Ok(row.into())
    }

    async fn create_with_lines(&self, invoice: &Invoice, lines: &[InvoiceLineItem]) -> Result<Invoice, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let row = insert_invoice(&mut *tx, invoice).await?;
        for line in lines {
            insert_line(&mut *tx, line).await?;
        }

        tx.commit().await.map_err(|e| db_error("committing invoice", e))?;
        info!("Invoice created: {} ({}) with {} lines", row.invoice_number, row.id, lines.len());
        Ok(row.into())
    }

    async fn create_for_trip_status(&self, trip: &Trip, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let updated = sqlx::query("UPDATE trips SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(trip.id)
            .bind(trip.status.as_str())
            .bind(trip.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("updating trip status", e))?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::TripNotFound);
        }

        let row = insert_invoice(&mut *tx, invoice).await?;

        tx.commit().await.map_err(|e| db_error("committing trip invoice", e))?;
        info!("Invoice {} created with trip {} status {}", row.invoice_number, trip.id, trip.status.as_str());
        Ok(row.into())
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE invoices AS i SET
                trip_id = $2, status = $3, subtotal = $4, tax_amount = $5, total_amount = $6,
                paid_amount = $7, invoice_date = $8, due_date = $9, notes = $10, terms = $11,
                updated_at = NOW()
            WHERE i.id = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice.id)
        .bind(invoice.trip_id)
        .bind(invoice.status.as_str())
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total_amount)
        .bind(invoice.paid_amount)
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(&invoice.terms)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating invoice", e))?;

        row.map(|r| r.into()).ok_or(DomainError::InvoiceNotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting invoice", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &InvoiceFilter,
        today: NaiveDate,
        pagination: Pagination,
    ) -> Result<Page<InvoiceListRow>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM invoices i JOIN clients c ON c.id = i.client_id");
        Self::push_filters(&mut count_qb, *tenant_id, filter, today);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting invoices", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"
            SELECT {}, TRIM(c.first_name || ' ' || c.last_name) AS client_name
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            "#,
            INVOICE_COLUMNS
        ));
        Self::push_filters(&mut qb, *tenant_id, filter, today);
        qb.push(" ORDER BY i.invoice_date DESC, i.created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<InvoiceListDbRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing invoices", e))?;

        let items = rows
            .into_iter()
            .map(|r| InvoiceListRow { invoice: r.invoice.into(), client_name: r.client_name })
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    async fn totals(&self, tenant_id: &Uuid, today: NaiveDate) -> Result<InvoiceTotals, DomainError> {
        let row: TotalsRow = sqlx::query_as(&format!(
            r#"
            SELECT
                COALESCE(SUM(i.total_amount - i.paid_amount), 0) AS outstanding,
                COALESCE(SUM(i.total_amount - i.paid_amount) FILTER (WHERE i.due_date < $2), 0) AS overdue
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE c.tenant_id = $1 AND i.status IN {}
            "#,
            OPEN_STATUSES
        ))
        .bind(tenant_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("summing invoice totals", e))?;

        Ok(InvoiceTotals { outstanding: row.outstanding, overdue: row.overdue })
    }

    async fn pending_balance_for_client(&self, client_id: &Uuid) -> Result<Decimal, DomainError> {
        self.open_balance(
            "summing client balance",
            &format!(
                "SELECT COALESCE(SUM(total_amount - paid_amount), 0) FROM invoices WHERE client_id = $1 AND status IN {}",
                OPEN_STATUSES
            ),
            client_id,
        )
        .await
    }

    async fn pending_payments(&self, tenant_id: &Uuid) -> Result<Decimal, DomainError> {
        self.open_balance(
            "summing pending payments",
            r#"
            SELECT COALESCE(SUM(i.total_amount - i.paid_amount), 0)
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE c.tenant_id = $1 AND i.status IN ('SENT', 'VIEWED', 'PARTIALLY_PAID')
            "#,
            tenant_id,
        )
        .await
    }

    async fn recent_for_client(&self, client_id: &Uuid, limit: i64) -> Result<Vec<Invoice>, DomainError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices i WHERE i.client_id = $1 ORDER BY i.invoice_date DESC, i.created_at DESC LIMIT $2",
            INVOICE_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing client invoices", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn overdue(&self, tenant_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Invoice>, DomainError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE c.tenant_id = $1 AND i.status IN {} AND i.due_date < $2
            ORDER BY i.due_date ASC
            LIMIT $3
            "#,
            INVOICE_COLUMNS, OPEN_STATUSES
        ))
        .bind(tenant_id)
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing overdue invoices", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------

    async fn list_lines(&self, invoice_id: &Uuid) -> Result<Vec<InvoiceLineItem>, DomainError> {
        let rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT id, invoice_id, description, quantity, unit_price, total_price
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY description
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing invoice lines", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_line(&self, line: &InvoiceLineItem) -> Result<InvoiceLineItem, DomainError> {
        Ok(insert_line(&self.pool, line).await?.into())
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    async fn list_payments(&self, invoice_id: &Uuid) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE invoice_id = $1 ORDER BY payment_date DESC, created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing payments", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_payment(
        &self,
        payment: &Payment,
        installment_id: Option<Uuid>,
    ) -> Result<(Payment, Invoice), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        // 1. Invoice totals, only while the stored balance covers the amount
        let invoice: Option<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE invoices AS i SET
                paid_amount = i.paid_amount + $2,
                status = CASE WHEN i.paid_amount + $2 >= i.total_amount THEN 'PAID' ELSE 'PARTIALLY_PAID' END,
                updated_at = NOW()
            WHERE i.id = $1 AND i.paid_amount + $2 <= i.total_amount
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("updating invoice after payment", e))?;

        let Some(invoice) = invoice else {
            let balance: Option<Decimal> =
                sqlx::query_scalar("SELECT total_amount - paid_amount FROM invoices WHERE id = $1")
                    .bind(payment.invoice_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("reading invoice balance", e))?;
            return match balance {
                Some(balance) => Err(DomainError::PaymentExceedsBalance(format_usd_cents(balance))),
                None => Err(DomainError::InvoiceNotFound),
            };
        };

        // 2. Payment row
        let row: PaymentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payments ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {cols}
            "#,
            cols = PAYMENT_COLUMNS
        ))
        .bind(payment.id)
        .bind(payment.invoice_id)
        .bind(payment.amount)
        .bind(payment.payment_date)
        .bind(payment.payment_method.as_str())
        .bind(&payment.reference_number)
        .bind(&payment.notes)
        .bind(payment.created_by)
        .bind(payment.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("inserting payment", e))?;

        // 3. Installment, when the payment settles one
        if let Some(installment_id) = installment_id {
            sqlx::query(
                "UPDATE payment_schedules SET status = 'PAID', payment_id = $3 WHERE id = $1 AND invoice_id = $2",
            )
            .bind(installment_id)
            .bind(payment.invoice_id)
            .bind(payment.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("marking installment paid", e))?;
        }

        tx.commit().await.map_err(|e| db_error("committing payment", e))?;
        info!("Payment {} recorded on invoice {}", row.id, invoice.invoice_number);
        Ok((row.into(), invoice.into()))
    }

    // ------------------------------------------------------------------
    // Installments
    // ------------------------------------------------------------------

    async fn list_schedule(&self, invoice_id: &Uuid) -> Result<Vec<PaymentSchedule>, DomainError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_schedules WHERE invoice_id = $1 ORDER BY installment_number",
            SCHEDULE_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing payment schedule", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_installment(&self, invoice_id: &Uuid, id: &Uuid) -> Result<Option<PaymentSchedule>, DomainError> {
        let row: Option<ScheduleRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_schedules WHERE invoice_id = $1 AND id = $2",
            SCHEDULE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding installment", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn add_installment(&self, installment: &PaymentSchedule) -> Result<PaymentSchedule, DomainError> {
        let row: ScheduleRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payment_schedules ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {cols}
            "#,
            cols = SCHEDULE_COLUMNS
        ))
        .bind(installment.id)
        .bind(installment.invoice_id)
        .bind(installment.installment_number)
        .bind(installment.amount)
        .bind(installment.due_date)
        .bind(installment.status.as_str())
        .bind(installment.payment_id)
        .bind(installment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::InstallmentExists(installment.installment_number)
            } else {
                error!("Database error adding installment: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        Ok(row.into())
    }
}
