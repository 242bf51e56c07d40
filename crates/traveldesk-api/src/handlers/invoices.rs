//! Invoice, payment and installment handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use traveldesk_core::domain::{Invoice, PaymentSchedule};
use traveldesk_core::services::{
    InvoiceDetail, InvoiceListResult, InvoiceSent, InvoiceUpdate, NewInstallment, NewInvoice, NewPayment,
    PaymentRecorded, ReminderResult,
};

use crate::dto::InvoiceListQuery;
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<InvoiceListResult> {
    ok(state.invoices.list(&principal, &query.filter(), query.pagination()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewInvoice>,
) -> Created<Invoice> {
    created(state.invoices.create(&principal, input).await?)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceDetail> {
    ok(state.invoices.detail(&principal, &id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<InvoiceUpdate>,
) -> ApiResult<Invoice> {
    ok(state.invoices.update(&principal, &id, changes).await?)
}

/// DELETE /api/v1/invoices/{id} - only while nothing has been paid
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.invoices.delete(&principal, &id).await?;
    ok(())
}

/// POST /api/v1/invoices/{id}/send
pub async fn send(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<InvoiceSent> {
    ok(state.invoices.send(&principal, &id).await?)
}

/// POST /api/v1/invoices/{id}/payments
pub async fn record_payment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewPayment>,
) -> Created<PaymentRecorded> {
    created(state.invoices.record_payment(&principal, &id, input).await?)
}

pub async fn schedule(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<PaymentSchedule>> {
    ok(state.invoices.schedule(&principal, &id).await?)
}

pub async fn add_installment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewInstallment>,
) -> Created<PaymentSchedule> {
    created(state.invoices.add_installment(&principal, &id, input).await?)
}

/// POST /api/v1/invoices/{id}/reminder
pub async fn send_reminder(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ReminderResult> {
    ok(state.invoices.send_reminder(&principal, &id).await?)
}
