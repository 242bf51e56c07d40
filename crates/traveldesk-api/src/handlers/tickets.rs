//! Support ticket handlers: staff desk and the tenant-side `/my/tickets`

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use traveldesk_core::domain::{SupportTicket, TicketComment};
use traveldesk_core::repositories::TicketListRow;
use traveldesk_core::services::{NewComment, NewOwnTicket, NewTicket, TicketDetail};
use traveldesk_shared::types::Page;

use crate::dto::{AssignTicketRequest, CommentRequest, ResolveTicketRequest, StatusRequest, TicketListQuery};
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

// ---- Staff ----

/// GET /api/v1/tickets?assigned=me|unassigned|{user_id}
pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Page<TicketListRow>> {
    let filter = query.filter(principal.id());
    ok(state.tickets.list(&principal, &filter, query.pagination()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewTicket>,
) -> Created<SupportTicket> {
    created(state.tickets.create(&principal, input).await?)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TicketDetail> {
    ok(state.tickets.detail(&principal, &id).await?)
}

pub async fn comment(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewComment>,
) -> Created<TicketComment> {
    created(state.tickets.comment(&principal, &id, input).await?)
}

pub async fn assign_to_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SupportTicket> {
    ok(state.tickets.assign_to_me(&principal, &id).await?)
}

pub async fn assign(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignTicketRequest>,
) -> ApiResult<SupportTicket> {
    ok(state.tickets.assign(&principal, &id, &request.staff_id).await?)
}

pub async fn resolve(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveTicketRequest>,
) -> ApiResult<SupportTicket> {
    ok(state.tickets.resolve(&principal, &id, &request.resolution).await?)
}

pub async fn change_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<SupportTicket> {
    ok(state.tickets.change_status(&principal, &id, &request.status).await?)
}

// ---- Tenant users ----

pub async fn list_own(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Page<TicketListRow>> {
    let filter = query.filter(principal.id());
    ok(state.tickets.list_own(&principal, filter, query.pagination()).await?)
}

pub async fn create_own(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewOwnTicket>,
) -> Created<SupportTicket> {
    created(state.tickets.create_own(&principal, input).await?)
}

pub async fn detail_own(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TicketDetail> {
    ok(state.tickets.detail_own(&principal, &id).await?)
}

pub async fn comment_own(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CommentRequest>,
) -> Created<TicketComment> {
    created(state.tickets.comment_own(&principal, &id, &request.content).await?)
}
