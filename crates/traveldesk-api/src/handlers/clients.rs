//! CRM client handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use traveldesk_core::domain::{Client, ClientCommunication, ClientNote};
use traveldesk_core::services::{
    ClientDetail, ClientListResult, ClientUpdate, CommunicationHistory, NewClient, NewCommunication, NewNote,
};

use crate::dto::ClientListQuery;
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ClientListQuery>,
) -> ApiResult<ClientListResult> {
    ok(state.clients.list(&principal, &query.filter(), query.pagination()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewClient>,
) -> Created<Client> {
    created(state.clients.create(&principal, input).await?)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ClientDetail> {
    ok(state.clients.detail(&principal, &id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<ClientUpdate>,
) -> ApiResult<Client> {
    ok(state.clients.update(&principal, &id, changes).await?)
}

/// DELETE /api/v1/clients/{id} - deactivates, history is kept
pub async fn deactivate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.clients.deactivate(&principal, &id).await?;
    ok(())
}

pub async fn notes(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ClientNote>> {
    ok(state.clients.list_notes(&principal, &id).await?)
}

pub async fn add_note(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewNote>,
) -> Created<ClientNote> {
    created(state.clients.add_note(&principal, &id, input).await?)
}

pub async fn communications(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CommunicationHistory> {
    ok(state.clients.communications(&principal, &id).await?)
}

/// POST /api/v1/clients/{id}/communications - log a call, meeting or message
pub async fn log_communication(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewCommunication>,
) -> Created<ClientCommunication> {
    created(state.clients.log_communication(&principal, &id, input).await?)
}
