// ============================================================================
// TravelDesk API - Trip Handlers
// File: crates/traveldesk-api/src/handlers/trips.rs
// ============================================================================
//! Trip builder handlers: trips, line items, itinerary, travelers, emails

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use traveldesk_core::domain::{Trip, TripItinerary, TripLineItem, TripParticipant};
use traveldesk_core::services::{
    EmailOutcome, ItineraryDayInput, LineItemInput, NewParticipant, NewTrip, PushResult, StatusChange,
    StatusChangeResult, TripDetail, TripEmailKind, TripListResult, TripUpdate,
};

use crate::dto::{EmailItineraryRequest, TripListQuery};
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<TripListQuery>,
) -> ApiResult<TripListResult> {
    ok(state.trips.list(&principal, &query.filter(), query.pagination()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewTrip>,
) -> Created<Trip> {
    created(state.trips.create(&principal, input).await?)
}

pub async fn detail(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TripDetail> {
    ok(state.trips.detail(&principal, &id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<TripUpdate>,
) -> ApiResult<Trip> {
    ok(state.trips.update(&principal, &id, changes).await?)
}

/// POST /api/v1/trips/{id}/status
///
/// Finalizing can create the trip invoice and notify the client.
pub async fn change_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> ApiResult<StatusChangeResult> {
    ok(state.trips.change_status(&principal, &id, change).await?)
}

// ---- Line items ----

pub async fn line_items(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<TripLineItem>> {
    ok(state.trips.line_items(&principal, &id).await?)
}

pub async fn add_line_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<LineItemInput>,
) -> Created<TripLineItem> {
    created(state.trips.add_line_item(&principal, &id, input).await?)
}

pub async fn update_line_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<LineItemInput>,
) -> ApiResult<TripLineItem> {
    ok(state.trips.update_line_item(&principal, &id, &item_id, input).await?)
}

pub async fn delete_line_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state.trips.delete_line_item(&principal, &id, &item_id).await?;
    ok(())
}

/// POST /api/v1/trips/{id}/line-items/{item_id}/push
pub async fn push_line_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<PushResult> {
    ok(state.trips.push_line_item(&principal, &id, &item_id).await?)
}

/// POST /api/v1/trips/{id}/line-items/push-all
pub async fn push_all(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<PushResult> {
    ok(state.trips.push_all(&principal, &id).await?)
}

// ---- Itinerary ----

pub async fn itinerary(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<TripItinerary>> {
    ok(state.trips.itinerary(&principal, &id).await?)
}

pub async fn add_itinerary_day(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ItineraryDayInput>,
) -> Created<TripItinerary> {
    created(state.trips.add_itinerary_day(&principal, &id, input).await?)
}

pub async fn update_itinerary_day(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, day_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ItineraryDayInput>,
) -> ApiResult<TripItinerary> {
    ok(state.trips.update_itinerary_day(&principal, &id, &day_id, input).await?)
}

/// Later days move up by one.
pub async fn delete_itinerary_day(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, day_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state.trips.delete_itinerary_day(&principal, &id, &day_id).await?;
    ok(())
}

pub async fn email_itinerary(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<EmailItineraryRequest>,
) -> ApiResult<Option<EmailOutcome>> {
    ok(state
        .trips
        .email_itinerary(&principal, &id, request.custom_message.as_deref())
        .await?)
}

// ---- Participants ----

pub async fn participants(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<TripParticipant>> {
    ok(state.trips.participants(&principal, &id).await?)
}

pub async fn add_participant(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewParticipant>,
) -> Created<TripParticipant> {
    created(state.trips.add_participant(&principal, &id, input).await?)
}

pub async fn remove_participant(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, participant_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state.trips.remove_participant(&principal, &id, &participant_id).await?;
    ok(())
}

/// POST /api/v1/trips/{id}/emails/{kind}
///
/// `kind` is `confirmation`, `itinerary-update` or `pre-departure`.
pub async fn send_email(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, kind)): Path<(Uuid, TripEmailKind)>,
) -> ApiResult<Option<EmailOutcome>> {
    ok(state.trips.send_trip_email(&principal, &id, kind).await?)
}
