// ============================================================================
// TravelDesk API - Impersonation Handlers
// File: crates/traveldesk-api/src/handlers/impersonation.rs
// ============================================================================
//! Staff impersonation: candidates, start, stop, status and extension.
//!
//! Once started, the client sends the returned token with every request in
//! the `X-Impersonation-Token` header (or `imp_token` query parameter).

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use traveldesk_core::domain::Principal;
use traveldesk_core::services::{ImpersonationCandidate, ImpersonationStarted, ImpersonationStatus};

use crate::dto::{ImpersonableUsersQuery, ImpersonationTokenRequest, StartImpersonationRequest};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub duration_minutes: i64,
}

/// A `token` query parameter wins over the token the request is running under.
fn session_token(principal: &Principal, explicit: Option<String>) -> Option<String> {
    explicit
        .filter(|t| !t.trim().is_empty())
        .or_else(|| principal.impersonator.as_ref().map(|i| i.token.clone()))
}

/// GET /api/v1/impersonation/users?tenant_id=
pub async fn users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ImpersonableUsersQuery>,
) -> ApiResult<Vec<ImpersonationCandidate>> {
    ok(state.impersonation.impersonable_users(&principal, query.tenant_id).await?)
}

/// POST /api/v1/impersonation/start
pub async fn start(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<StartImpersonationRequest>,
) -> Created<ImpersonationStarted> {
    created(state.impersonation.start(&principal, &request.user_id).await?)
}

/// POST /api/v1/impersonation/stop
pub async fn stop(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ImpersonationTokenRequest>,
) -> ApiResult<StopResponse> {
    let token = session_token(&principal, query.token)
        .ok_or_else(|| ApiError::BadRequest("No impersonation token".into()))?;
    let duration_minutes = state.impersonation.stop(&principal, &token).await?;
    ok(StopResponse { duration_minutes })
}

/// GET /api/v1/impersonation/status
///
/// `data` is null when the request is not impersonating.
pub async fn status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ImpersonationTokenRequest>,
) -> ApiResult<Option<ImpersonationStatus>> {
    match session_token(&principal, query.token) {
        Some(token) => ok(state.impersonation.status(&principal, &token).await?),
        None => ok(None),
    }
}

/// POST /api/v1/impersonation/extend
pub async fn extend(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<ImpersonationTokenRequest>,
) -> ApiResult<ImpersonationStatus> {
    let token = session_token(&principal, query.token)
        .ok_or_else(|| ApiError::BadRequest("No impersonation token".into()))?;
    ok(state.impersonation.extend(&principal, &token).await?)
}
