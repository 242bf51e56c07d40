// ============================================================================
// TravelDesk API - Auth Handlers
// File: crates/traveldesk-api/src/handlers/auth.rs
// ============================================================================
//! Authentication HTTP handlers (login, logout, me, profile, passwords)

use axum::{extract::State, Json};
use validator::Validate;

use traveldesk_core::services::{LoginResult, MeResult, ProfileUpdate, UserInfo};

use crate::dto::{ChangePasswordRequest, LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest};
use crate::error::ApiError;
use crate::middleware::{AuthUser, ClientMeta};
use crate::response::{ok, ApiResult};
use crate::state::AppState;

/// Login handler - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResult> {
    payload.validate()?;
    if !state.login_limiter.check(meta.ip, &payload.username) {
        return Err(ApiError::TooManyRequests);
    }
    ok(state.auth.login(&payload.username, &payload.password, meta).await?)
}

/// Logout handler - POST /api/v1/auth/logout
///
/// Access tokens are stateless; logout only leaves an audit trail.
pub async fn logout(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<()> {
    state.auth.logout(&principal).await;
    ok(())
}

/// Current user - GET /api/v1/auth/me
pub async fn me(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<MeResult> {
    ok(state.auth.me(&principal))
}

/// Password change - POST /api/v1/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    payload.validate()?;
    state
        .auth
        .change_password(
            &principal,
            &payload.current_password,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;
    ok(())
}

/// Own profile - PUT /api/v1/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(changes): Json<ProfileUpdate>,
) -> ApiResult<UserInfo> {
    ok(state.auth.update_profile(&principal, changes).await?)
}

/// Reset link request - POST /api/v1/auth/password-reset
///
/// Always succeeds for a well-formed address; whether an account exists is not revealed.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<()> {
    payload.validate()?;
    if !state.login_limiter.check(meta.ip, &payload.email) {
        return Err(ApiError::TooManyRequests);
    }
    state.password_reset.request(&payload.email).await?;
    ok(())
}

/// Reset link use - POST /api/v1/auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ClientMeta(meta): ClientMeta,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> ApiResult<()> {
    payload.validate()?;
    state
        .password_reset
        .confirm(&payload.token, &payload.new_password, &payload.confirm_password, meta)
        .await?;
    ok(())
}
