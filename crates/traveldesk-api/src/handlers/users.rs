//! User administration handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use traveldesk_core::domain::{RoleInfo, UserPermissionOverride};
use traveldesk_core::services::{NewUser, OverrideRequest, UserDetail, UserInfo, UserUpdate};
use traveldesk_shared::types::Page;

use crate::dto::{SetPasswordRequest, UserListQuery};
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Page<UserInfo>> {
    ok(state.users.list(&principal, query.filter(), query.pagination()).await?)
}

/// GET /api/v1/users/assignable-roles
pub async fn assignable_roles(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<Vec<RoleInfo>> {
    ok(state.users.assignable_roles(&principal))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewUser>,
) -> Created<UserInfo> {
    let user = state.users.create(&principal, input).await?;
    created(UserInfo::from(&user))
}

/// GET /api/v1/users/{id}
pub async fn get(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<UserDetail> {
    ok(state.users.get(&principal, &id).await?)
}

/// POST /api/v1/users/{id}/password
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPasswordRequest>,
) -> ApiResult<()> {
    payload.validate()?;
    state
        .users
        .set_password(&principal, &id, &payload.new_password, &payload.confirm_password)
        .await?;
    ok(())
}

/// PUT /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<UserUpdate>,
) -> ApiResult<UserInfo> {
    let user = state.users.update(&principal, &id, changes).await?;
    ok(UserInfo::from(&user))
}

/// DELETE /api/v1/users/{id}
///
/// Users are deactivated, never removed.
pub async fn deactivate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.users.deactivate(&principal, &id).await?;
    ok(())
}

/// POST /api/v1/users/{id}/overrides
pub async fn set_override(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<OverrideRequest>,
) -> ApiResult<UserPermissionOverride> {
    ok(state.users.set_override(&principal, &id, request).await?)
}

/// DELETE /api/v1/users/{id}/overrides/{codename}
pub async fn remove_override(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path((id, codename)): Path<(Uuid, String)>,
) -> ApiResult<bool> {
    ok(state.users.remove_override(&principal, &id, &codename).await?)
}
