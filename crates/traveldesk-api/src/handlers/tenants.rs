//! Tenant management handlers (staff only)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use traveldesk_core::domain::Tenant;
use traveldesk_core::services::{NewTenant, NewUser, TenantDetail, TenantUpdate, TenantUserSummary, UserInfo};
use traveldesk_shared::types::Page;

use crate::dto::TenantListQuery;
use crate::middleware::AuthUser;
use crate::response::{created, ok, ApiResult, Created};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<TenantListQuery>,
) -> ApiResult<Page<Tenant>> {
    ok(state.tenants.list(&principal, &query.filter(), query.pagination()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(input): Json<NewTenant>,
) -> Created<Tenant> {
    created(state.tenants.create(&principal, input).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<TenantDetail> {
    ok(state.tenants.get(&principal, &id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<TenantUpdate>,
) -> ApiResult<Tenant> {
    ok(state.tenants.update(&principal, &id, changes).await?)
}

/// POST /api/v1/tenants/{id}/trial
pub async fn start_trial(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    ok(state.tenants.start_trial(&principal, &id).await?)
}

/// POST /api/v1/tenants/{id}/convert
pub async fn convert(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    ok(state.tenants.convert_to_client(&principal, &id).await?)
}

pub async fn suspend(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    ok(state.tenants.suspend(&principal, &id).await?)
}

pub async fn activate(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Tenant> {
    ok(state.tenants.activate(&principal, &id).await?)
}

/// GET /api/v1/tenants/{id}/users
pub async fn users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<TenantUserSummary>> {
    ok(state.users.tenant_users(&principal, &id).await?)
}

/// POST /api/v1/tenants/{id}/users
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewUser>,
) -> Created<UserInfo> {
    let user = state.users.create_tenant_user(&principal, id, input).await?;
    created(UserInfo::from(&user))
}
