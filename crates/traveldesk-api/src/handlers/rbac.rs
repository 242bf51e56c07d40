//! Permission catalog, role grants and seeding

use axum::extract::State;

use traveldesk_core::domain::PermissionDef;
use traveldesk_core::services::{RoleSummary, SeedReport};

use crate::middleware::AuthUser;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

pub async fn permissions(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
) -> ApiResult<&'static [PermissionDef]> {
    ok(state.rbac.catalog())
}

pub async fn roles(State(state): State<AppState>, AuthUser(_principal): AuthUser) -> ApiResult<Vec<RoleSummary>> {
    ok(state.rbac.roles().await?)
}

/// POST /api/v1/rbac/seed - super admins only
pub async fn seed(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<SeedReport> {
    ok(state.rbac.seed_as(&principal).await?)
}
