use axum::extract::State;

use traveldesk_core::services::{CrmDashboard, StaffDashboard};

use crate::middleware::AuthUser;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

/// GET /api/v1/dashboard/crm
pub async fn crm(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<CrmDashboard> {
    ok(state.dashboard.crm(&principal).await?)
}

/// GET /api/v1/dashboard/staff
pub async fn staff(State(state): State<AppState>, AuthUser(principal): AuthUser) -> ApiResult<StaffDashboard> {
    ok(state.dashboard.staff(&principal).await?)
}
