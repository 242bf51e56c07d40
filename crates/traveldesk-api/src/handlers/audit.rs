use axum::extract::{Query, State};

use traveldesk_core::domain::AuditLog;
use traveldesk_shared::types::Page;

use crate::dto::AuditLogQuery;
use crate::middleware::AuthUser;
use crate::response::{ok, ApiResult};
use crate::state::AppState;

/// GET /api/v1/audit-logs
pub async fn list(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(query): Query<AuditLogQuery>,
) -> ApiResult<Page<AuditLog>> {
    ok(state.audit.list(&principal, &query.filter(), query.pagination()).await?)
}
