use axum::{extract::State, http::StatusCode, Form, Json};

use traveldesk_core::services::{InboundEmail, InboundResult};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/webhooks/mailgun/inbound
///
/// Always 202 once parsed, so the provider does not retry unmatched senders.
pub async fn mailgun_inbound(
    State(state): State<AppState>,
    Form(inbound): Form<InboundEmail>,
) -> Result<(StatusCode, Json<ApiResponse<InboundResult>>), ApiError> {
    let result = state.email.process_inbound(inbound).await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(result))))
}
