//! HTTP error type and the `DomainError` status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use traveldesk_core::DomainError;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(errors.to_string())
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str) {
    use DomainError::*;
    match err {
        UserNotFound | TenantNotFound | ClientNotFound | TripNotFound | LineItemNotFound
        | ItineraryDayNotFound | ParticipantNotFound | InvoiceNotFound | InstallmentNotFound
        | TicketNotFound | ImpersonationNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),

        InvalidCredentials | UserNotActive => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),

        PermissionDenied(_) | ImpersonationNotAllowed(_) | CannotEditSelf | RoleNotAssignable(_)
        | TenantNotActive | NoTenant => (StatusCode::FORBIDDEN, "FORBIDDEN"),

        UsernameAlreadyExists(_) | EmailAlreadyExists(_) | TenantSubdomainAlreadyExists(_)
        | ItineraryDayExists(_) | InstallmentExists(_) | DuplicateInvoiceLine(_) => {
            (StatusCode::CONFLICT, "CONFLICT")
        }

        TenantMaxUsersReached | UnknownPermission(_) | PasswordMismatch | WeakPassword(_)
        | ClientHasNoEmail | InvoiceNotDeletable(_) | PaymentExceedsBalance(_) | InvalidStatus(_)
        | ResolutionRequired | EmptyComment | InvalidResetToken | ValidationError(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        }

        EmailDeliveryFailed(_) => (StatusCode::BAD_GATEWAY, "EMAIL_DELIVERY_FAILED"),

        PasswordHashError(_) | TokenGenerationError(_) | UnableToGenerateUniqueNumber
        | TemplateError(_) | DatabaseError(_) | CacheError(_) | InternalError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => domain_status(e).0,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Domain(e) => {
                let (status, code) = domain_status(e);
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", e);
                    // Storage and template details stay in the log.
                    let message = match e {
                        DomainError::EmailDeliveryFailed(_) => e.to_string(),
                        _ => "Internal server error".to_string(),
                    };
                    (status, code, message)
                } else {
                    tracing::warn!("Request refused: {}", e);
                    (status, code, e.to_string())
                }
            }
            ApiError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            ApiError::TooManyRequests => {
                tracing::warn!("Rate limit exceeded");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "Too many attempts, try again later".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal server error".to_string())
            }
        };

        (status, Json(ApiResponse::<()>::error(code, &message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_status_mapping() {
        let cases = [
            (DomainError::ClientNotFound, StatusCode::NOT_FOUND),
            (DomainError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (DomainError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (DomainError::EmailAlreadyExists("a@b.c".into()), StatusCode::CONFLICT),
            (DomainError::PaymentExceedsBalance("$10.00".into()), StatusCode::BAD_REQUEST),
            (DomainError::InvalidResetToken, StatusCode::BAD_REQUEST),
            (DomainError::DatabaseError("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ApiError::from(DomainError::DatabaseError("relation clients missing".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
