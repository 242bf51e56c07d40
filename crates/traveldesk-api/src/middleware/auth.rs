// ============================================================================
// TravelDesk API - Request Authentication
// File: crates/traveldesk-api/src/middleware/auth.rs
// Description: Bearer JWT extractor with per-request impersonation substitution
// ============================================================================

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Query};
use axum::http::{header, request::Parts};
use serde::Deserialize;
use tracing::{debug, warn};

use traveldesk_core::domain::{Impersonator, Principal, RequestMeta};
use traveldesk_core::DomainError;
use traveldesk_shared::constants::IMPERSONATION_HEADER;
use traveldesk_shared::utils::client_ip;

use crate::error::ApiError;
use crate::state::AppState;

/// Origin of the request: client address and user agent.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub RequestMeta);

impl FromRequestParts<AppState> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta(request_meta(parts, state.trust_forwarded_for)))
    }
}

/// X-Forwarded-For is client-controlled unless a trusted proxy rewrites it,
/// so it is only read when `trust_forwarded_for` is set.
fn request_meta(parts: &Parts, trust_forwarded_for: bool) -> RequestMeta {
    let forwarded_for = parts
        .headers
        .get("x-forwarded-for")
        .filter(|_| trust_forwarded_for)
        .and_then(|v| v.to_str().ok());
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let user_agent = parts
        .headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    RequestMeta { ip: client_ip(forwarded_for, peer), user_agent }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Debug, Deserialize)]
struct ImpersonationQuery {
    imp_token: Option<String>,
}

/// Header first, then the `imp_token` query parameter.
fn impersonation_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(IMPERSONATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<ImpersonationQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.imp_token)
            .filter(|t| !t.is_empty())
    })
}

/// The acting user of an authenticated request.
///
/// When a valid impersonation token owned by the authenticated user is
/// present, the principal is the impersonated user and carries the staff
/// member as its impersonator. Unknown, expired or foreign tokens are ignored.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;
        let claims = state
            .jwt
            .validate_token(token)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
        let user_id = claims.user_id().map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        let meta = request_meta(parts, state.trust_forwarded_for);
        let principal = state
            .auth
            .principal_for(&user_id, meta.clone())
            .await
            .map_err(|e| match e {
                DomainError::UserNotFound | DomainError::UserNotActive => ApiError::Unauthorized(e.to_string()),
                other => ApiError::Domain(other),
            })?;

        let Some(imp_token) = impersonation_token(parts) else {
            return Ok(AuthUser(principal));
        };
        let Some(session) = state.impersonation.resolve(&imp_token, &principal.id()).await else {
            return Ok(AuthUser(principal));
        };

        match state.auth.principal_for(&session.target_user_id, meta).await {
            Ok(mut impersonated) => {
                debug!("{} acting as {}", principal.user.username, impersonated.user.username);
                impersonated.impersonator = Some(Impersonator {
                    user_id: principal.id(),
                    username: principal.user.username.clone(),
                    token: imp_token,
                });
                Ok(AuthUser(impersonated))
            }
            Err(e) => {
                warn!("Impersonation target {} unavailable: {}", session.target_user_id, e);
                Ok(AuthUser(principal))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        let p = parts(Request::builder().header("authorization", "Bearer abc.def"));
        assert_eq!(bearer_token(&p), Some("abc.def"));

        let p = parts(Request::builder().header("authorization", "Basic Zm9v"));
        assert_eq!(bearer_token(&p), None);

        let p = parts(Request::builder().header("authorization", "Bearer "));
        assert_eq!(bearer_token(&p), None);
    }

    #[test]
    fn test_impersonation_token_header_wins_over_query() {
        let p = parts(
            Request::builder()
                .uri("/api/v1/clients?imp_token=from-query&page=2")
                .header("x-impersonation-token", "from-header"),
        );
        assert_eq!(impersonation_token(&p).as_deref(), Some("from-header"));

        let p = parts(Request::builder().uri("/api/v1/clients?page=2&imp_token=from-query"));
        assert_eq!(impersonation_token(&p).as_deref(), Some("from-query"));

        let p = parts(Request::builder().uri("/api/v1/clients?page=2"));
        assert_eq!(impersonation_token(&p), None);
    }

    #[test]
    fn test_request_meta_uses_forwarded_for_behind_trusted_proxy() {
        let mut p = parts(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("user-agent", "curl/8.0"),
        );
        p.extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        let meta = request_meta(&p, true);
        assert_eq!(meta.ip.map(|ip| ip.to_string()).as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_request_meta_ignores_forwarded_for_by_default() {
        let mut p = parts(Request::builder().header("x-forwarded-for", "198.51.100.1"));
        p.extensions.insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 44], 4000))));
        let meta = request_meta(&p, false);
        assert_eq!(meta.ip.map(|ip| ip.to_string()).as_deref(), Some("192.0.2.44"));

        let p = parts(Request::builder().header("x-forwarded-for", "198.51.100.1"));
        assert_eq!(request_meta(&p, false).ip, None);
    }
}
