// ============================================================================
// TravelDesk API - Router
// File: crates/traveldesk-api/src/router.rs
// ============================================================================

use std::time::Duration;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use traveldesk_shared::config::AppSettings;

use crate::handlers::{
    audit, auth, clients, dashboard, health, impersonation, invoices, rbac, tenants, tickets, trips, users,
    webhooks,
};
use crate::state::AppState;

/// `*` allows any origin; anything else must be a single exact origin.
fn build_cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin.trim() == "*" {
        return cors.allow_origin(Any);
    }
    match HeaderValue::from_str(origin.trim()) {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, cross-origin requests disabled", origin);
            cors
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route("/auth/password-reset/confirm", post(auth::confirm_password_reset))
        // Users
        .route("/users", get(users::list).post(users::create))
        .route("/users/assignable-roles", get(users::assignable_roles))
        .route("/users/{id}", get(users::get).put(users::update).delete(users::deactivate))
        .route("/users/{id}/password", post(users::set_password))
        .route("/users/{id}/overrides", post(users::set_override))
        .route("/users/{id}/overrides/{codename}", axum::routing::delete(users::remove_override))
        // Tenants
        .route("/tenants", get(tenants::list).post(tenants::create))
        .route("/tenants/{id}", get(tenants::get).put(tenants::update))
        .route("/tenants/{id}/trial", post(tenants::start_trial))
        .route("/tenants/{id}/convert", post(tenants::convert))
        .route("/tenants/{id}/suspend", post(tenants::suspend))
        .route("/tenants/{id}/activate", post(tenants::activate))
        .route("/tenants/{id}/users", get(tenants::users).post(tenants::create_user))
        // RBAC and audit
        .route("/rbac/permissions", get(rbac::permissions))
        .route("/rbac/roles", get(rbac::roles))
        .route("/rbac/seed", post(rbac::seed))
        .route("/audit-logs", get(audit::list))
        // Impersonation
        .route("/impersonation/users", get(impersonation::users))
        .route("/impersonation/start", post(impersonation::start))
        .route("/impersonation/stop", post(impersonation::stop))
        .route("/impersonation/status", get(impersonation::status))
        .route("/impersonation/extend", post(impersonation::extend))
        // Clients
        .route("/clients", get(clients::list).post(clients::create))
        .route(
            "/clients/{id}",
            get(clients::detail).put(clients::update).delete(clients::deactivate),
        )
        .route("/clients/{id}/notes", get(clients::notes).post(clients::add_note))
        .route(
            "/clients/{id}/communications",
            get(clients::communications).post(clients::log_communication),
        )
        // Trips
        .route("/trips", get(trips::list).post(trips::create))
        .route("/trips/{id}", get(trips::detail).put(trips::update))
        .route("/trips/{id}/status", post(trips::change_status))
        .route("/trips/{id}/line-items", get(trips::line_items).post(trips::add_line_item))
        .route("/trips/{id}/line-items/push-all", post(trips::push_all))
        .route(
            "/trips/{id}/line-items/{item_id}",
            put(trips::update_line_item).delete(trips::delete_line_item),
        )
        .route("/trips/{id}/line-items/{item_id}/push", post(trips::push_line_item))
        .route("/trips/{id}/itinerary", get(trips::itinerary).post(trips::add_itinerary_day))
        .route("/trips/{id}/itinerary/email", post(trips::email_itinerary))
        .route(
            "/trips/{id}/itinerary/{day_id}",
            put(trips::update_itinerary_day).delete(trips::delete_itinerary_day),
        )
        .route("/trips/{id}/participants", get(trips::participants).post(trips::add_participant))
        .route(
            "/trips/{id}/participants/{participant_id}",
            axum::routing::delete(trips::remove_participant),
        )
        .route("/trips/{id}/emails/{kind}", post(trips::send_email))
        // Invoices
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route(
            "/invoices/{id}",
            get(invoices::detail).put(invoices::update).delete(invoices::delete),
        )
        .route("/invoices/{id}/send", post(invoices::send))
        .route("/invoices/{id}/payments", post(invoices::record_payment))
        .route("/invoices/{id}/schedule", get(invoices::schedule).post(invoices::add_installment))
        .route("/invoices/{id}/reminder", post(invoices::send_reminder))
        // Dashboards
        .route("/dashboard/crm", get(dashboard::crm))
        .route("/dashboard/staff", get(dashboard::staff))
        // Support tickets
        .route("/tickets", get(tickets::list).post(tickets::create))
        .route("/tickets/{id}", get(tickets::detail))
        .route("/tickets/{id}/comments", post(tickets::comment))
        .route("/tickets/{id}/assign-to-me", post(tickets::assign_to_me))
        .route("/tickets/{id}/assign", post(tickets::assign))
        .route("/tickets/{id}/resolve", post(tickets::resolve))
        .route("/tickets/{id}/status", post(tickets::change_status))
        .route("/my/tickets", get(tickets::list_own).post(tickets::create_own))
        .route("/my/tickets/{id}", get(tickets::detail_own))
        .route("/my/tickets/{id}/comments", post(tickets::comment_own))
        // Webhooks
        .route("/webhooks/mailgun/inbound", post(webhooks::mailgun_inbound))
}

/// Builds the application router. Authentication happens per handler through
/// the `AuthUser` extractor, so public routes simply do not ask for it.
pub fn build_router(state: AppState, settings: &AppSettings) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes())
        .layer(TimeoutLayer::new(Duration::from_secs(settings.request_timeout_secs.max(1))))
        .layer(build_cors_layer(&settings.cors_origin))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use traveldesk_core::domain::{RoleName, User};
    use traveldesk_core::repositories::{
        MockAuditLogRepository, MockClientRepository, MockCommunicationRepository, MockEmailTransport,
        MockInvoiceRepository, MockPermissionRepository, MockTenantRepository, MockTicketRepository,
        MockTokenStore, MockTripRepository, MockUserRepository,
    };
    use traveldesk_core::services::{
        AuditService, AuthService, ClientService, DashboardService, ImpersonationService, ImpersonationSession,
        ImpersonationTokenManager, InvoiceService, PasswordResetService, RbacService, TenantEmailService,
        TenantService, TicketService, TripService, UserAdminService,
    };
    use traveldesk_security::JwtService;
    use traveldesk_shared::config::{EmailSettings, EmailTransportKind};

    use super::*;
    use crate::middleware::LoginRateLimiter;

    const SECRET: &str = "router-test-secret";

    struct Mocks {
        users: MockUserRepository,
        permissions: MockPermissionRepository,
        clients: MockClientRepository,
        tokens: MockTokenStore,
        audit: MockAuditLogRepository,
    }

    impl Mocks {
        fn new() -> Self {
            let mut permissions = MockPermissionRepository::new();
            permissions.expect_role_grants().returning(|_| Ok(vec![]));
            permissions.expect_list_overrides().returning(|_| Ok(vec![]));
            Self {
                users: MockUserRepository::new(),
                permissions,
                clients: MockClientRepository::new(),
                tokens: MockTokenStore::new(),
                audit: MockAuditLogRepository::new(),
            }
        }
    }

    fn settings() -> AppSettings {
        AppSettings {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            name: "TravelDesk".into(),
            debug: true,
            site_domain: "localhost".into(),
            cors_origin: "*".into(),
            request_timeout_secs: 30,
        }
    }

    fn email_settings() -> EmailSettings {
        EmailSettings {
            transport: EmailTransportKind::Log,
            mailgun_api_key: String::new(),
            mailgun_domain: String::new(),
            mailgun_api_base: "https://api.mailgun.net".into(),
            multi_domain_enabled: false,
            development_domain: "mail.traveldesk.app".into(),
            base_domain: "traveldesk.app".into(),
            default_domain: "traveldesk.app".into(),
            default_from_email: "noreply@traveldesk.app".into(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }

    fn app(mocks: Mocks, login_per_minute: u32) -> Router {
        app_with(mocks, login_per_minute, false)
    }

    fn app_with(mocks: Mocks, login_per_minute: u32, trust_forwarded_for: bool) -> Router {
        let user_repo = Arc::new(mocks.users);
        let tenant_repo = Arc::new(MockTenantRepository::new());
        let permission_repo = Arc::new(mocks.permissions);
        let client_repo = Arc::new(mocks.clients);
        let comm_repo = Arc::new(MockCommunicationRepository::new());
        let trip_repo = Arc::new(MockTripRepository::new());
        let invoice_repo = Arc::new(MockInvoiceRepository::new());
        let ticket_repo = Arc::new(MockTicketRepository::new());

        let jwt = Arc::new(JwtService::new(SECRET, 3600));
        let audit = Arc::new(AuditService::new(Arc::new(mocks.audit)));
        let rbac = Arc::new(RbacService::new(permission_repo.clone()));
        let email = Arc::new(
            TenantEmailService::new(
                Arc::new(MockEmailTransport::new()),
                comm_repo.clone(),
                client_repo.clone(),
                tenant_repo.clone(),
                &email_settings(),
                true,
            )
            .unwrap(),
        );
        let token_store = Arc::new(mocks.tokens);
        let tokens = Arc::new(ImpersonationTokenManager::new(token_store.clone(), 8));

        let state = AppState {
            db: PgPoolOptions::new()
                .connect_lazy("postgres://localhost/traveldesk_test")
                .unwrap(),
            jwt: jwt.clone(),
            login_limiter: Arc::new(LoginRateLimiter::new(login_per_minute)),
            trust_forwarded_for,
            auth: Arc::new(AuthService::new(user_repo.clone(), rbac.clone(), audit.clone(), jwt)),
            password_reset: Arc::new(PasswordResetService::new(
                token_store,
                user_repo.clone(),
                email.clone(),
                audit.clone(),
                72,
                "http://localhost:5173/reset-password",
            )),
            rbac: rbac.clone(),
            audit: audit.clone(),
            users: Arc::new(UserAdminService::new(
                user_repo.clone(),
                tenant_repo.clone(),
                permission_repo,
                rbac,
                audit.clone(),
            )),
            tenants: Arc::new(TenantService::new(tenant_repo.clone(), audit.clone(), 14)),
            impersonation: Arc::new(ImpersonationService::new(
                tokens,
                user_repo.clone(),
                tenant_repo.clone(),
                audit.clone(),
                2,
            )),
            email: email.clone(),
            clients: Arc::new(ClientService::new(
                client_repo.clone(),
                trip_repo.clone(),
                invoice_repo.clone(),
                comm_repo,
            )),
            trips: Arc::new(TripService::new(
                trip_repo.clone(),
                client_repo.clone(),
                invoice_repo.clone(),
                email.clone(),
            )),
            invoices: Arc::new(InvoiceService::new(
                invoice_repo.clone(),
                client_repo.clone(),
                trip_repo.clone(),
                email.clone(),
            )),
            dashboard: Arc::new(DashboardService::new(
                client_repo,
                trip_repo,
                invoice_repo,
                ticket_repo.clone(),
                tenant_repo.clone(),
            )),
            tickets: Arc::new(TicketService::new(ticket_repo, user_repo, tenant_repo, audit, email)),
        };
        build_router(state, &settings())
    }

    fn user(username: &str, role: RoleName) -> User {
        User::new(
            username.into(),
            format!("{}@example.com", username),
            "not-a-real-hash".into(),
            role,
            Some(Uuid::new_v4()),
        )
        .unwrap()
    }

    fn bearer(user: &User) -> String {
        let token = JwtService::new(SECRET, 3600)
            .generate_access_token(&user.id, user.role.as_str(), user.tenant_id.as_ref())
            .unwrap();
        format!("Bearer {}", token)
    }

    async fn read_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app(Mocks::new(), 5)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = app(Mocks::new(), 5)
            .oneshot(Request::get("/api/v1/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_me_returns_authenticated_user() {
        let advisor = user("advisor", RoleName::ClientAdmin);
        let auth = bearer(&advisor);
        let mut mocks = Mocks::new();
        let found = advisor.clone();
        mocks.users.expect_find_by_id().returning(move |_| Ok(Some(found.clone())));

        let response = app(mocks, 5)
            .oneshot(
                Request::get("/api/v1/auth/me")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["user"]["username"], "advisor");
        assert_eq!(body["data"]["is_impersonating"], false);
    }

    #[tokio::test]
    async fn test_impersonation_header_switches_principal() {
        let staff = user("sysadmin", RoleName::SystemAdmin);
        let target = user("client1", RoleName::ClientUser);
        let auth = bearer(&staff);

        let now = Utc::now();
        let session = ImpersonationSession {
            original_user_id: staff.id,
            target_user_id: target.id,
            original_username: staff.username.clone(),
            target_username: target.username.clone(),
            created_at: now,
            expires_at: now + ChronoDuration::hours(1),
        };
        let payload = serde_json::to_string(&session).unwrap();

        let mut mocks = Mocks::new();
        let known = [staff.clone(), target.clone()];
        mocks
            .users
            .expect_find_by_id()
            .returning(move |id| Ok(known.iter().find(|u| u.id == *id).cloned()));
        mocks
            .tokens
            .expect_get()
            .withf(|key| key.ends_with(":tok123"))
            .returning(move |_| Ok(Some(payload.clone())));

        let response = app(mocks, 5)
            .oneshot(
                Request::get("/api/v1/auth/me")
                    .header("authorization", auth)
                    .header("x-impersonation-token", "tok123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["user"]["username"], "client1");
        assert_eq!(body["data"]["impersonated_by"], "sysadmin");
    }

    #[tokio::test]
    async fn test_missing_permission_is_forbidden() {
        let member = user("member", RoleName::ClientUser);
        let auth = bearer(&member);
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_id().returning(move |_| Ok(Some(member.clone())));

        let response = app(mocks, 5)
            .oneshot(
                Request::get("/api/v1/clients")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(read_json(response).await["error"]["code"], "FORBIDDEN");
    }

    fn login_from(forwarded_for: &str) -> Request<Body> {
        Request::post("/api/v1/auth/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::from(r#"{"username":"ghost","password":"secret"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_is_rate_limited_per_address() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_login().times(1).returning(|_| Ok(None));
        let app = app_with(mocks, 1, true);

        let first = app.clone().oneshot(login_from("198.51.100.7")).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        let second = app.oneshot(login_from("198.51.100.7")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_for_does_not_reset_limit() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_login().times(1).returning(|_| Ok(None));
        let app = app(mocks, 1);

        let first = app.clone().oneshot(login_from("198.51.100.7")).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        let second = app.oneshot(login_from("198.51.100.8")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_password_reset_request_is_public_and_silent() {
        let mut mocks = Mocks::new();
        mocks.users.expect_find_by_email().times(1).returning(|_| Ok(None));

        let response = app(mocks, 5)
            .oneshot(
                Request::post("/api/v1/auth/password-reset")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"nobody@example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_password_reset_confirm_with_unknown_token() {
        let mut mocks = Mocks::new();
        mocks.tokens.expect_get().returning(|_| Ok(None));

        let response = app(mocks, 5)
            .oneshot(
                Request::post("/api/v1/auth/password-reset/confirm")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"token":"stale","new_password":"Plum-Tangerine-Voyage-42","confirm_password":"Plum-Tangerine-Voyage-42"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inbound_webhook_from_unknown_sender_is_accepted() {
        let mut mocks = Mocks::new();
        mocks.clients.expect_find_by_email().returning(|_| Ok(vec![]));

        let response = app(mocks, 5)
            .oneshot(
                Request::post("/api/v1/webhooks/mailgun/inbound")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("sender=stranger%40example.com&subject=Hello&body-plain=Hi"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = read_json(response).await;
        assert_eq!(body["data"]["processed"], false);
    }

    #[test]
    fn test_cors_origin_parsing() {
        let _ = build_cors_layer("*");
        let _ = build_cors_layer("https://app.traveldesk.app");
        let _ = build_cors_layer("bad\norigin");
    }
}
