use std::sync::Arc;

use sqlx::PgPool;
use traveldesk_core::services::{
    AuditService, AuthService, ClientService, DashboardService, ImpersonationService, InvoiceService,
    PasswordResetService, RbacService, TenantEmailService, TenantService, TicketService, TripService,
    UserAdminService,
};
use traveldesk_security::JwtService;

use crate::middleware::rate_limit::LoginRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt: Arc<JwtService>,
    pub login_limiter: Arc<LoginRateLimiter>,
    /// Read client addresses from X-Forwarded-For.
    pub trust_forwarded_for: bool,

    pub auth: Arc<AuthService>,
    pub password_reset: Arc<PasswordResetService>,
    pub rbac: Arc<RbacService>,
    pub audit: Arc<AuditService>,
    pub users: Arc<UserAdminService>,
    pub tenants: Arc<TenantService>,
    pub impersonation: Arc<ImpersonationService>,

    pub email: Arc<TenantEmailService>,
    pub clients: Arc<ClientService>,
    pub trips: Arc<TripService>,
    pub invoices: Arc<InvoiceService>,
    pub dashboard: Arc<DashboardService>,
    pub tickets: Arc<TicketService>,
}
