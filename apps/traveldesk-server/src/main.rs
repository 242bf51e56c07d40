use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use traveldesk_api::{build_router, middleware::LoginRateLimiter, AppState};
use traveldesk_core::repositories::{EmailTransport, TokenStore};
use traveldesk_core::services::{
    AuditService, AuthService, ClientService, DashboardService, ImpersonationService, ImpersonationTokenManager,
    InvoiceService, PasswordResetService, RbacService, TenantEmailService, TenantService, TicketService, TripService,
    UserAdminService,
};
use traveldesk_infrastructure::{
    create_pool, run_migrations, FallbackTokenStore, LogTransport, MailgunTransport, MemoryTokenStore,
    PgAuditLogRepository, PgClientRepository, PgCommunicationRepository, PgInvoiceRepository, PgPermissionRepository,
    PgTenantRepository, PgTicketRepository, PgTripRepository, PgUserRepository, RedisTokenStore, SmtpTransport,
};
use traveldesk_security::JwtService;
use traveldesk_shared::config::{AppConfig, EmailSettings, EmailTransportKind, RedisSettings};
use traveldesk_shared::telemetry::init_telemetry;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = init_telemetry(&config.log);
    info!("{} starting ({})", config.app.name, config.app.env);

    if config.jwt.secret.len() < 32 {
        warn!("jwt.secret is shorter than 32 bytes; set JWT__SECRET for production");
    }

    // Database
    let pool = create_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Database connection established");

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
    let tenant_repo = Arc::new(PgTenantRepository::new(pool.clone()));
    let permission_repo = Arc::new(PgPermissionRepository::new(pool.clone()));
    let audit_repo = Arc::new(PgAuditLogRepository::new(pool.clone()));
    let client_repo = Arc::new(PgClientRepository::new(pool.clone()));
    let comm_repo = Arc::new(PgCommunicationRepository::new(pool.clone()));
    let trip_repo = Arc::new(PgTripRepository::new(pool.clone()));
    let invoice_repo = Arc::new(PgInvoiceRepository::new(pool.clone()));
    let ticket_repo = Arc::new(PgTicketRepository::new(pool.clone()));

    // Services
    let jwt = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry));
    let audit = Arc::new(AuditService::new(audit_repo));
    let rbac = Arc::new(RbacService::new(permission_repo.clone()));

    if let Err(e) = rbac.seed(None).await {
        error!("Permission seeding failed: {}", e);
    }

    let token_store = build_token_store(&config.redis).await;
    let tokens = Arc::new(ImpersonationTokenManager::new(
        token_store.clone(),
        config.impersonation.token_ttl_hours,
    ));

    let login_limiter = Arc::new(LoginRateLimiter::new(config.rate_limit.login_per_minute));
    let limiter = login_limiter.clone();
    spawn_sweeper("login limiter", move || limiter.retain_recent());
    if config.rate_limit.trust_forwarded_for {
        info!("Client addresses are taken from X-Forwarded-For");
    }

    let transport = build_email_transport(&config.email)?;
    let email = Arc::new(TenantEmailService::new(
        transport,
        comm_repo.clone(),
        client_repo.clone(),
        tenant_repo.clone(),
        &config.email,
        config.app.debug,
    )?);

    let password_reset = Arc::new(PasswordResetService::new(
        token_store,
        user_repo.clone(),
        email.clone(),
        audit.clone(),
        config.password_reset.token_ttl_hours,
        &config.password_reset.reset_url,
    ));

    let state = AppState {
        db: pool,
        jwt: jwt.clone(),
        login_limiter,
        trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        auth: Arc::new(AuthService::new(user_repo.clone(), rbac.clone(), audit.clone(), jwt)),
        password_reset,
        rbac: rbac.clone(),
        audit: audit.clone(),
        users: Arc::new(UserAdminService::new(
            user_repo.clone(),
            tenant_repo.clone(),
            permission_repo,
            rbac,
            audit.clone(),
        )),
        tenants: Arc::new(TenantService::new(tenant_repo.clone(), audit.clone(), config.tenant.trial_days)),
        impersonation: Arc::new(ImpersonationService::new(
            tokens,
            user_repo.clone(),
            tenant_repo.clone(),
            audit.clone(),
            config.impersonation.extend_hours,
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

    let app = build_router(state, &config.app);

    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Redis when configured (with in-memory fallback), otherwise process memory.
async fn build_token_store(settings: &RedisSettings) -> Arc<dyn TokenStore> {
    let Some(url) = settings.url.as_deref().filter(|u| !u.trim().is_empty()) else {
        info!("No redis.url set; tokens are kept in memory");
        let memory = Arc::new(MemoryTokenStore::new());
        let sweeper = memory.clone();
        spawn_sweeper("token store", move || sweeper.cleanup_expired());
        return memory;
    };

    match RedisTokenStore::new(url, settings.max_connections) {
        Ok(redis) => {
            if let Err(e) = redis.ping().await {
                warn!("Redis is not reachable yet, tokens fall back to memory: {}", e);
            }
            let store = Arc::new(FallbackTokenStore::new(Arc::new(redis)));
            let sweeper = store.clone();
            spawn_sweeper("token store", move || sweeper.cleanup_expired());
            store as Arc<dyn TokenStore>
        }
        Err(e) => {
            warn!("Redis store unavailable, using memory: {}", e);
            let memory = Arc::new(MemoryTokenStore::new());
            let sweeper = memory.clone();
            spawn_sweeper("token store", move || sweeper.cleanup_expired());
            memory as Arc<dyn TokenStore>
        }
    }
}

fn spawn_sweeper<F>(label: &'static str, sweep: F)
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sweep();
            if removed > 0 {
                debug!(removed, "{} swept", label);
            }
        }
    });
}

fn build_email_transport(settings: &EmailSettings) -> anyhow::Result<Arc<dyn EmailTransport>> {
    let missing = settings.missing_settings();
    if !missing.is_empty() {
        warn!("Email settings incomplete: {}", missing.join(", "));
    }

    let transport: Arc<dyn EmailTransport> = match settings.transport {
        EmailTransportKind::Mailgun => Arc::new(MailgunTransport::new(
            &settings.mailgun_api_base,
            &settings.mailgun_api_key,
            &settings.mailgun_domain,
        )?),
        EmailTransportKind::Smtp => Arc::new(SmtpTransport::new(
            &settings.smtp_host,
            settings.smtp_port,
            &settings.smtp_username,
            &settings.smtp_password,
        )?),
        EmailTransportKind::Log => {
            info!("Outgoing email is logged, not delivered");
            Arc::new(LogTransport::new())
        }
    };
    Ok(transport)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
