//! # TravelDesk Infrastructure
//!
//! Database, token store and mail transport implementations (adapters).

pub mod database;
pub mod cache;
pub mod email;

pub use database::{
    create_pool, run_migrations, PgAuditLogRepository, PgClientRepository, PgCommunicationRepository,
    PgInvoiceRepository, PgPermissionRepository, PgTenantRepository, PgTicketRepository, PgTripRepository,
    PgUserRepository,
};
pub use cache::{FallbackTokenStore, MemoryTokenStore, RedisTokenStore};
pub use email::{LogTransport, MailgunTransport, SmtpTransport};
