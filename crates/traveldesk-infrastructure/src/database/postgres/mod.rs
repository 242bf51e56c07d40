//! PostgreSQL repository implementations

pub mod user_repo_impl;
pub mod tenant_repo_impl;
pub mod permission_repo_impl;
pub mod audit_log_repo_impl;
pub mod client_repo_impl;
pub mod communication_repo_impl;
pub mod trip_repo_impl;
pub mod invoice_repo_impl;
pub mod ticket_repo_impl;

pub use user_repo_impl::PgUserRepository;
pub use tenant_repo_impl::PgTenantRepository;
pub use permission_repo_impl::PgPermissionRepository;
pub use audit_log_repo_impl::PgAuditLogRepository;
pub use client_repo_impl::PgClientRepository;
pub use communication_repo_impl::PgCommunicationRepository;
pub use trip_repo_impl::PgTripRepository;
pub use invoice_repo_impl::PgInvoiceRepository;
pub use ticket_repo_impl::PgTicketRepository;

/// Maps a sqlx error, logging it with the operation that failed.
pub(crate) fn db_error(context: &str, e: sqlx::Error) -> traveldesk_core::error::DomainError {
    tracing::error!("Database error {}: {}", context, e);
    traveldesk_core::error::DomainError::DatabaseError(e.to_string())
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("unique") || msg.contains("duplicate")
}

/// `%term%` for ILIKE filters.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_trims() {
        assert_eq!(like_pattern("  rome "), "%rome%");
    }
}
