//! Repository traits (ports)

pub mod user_repository;
pub mod tenant_repository;
pub mod permission_repository;
pub mod audit_log_repository;
pub mod client_repository;
pub mod communication_repository;
pub mod trip_repository;
pub mod invoice_repository;
pub mod ticket_repository;
pub mod token_store;
pub mod email_transport;

pub use user_repository::{UserFilter, UserRepository};
pub use tenant_repository::{TenantCounts, TenantFilter, TenantRepository};
pub use permission_repository::PermissionRepository;
pub use audit_log_repository::{AuditLogFilter, AuditLogRepository};
pub use client_repository::{ClientCounts, ClientFilter, ClientListRow, ClientRepository};
pub use communication_repository::{CommunicationCounts, CommunicationRepository};
pub use trip_repository::{TripFilter, TripListRow, TripRepository, TripTimeFilter, TripTotals};
pub use invoice_repository::{InvoiceFilter, InvoiceListRow, InvoiceRepository, InvoiceTotals};
pub use ticket_repository::{AssignedFilter, TicketFilter, TicketListRow, TicketRepository, TicketStats};
pub use token_store::TokenStore;
pub use email_transport::{EmailTransport, OutgoingEmail};

#[cfg(any(test, feature = "mocks"))]
pub use user_repository::MockUserRepository;
#[cfg(any(test, feature = "mocks"))]
pub use tenant_repository::MockTenantRepository;
#[cfg(any(test, feature = "mocks"))]
pub use permission_repository::MockPermissionRepository;
#[cfg(any(test, feature = "mocks"))]
pub use audit_log_repository::MockAuditLogRepository;
#[cfg(any(test, feature = "mocks"))]
pub use client_repository::MockClientRepository;
#[cfg(any(test, feature = "mocks"))]
pub use communication_repository::MockCommunicationRepository;
#[cfg(any(test, feature = "mocks"))]
pub use trip_repository::MockTripRepository;
#[cfg(any(test, feature = "mocks"))]
pub use invoice_repository::MockInvoiceRepository;
#[cfg(any(test, feature = "mocks"))]
pub use ticket_repository::MockTicketRepository;
#[cfg(any(test, feature = "mocks"))]
pub use token_store::MockTokenStore;
#[cfg(any(test, feature = "mocks"))]
pub use email_transport::MockEmailTransport;
