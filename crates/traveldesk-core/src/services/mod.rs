//! Application services

pub mod audit_service;
pub mod rbac_service;
pub mod auth_service;
pub mod password_reset;
pub mod user_admin_service;
pub mod tenant_service;
pub mod impersonation;
pub mod email_service;
pub mod client_service;
pub mod trip_service;
pub mod invoice_service;
pub mod dashboard_service;
pub mod ticket_service;

pub use audit_service::AuditService;
pub use rbac_service::{RbacService, RoleSummary, SeedReport};
pub use auth_service::{AuthService, LoginResult, MeResult, ProfileUpdate, UserInfo};
pub use password_reset::PasswordResetService;
pub use user_admin_service::{NewUser, OverrideRequest, TenantUserSummary, UserAdminService, UserDetail, UserUpdate};
pub use tenant_service::{NewTenant, TenantDetail, TenantService, TenantUpdate};
pub use impersonation::{
    can_impersonate, ImpersonationCandidate, ImpersonationService, ImpersonationSession, ImpersonationStarted,
    ImpersonationStatus, ImpersonationTokenManager,
};
pub use email_service::{ClientEmail, EmailOutcome, EmailSender, InboundEmail, InboundResult, TenantEmailService};
pub use client_service::{
    ClientDetail, ClientListResult, ClientService, ClientUpdate, CommunicationHistory, NewClient, NewCommunication,
    NewNote,
};
pub use trip_service::{
    ItineraryDayInput, LineItemInput, NewParticipant, NewTrip, PushResult, StatusChange, StatusChangeResult,
    TripDetail, TripEmailKind, TripListResult, TripService, TripUpdate,
};
pub use invoice_service::{
    InvoiceDetail, InvoiceListResult, InvoiceSent, InvoiceService, InvoiceUpdate, NewInstallment, NewInvoice,
    NewInvoiceLine, NewPayment, PaymentRecorded, ReminderResult,
};
pub use dashboard_service::{CrmDashboard, DashboardService, StaffDashboard};
pub use ticket_service::{NewComment, NewOwnTicket, NewTicket, TicketDetail, TicketService};
