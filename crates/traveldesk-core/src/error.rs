//! Domain errors

use thiserror::Error;
use traveldesk_security::password::PasswordError;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found")]
    UserNotFound,

    #[error("User not active")]
    UserNotActive,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already exists: {0}")]
    UsernameAlreadyExists(String),

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Tenant not found")]
    TenantNotFound,

    #[error("Tenant subdomain already exists: {0}")]
    TenantSubdomainAlreadyExists(String),

    #[error("Tenant not active")]
    TenantNotActive,

    #[error("Tenant max users reached")]
    TenantMaxUsersReached,

    #[error("User is not associated with a tenant")]
    NoTenant,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("You cannot edit your own account here")]
    CannotEditSelf,

    #[error("Role cannot be assigned: {0}")]
    RoleNotAssignable(String),

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Token generation error: {0}")]
    TokenGenerationError(String),

    #[error("Password reset link is invalid or has expired")]
    InvalidResetToken,

    #[error("Impersonation not allowed: {0}")]
    ImpersonationNotAllowed(String),

    #[error("Impersonation session not found or expired")]
    ImpersonationNotFound,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Client has no email address")]
    ClientHasNoEmail,

    #[error("Trip not found")]
    TripNotFound,

    #[error("Line item not found")]
    LineItemNotFound,

    #[error("Itinerary day not found")]
    ItineraryDayNotFound,

    #[error("Itinerary day {0} already exists")]
    ItineraryDayExists(i32),

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Invoice cannot be deleted: {0}")]
    InvoiceNotDeletable(String),

    #[error("Line item already exists on invoice: {0}")]
    DuplicateInvoiceLine(String),

    #[error("Payment exceeds balance due ({0})")]
    PaymentExceedsBalance(String),

    #[error("Installment not found")]
    InstallmentNotFound,

    #[error("Installment {0} already exists")]
    InstallmentExists(i32),

    #[error("Support ticket not found")]
    TicketNotFound,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Resolution is required")]
    ResolutionRequired,

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("Unable to generate unique number")]
    UnableToGenerateUniqueNumber,

    #[error("Email template error: {0}")]
    TemplateError(String),

    #[error("Email delivery failed: {0}")]
    EmailDeliveryFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(e: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(e.to_string())
    }
}

impl From<PasswordError> for DomainError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::HashError(msg) => DomainError::PasswordHashError(msg),
            PasswordError::VerificationFailed => DomainError::InvalidCredentials,
            other => DomainError::WeakPassword(other.to_string()),
        }
    }
}
