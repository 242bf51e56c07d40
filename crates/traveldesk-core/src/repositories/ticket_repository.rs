//! Support ticket storage (port)

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{SupportTicket, TicketComment, TicketPriority, TicketStatus};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignedFilter {
    To(Uuid),
    Unassigned,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub tenant_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned: Option<AssignedFilter>,
    /// Ticket number, subject or tenant name.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketListRow {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub tenant_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketStats {
    /// OPEN and IN_PROGRESS.
    pub open: i64,
    pub pending: i64,
    pub assigned_to_me: i64,
    /// Not resolved or closed, with nobody assigned.
    pub unassigned: i64,
    /// HIGH and URGENT tickets still open.
    pub high_priority: i64,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SupportTicket>, DomainError>;
    async fn number_exists(&self, ticket_number: &str) -> Result<bool, DomainError>;
    async fn create(&self, ticket: &SupportTicket) -> Result<SupportTicket, DomainError>;
    async fn update(&self, ticket: &SupportTicket) -> Result<SupportTicket, DomainError>;
    /// Newest first.
    async fn list(&self, filter: &TicketFilter, pagination: Pagination) -> Result<Page<TicketListRow>, DomainError>;
    async fn add_comment(&self, comment: &TicketComment) -> Result<TicketComment, DomainError>;
    /// Oldest first.
    async fn list_comments(&self, ticket_id: &Uuid, include_internal: bool) -> Result<Vec<TicketComment>, DomainError>;
    async fn stats(&self, staff_id: &Uuid) -> Result<TicketStats, DomainError>;
}
