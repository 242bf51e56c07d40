// ============================================================================
// TravelDesk Core - Support Tickets
// File: crates/traveldesk-core/src/domain/support.rs
// Description: Help desk tickets raised for tenants and their comment threads
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use traveldesk_shared::constants::TICKET_NUMBER_PREFIX;

text_enum! {
    pub enum TicketPriority {
        Low => ("LOW", "Low"),
        Medium => ("MEDIUM", "Medium"),
        High => ("HIGH", "High"),
        Urgent => ("URGENT", "Urgent"),
    }
    default = Medium;
}

text_enum! {
    pub enum TicketStatus {
        New => ("NEW", "New"),
        Open => ("OPEN", "Open"),
        InProgress => ("IN_PROGRESS", "In Progress"),
        Pending => ("PENDING", "Pending Customer"),
        Resolved => ("RESOLVED", "Resolved"),
        Closed => ("CLOSED", "Closed"),
    }
    default = New;
}

text_enum! {
    pub enum TicketCategory {
        Technical => ("TECHNICAL", "Technical Issue"),
        Billing => ("BILLING", "Billing Question"),
        Feature => ("FEATURE", "Feature Request"),
        Bug => ("BUG", "Bug Report"),
        Training => ("TRAINING", "Training Request"),
        Account => ("ACCOUNT", "Account Management"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SupportTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub created_for: Option<Uuid>,
    pub assigned_to: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub category: TicketCategory,

    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn new(
        tenant_id: Uuid,
        created_by: Uuid,
        subject: &str,
        description: &str,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let ticket = Self {
            id: Uuid::new_v4(),
            ticket_number: Self::generate_number(),
            tenant_id,
            created_by,
            created_for: None,
            assigned_to: None,
            subject: subject.trim().to_string(),
            description: description.trim().to_string(),
            priority: TicketPriority::default(),
            status: TicketStatus::default(),
            category: TicketCategory::default(),
            resolution: None,
            resolved_at: None,
            closed_at: None,
            first_response_at: None,
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        ticket.validate()?;
        Ok(ticket)
    }

    /// `VD-` followed by six random digits.
    pub fn generate_number() -> String {
        let n: u32 = rand::rng().random_range(100_000..=999_999);
        format!("{}{}", TICKET_NUMBER_PREFIX, n)
    }

    pub fn assign(&mut self, staff_id: Uuid) {
        self.assigned_to = Some(staff_id);
        if self.status == TicketStatus::New {
            self.status = TicketStatus::Open;
        }
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: TicketStatus) {
        let now = Utc::now();
        self.status = status;
        match status {
            TicketStatus::Resolved if self.resolved_at.is_none() => self.resolved_at = Some(now),
            TicketStatus::Closed if self.closed_at.is_none() => self.closed_at = Some(now),
            _ => {}
        }
        self.updated_at = now;
    }

    pub fn resolve(&mut self, resolution: &str) {
        self.resolution = Some(resolution.trim().to_string());
        self.status = TicketStatus::Resolved;
        self.resolved_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn record_first_response(&mut self) {
        if self.first_response_at.is_none() {
            self.first_response_at = Some(Utc::now());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    /// Staff-only note, hidden from tenant users.
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

impl TicketComment {
    pub fn new(ticket_id: Uuid, author_id: Uuid, content: &str, is_internal: bool) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            ticket_id,
            author_id,
            content: content.to_string(),
            is_internal,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> SupportTicket {
        SupportTicket::new(Uuid::new_v4(), Uuid::new_v4(), "Cannot log in", "Password reset loops").unwrap()
    }

    #[test]
    fn test_ticket_number_format() {
        for _ in 0..50 {
            let number = SupportTicket::generate_number();
            assert!(number.starts_with("VD-"));
            let digits: u32 = number[3..].parse().unwrap();
            assert!((100_000..=999_999).contains(&digits));
        }
    }

    #[test]
    fn test_new_ticket_defaults() {
        let t = ticket();
        assert_eq!(t.status, TicketStatus::New);
        assert_eq!(t.priority, TicketPriority::Medium);
        assert_eq!(t.category, TicketCategory::Other);
    }

    #[test]
    fn test_assign_opens_new_ticket() {
        let mut t = ticket();
        t.assign(Uuid::new_v4());
        assert_eq!(t.status, TicketStatus::Open);

        t.set_status(TicketStatus::Pending);
        t.assign(Uuid::new_v4());
        assert_eq!(t.status, TicketStatus::Pending);
    }

    #[test]
    fn test_resolve_and_close_timestamps() {
        let mut t = ticket();
        t.resolve("Reset the MFA device");
        assert_eq!(t.status, TicketStatus::Resolved);
        assert!(t.resolved_at.is_some());
        assert_eq!(t.resolution.as_deref(), Some("Reset the MFA device"));
        t.set_status(TicketStatus::Closed);
        assert!(t.closed_at.is_some());
    }

    #[test]
    fn test_first_response_recorded_once() {
        let mut t = ticket();
        t.record_first_response();
        let first = t.first_response_at;
        t.record_first_response();
        assert_eq!(t.first_response_at, first);
    }

    #[test]
    fn test_empty_comment_rejected() {
        assert!(TicketComment::new(Uuid::new_v4(), Uuid::new_v4(), "   ", false).is_none());
        let c = TicketComment::new(Uuid::new_v4(), Uuid::new_v4(), " Looking into it ", true).unwrap();
        assert_eq!(c.content, "Looking into it");
        assert!(c.is_internal);
    }
}
