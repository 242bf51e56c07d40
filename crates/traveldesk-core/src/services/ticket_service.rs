// ============================================================================
// TravelDesk Core - Support Ticket Service
// File: crates/traveldesk-core/src/services/ticket_service.rs
// Description: Help desk workflow for staff and ticket self-service for tenants
// ============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use traveldesk_shared::constants::TICKET_NUMBER_ATTEMPTS;
use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{
    AuditAction, AuditLog, Principal, SupportTicket, TicketCategory, TicketComment, TicketPriority,
    TicketStatus, User,
};
use crate::error::DomainError;
use crate::repositories::{TenantRepository, TicketFilter, TicketListRow, TicketRepository, UserRepository};
use crate::services::audit_service::AuditService;
use crate::services::email_service::TenantEmailService;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub tenant_id: Uuid,
    pub created_for: Option<Uuid>,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub category: TicketCategory,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOwnTicket {
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub category: TicketCategory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    pub ticket: SupportTicket,
    pub tenant_name: Option<String>,
    pub comments: Vec<TicketComment>,
}

pub struct TicketService {
    ticket_repo: Arc<dyn TicketRepository>,
    user_repo: Arc<dyn UserRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    audit: Arc<AuditService>,
    email: Arc<TenantEmailService>,
}

impl TicketService {
    pub fn new(
        ticket_repo: Arc<dyn TicketRepository>,
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        audit: Arc<AuditService>,
        email: Arc<TenantEmailService>,
    ) -> Self {
        Self { ticket_repo, user_repo, tenant_repo, audit, email }
    }

    async fn load(&self, id: &Uuid) -> Result<SupportTicket, DomainError> {
        self.ticket_repo.find_by_id(id).await?.ok_or(DomainError::TicketNotFound)
    }

    /// Tenant users only see their own tenant's tickets.
    async fn load_own(&self, principal: &Principal, id: &Uuid) -> Result<SupportTicket, DomainError> {
        let tenant_id = principal.require_tenant()?;
        let ticket = self.load(id).await?;
        if ticket.tenant_id != tenant_id {
            return Err(DomainError::TicketNotFound);
        }
        Ok(ticket)
    }

    async fn unique_number(&self) -> Result<String, DomainError> {
        for _ in 0..TICKET_NUMBER_ATTEMPTS {
            let candidate = SupportTicket::generate_number();
            if !self.ticket_repo.number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        error!("No free ticket number after {} attempts", TICKET_NUMBER_ATTEMPTS);
        Err(DomainError::UnableToGenerateUniqueNumber)
    }

    async fn tenant_name(&self, tenant_id: &Uuid) -> Result<Option<String>, DomainError> {
        Ok(self.tenant_repo.find_by_id(tenant_id).await?.map(|t| t.name))
    }

    fn entry(principal: &Principal, action: AuditAction, ticket: &SupportTicket) -> AuditLog {
        AuditLog::by(principal, action)
            .tenant(Some(ticket.tenant_id))
            .resource("support_ticket", ticket.id)
            .detail("ticket_number", ticket.ticket_number.clone())
    }

    // ---- Staff ----

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &TicketFilter,
        pagination: Pagination,
    ) -> Result<Page<TicketListRow>, DomainError> {
        principal.require_staff()?;
        principal.require("view_support_tickets")?;
        self.ticket_repo.list(filter, pagination).await
    }

    pub async fn detail(&self, principal: &Principal, id: &Uuid) -> Result<TicketDetail, DomainError> {
        principal.require_staff()?;
        principal.require("view_support_tickets")?;
        let ticket = self.load(id).await?;
        Ok(TicketDetail {
            tenant_name: self.tenant_name(&ticket.tenant_id).await?,
            comments: self.ticket_repo.list_comments(&ticket.id, true).await?,
            ticket,
        })
    }

    pub async fn create(&self, principal: &Principal, input: NewTicket) -> Result<SupportTicket, DomainError> {
        principal.require_staff()?;
        principal.require("create_support_tickets")?;

        // 1. Tenant and recipient
        let tenant = self
            .tenant_repo
            .find_by_id(&input.tenant_id)
            .await?
            .ok_or(DomainError::TenantNotFound)?;
        let recipient = match input.created_for {
            Some(user_id) => Some(self.tenant_member(&tenant.id, &user_id).await?),
            None => None,
        };

        // 2. Build
        let mut ticket = SupportTicket::new(tenant.id, principal.id(), &input.subject, &input.description)?;
        ticket.ticket_number = self.unique_number().await?;
        ticket.created_for = recipient.as_ref().map(|u| u.id);
        ticket.priority = input.priority;
        ticket.category = input.category;
        ticket.due_date = input.due_date;
        ticket.status = TicketStatus::Open;

        // 3. Save, audit, notify
        let ticket = self.ticket_repo.create(&ticket).await?;
        self.audit
            .record(Self::entry(principal, AuditAction::TicketCreate, &ticket).detail("subject", ticket.subject.clone()))
            .await;
        info!("Ticket {} created for tenant {}", ticket.ticket_number, tenant.name);

        self.notify(
            &ticket,
            format!("New support ticket created: {}", ticket.ticket_number),
            "ticket_created",
            json!({}),
        )
        .await;
        Ok(ticket)
    }

    /// Active, non-staff user of the given tenant.
    async fn tenant_member(&self, tenant_id: &Uuid, user_id: &Uuid) -> Result<User, DomainError> {
        let user = self.user_repo.find_by_id(user_id).await?.ok_or(DomainError::UserNotFound)?;
        if !user.is_active || user.role.is_system_role() || !user.belongs_to(tenant_id) {
            return Err(DomainError::ValidationError(
                "Ticket can only be created for an active user of the same tenant".into(),
            ));
        }
        Ok(user)
    }

    pub async fn comment(
        &self,
        principal: &Principal,
        id: &Uuid,
        input: NewComment,
    ) -> Result<TicketComment, DomainError> {
        principal.require_staff()?;
        principal.require("edit_support_tickets")?;
        let mut ticket = self.load(id).await?;
        let comment = TicketComment::new(ticket.id, principal.id(), &input.content, input.is_internal)
            .ok_or(DomainError::EmptyComment)?;
        let saved = self.ticket_repo.add_comment(&comment).await?;

        if !saved.is_internal && ticket.first_response_at.is_none() {
            ticket.record_first_response();
            ticket = self.ticket_repo.update(&ticket).await?;
        }
        self.audit
            .record(Self::entry(principal, AuditAction::TicketComment, &ticket).detail("is_internal", saved.is_internal))
            .await;

        if !saved.is_internal {
            self.notify_comment(principal, &ticket, &saved).await;
        }
        Ok(saved)
    }

    pub async fn assign_to_me(&self, principal: &Principal, id: &Uuid) -> Result<SupportTicket, DomainError> {
        principal.require_staff()?;
        principal.require("assign_support_tickets")?;
        let mut ticket = self.load(id).await?;
        ticket.assign(principal.id());
        let ticket = self.ticket_repo.update(&ticket).await?;
        self.audit
            .record(
                Self::entry(principal, AuditAction::TicketAssign, &ticket)
                    .detail("assigned_to", principal.user.username.clone()),
            )
            .await;
        Ok(ticket)
    }

    pub async fn assign(&self, principal: &Principal, id: &Uuid, staff_id: &Uuid) -> Result<SupportTicket, DomainError> {
        principal.require_staff()?;
        principal.require("assign_support_tickets")?;
        let assignee = self.user_repo.find_by_id(staff_id).await?.ok_or(DomainError::UserNotFound)?;
        if !assignee.is_active || !assignee.role.is_staff() {
            return Err(DomainError::ValidationError("Tickets can only be assigned to active staff".into()));
        }

        let mut ticket = self.load(id).await?;
        ticket.assign(assignee.id);
        let ticket = self.ticket_repo.update(&ticket).await?;
        self.audit
            .record(
                Self::entry(principal, AuditAction::TicketAssign, &ticket).detail("assigned_to", assignee.username.clone()),
            )
            .await;
        Ok(ticket)
    }

    pub async fn resolve(&self, principal: &Principal, id: &Uuid, resolution: &str) -> Result<SupportTicket, DomainError> {
        principal.require_staff()?;
        principal.require("resolve_support_tickets")?;
        if resolution.trim().is_empty() {
            return Err(DomainError::ResolutionRequired);
        }

        let mut ticket = self.load(id).await?;
        ticket.resolve(resolution);
        ticket.record_first_response();
        let ticket = self.ticket_repo.update(&ticket).await?;

        let note = format!("Ticket resolved by {}:\n\n{}", principal.user.display_name(), resolution.trim());
        if let Some(comment) = TicketComment::new(ticket.id, principal.id(), &note, false) {
            self.ticket_repo.add_comment(&comment).await?;
        }
        self.audit
            .record(Self::entry(principal, AuditAction::TicketResolve, &ticket))
            .await;
        info!("Ticket {} resolved", ticket.ticket_number);

        self.notify(
            &ticket,
            format!("Your support ticket {} has been resolved", ticket.ticket_number),
            "ticket_resolved",
            json!({}),
        )
        .await;
        Ok(ticket)
    }

    pub async fn change_status(&self, principal: &Principal, id: &Uuid, status: &str) -> Result<SupportTicket, DomainError> {
        principal.require_staff()?;
        principal.require("edit_support_tickets")?;
        let new_status = TicketStatus::from_str(status).ok_or_else(|| DomainError::InvalidStatus(status.to_string()))?;

        let mut ticket = self.load(id).await?;
        let old_status = ticket.status;
        ticket.set_status(new_status);
        let ticket = self.ticket_repo.update(&ticket).await?;
        self.audit
            .record(
                Self::entry(principal, AuditAction::TicketStatusChange, &ticket)
                    .detail("old_status", old_status.as_str())
                    .detail("new_status", new_status.as_str()),
            )
            .await;

        if old_status != new_status {
            self.notify(
                &ticket,
                format!("Status update for ticket {}", ticket.ticket_number),
                "ticket_status",
                json!({ "old_status": old_status.label(), "new_status": new_status.label() }),
            )
            .await;
        }
        Ok(ticket)
    }

    // ---- Tenant self-service ----

    pub async fn create_own(&self, principal: &Principal, input: NewOwnTicket) -> Result<SupportTicket, DomainError> {
        principal.require("create_support_tickets")?;
        let tenant_id = principal.require_tenant()?;

        let mut ticket = SupportTicket::new(tenant_id, principal.id(), &input.subject, &input.description)?;
        ticket.ticket_number = self.unique_number().await?;
        ticket.created_for = Some(principal.id());
        ticket.priority = input.priority;
        ticket.category = input.category;

        let ticket = self.ticket_repo.create(&ticket).await?;
        self.audit
            .record(Self::entry(principal, AuditAction::TicketCreate, &ticket).detail("subject", ticket.subject.clone()))
            .await;
        info!("Ticket {} opened by {}", ticket.ticket_number, principal.user.username);

        self.notify(
            &ticket,
            format!("New support ticket created: {}", ticket.ticket_number),
            "ticket_created",
            json!({}),
        )
        .await;
        Ok(ticket)
    }

    pub async fn list_own(
        &self,
        principal: &Principal,
        filter: TicketFilter,
        pagination: Pagination,
    ) -> Result<Page<TicketListRow>, DomainError> {
        principal.require("view_support_tickets")?;
        let tenant_id = principal.require_tenant()?;
        let filter = TicketFilter { tenant_id: Some(tenant_id), assigned: None, ..filter };
        self.ticket_repo.list(&filter, pagination).await
    }

    /// Internal staff notes are never shown to tenant users.
    pub async fn detail_own(&self, principal: &Principal, id: &Uuid) -> Result<TicketDetail, DomainError> {
        principal.require("view_support_tickets")?;
        let ticket = self.load_own(principal, id).await?;
        Ok(TicketDetail {
            tenant_name: self.tenant_name(&ticket.tenant_id).await?,
            comments: self.ticket_repo.list_comments(&ticket.id, false).await?,
            ticket,
        })
    }

    pub async fn comment_own(&self, principal: &Principal, id: &Uuid, content: &str) -> Result<TicketComment, DomainError> {
        principal.require("view_support_tickets")?;
        let ticket = self.load_own(principal, id).await?;
        let comment = TicketComment::new(ticket.id, principal.id(), content, false).ok_or(DomainError::EmptyComment)?;
        let saved = self.ticket_repo.add_comment(&comment).await?;
        self.audit
            .record(Self::entry(principal, AuditAction::TicketComment, &ticket).detail("is_internal", false))
            .await;
        self.notify_comment(principal, &ticket, &saved).await;
        Ok(saved)
    }

    // ---- Notifications ----

    async fn notify_comment(&self, principal: &Principal, ticket: &SupportTicket, comment: &TicketComment) {
        if ticket.created_for == Some(comment.author_id) {
            return;
        }
        self.notify(
            ticket,
            format!("Update on your support ticket {}", ticket.ticket_number),
            "ticket_comment",
            json!({ "author_name": principal.user.display_name(), "comment": comment.content }),
        )
        .await;
    }

    /// Emails the ticket's recipient. Failures are logged, never returned.
    async fn notify(&self, ticket: &SupportTicket, subject: String, template: &str, extra: Value) {
        let Some(recipient_id) = ticket.created_for else {
            return;
        };
        let recipient = match self.user_repo.find_by_id(&recipient_id).await {
            Ok(Some(user)) if !user.email.trim().is_empty() => user,
            Ok(_) => return,
            Err(e) => {
                warn!("Ticket {} notification skipped: {}", ticket.ticket_number, e);
                return;
            }
        };

        let mut context = json!({
            "recipient_name": recipient.display_name(),
            "ticket": {
                "ticket_number": ticket.ticket_number,
                "subject": ticket.subject,
                "description": ticket.description,
                "priority": ticket.priority.label(),
                "status": ticket.status.label(),
                "resolution": ticket.resolution,
            },
        });
        if let (Some(target), Value::Object(source)) = (context.as_object_mut(), extra) {
            target.extend(source);
        }

        if let Err(e) = self.email.send_system_email(&recipient.email, &subject, template, context).await {
            warn!("Ticket {} notification failed: {}", ticket.ticket_number, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestMeta, RoleName, Tenant};
    use crate::repositories::{
        MockAuditLogRepository, MockClientRepository, MockCommunicationRepository, MockEmailTransport,
        MockTenantRepository, MockTicketRepository, MockUserRepository,
    };
    use traveldesk_shared::config::{EmailSettings, EmailTransportKind};

    fn principal(role: RoleName, tenant_id: Option<Uuid>, perms: &[&str]) -> Principal {
        let user = User::new("agent".into(), "agent@traveldesk.app".into(), "h".into(), role, tenant_id)
            .unwrap()
            .with_names("Sam", "Support");
        Principal::new(user, perms.iter().map(|p| p.to_string()).collect(), RequestMeta::default())
    }

    fn helpdesk() -> Principal {
        principal(
            RoleName::HelpdeskUser,
            None,
            &[
                "view_support_tickets",
                "create_support_tickets",
                "edit_support_tickets",
                "assign_support_tickets",
                "resolve_support_tickets",
            ],
        )
    }

    fn email(transport: MockEmailTransport) -> Arc<TenantEmailService> {
        let settings = EmailSettings {
            transport: EmailTransportKind::Log,
            mailgun_api_key: String::new(),
            mailgun_domain: String::new(),
            mailgun_api_base: String::new(),
            multi_domain_enabled: true,
            development_domain: "mail.traveldesk.app".into(),
            base_domain: "traveldesk.app".into(),
            default_domain: "traveldesk.app".into(),
            default_from_email: "noreply@traveldesk.app".into(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
        };
        Arc::new(
            TenantEmailService::new(
                Arc::new(transport),
                Arc::new(MockCommunicationRepository::new()),
                Arc::new(MockClientRepository::new()),
                Arc::new(MockTenantRepository::new()),
                &settings,
                false,
            )
            .unwrap(),
        )
    }

    fn audit() -> Arc<AuditService> {
        let mut repo = MockAuditLogRepository::new();
        repo.expect_insert().returning(|_| Ok(()));
        Arc::new(AuditService::new(Arc::new(repo)))
    }

    fn service(
        tickets: MockTicketRepository,
        users: MockUserRepository,
        tenants: MockTenantRepository,
        transport: MockEmailTransport,
    ) -> TicketService {
        TicketService::new(Arc::new(tickets), Arc::new(users), Arc::new(tenants), audit(), email(transport))
    }

    fn ticket(tenant_id: Uuid) -> SupportTicket {
        SupportTicket::new(tenant_id, Uuid::new_v4(), "Cannot export invoices", "The PDF button does nothing").unwrap()
    }

    #[tokio::test]
    async fn test_number_generation_gives_up() {
        let tenant = Tenant::new("Blue Sky Travel".into(), "bluesky".into()).unwrap();
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut tickets = MockTicketRepository::new();
        tickets
            .expect_number_exists()
            .times(TICKET_NUMBER_ATTEMPTS as usize)
            .returning(|_| Ok(true));

        let input = NewTicket {
            tenant_id: Uuid::new_v4(),
            created_for: None,
            subject: "Sync failing".into(),
            description: "Calendar sync errors".into(),
            priority: TicketPriority::High,
            category: TicketCategory::Technical,
            due_date: None,
        };
        let result = service(tickets, MockUserRepository::new(), tenants, MockEmailTransport::new())
            .create(&helpdesk(), input)
            .await;
        assert!(matches!(result, Err(DomainError::UnableToGenerateUniqueNumber)));
    }

    #[tokio::test]
    async fn test_staff_create_opens_ticket_and_notifies() {
        let tenant = Tenant::new("Blue Sky Travel".into(), "bluesky".into()).unwrap();
        let tenant_id = tenant.id;
        let owner = User::new("owner".into(), "owner@bluesky.com".into(), "h".into(), RoleName::ClientAdmin, Some(tenant_id))
            .unwrap();
        let owner_id = owner.id;

        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(owner.clone())));
        let mut tickets = MockTicketRepository::new();
        tickets.expect_number_exists().returning(|_| Ok(false));
        tickets
            .expect_create()
            .withf(move |t| t.status == TicketStatus::Open && t.created_for == Some(owner_id))
            .returning(|t| Ok(t.clone()));
        let mut transport = MockEmailTransport::new();
        transport
            .expect_send()
            .withf(|m| m.subject.starts_with("New support ticket created: VD-") && m.to == vec!["owner@bluesky.com".to_string()])
            .times(1)
            .returning(|_| Ok(true));

        let input = NewTicket {
            tenant_id,
            created_for: Some(owner_id),
            subject: "Sync failing".into(),
            description: "Calendar sync errors".into(),
            priority: TicketPriority::default(),
            category: TicketCategory::default(),
            due_date: None,
        };
        let created = service(tickets, users, tenants, transport).create(&helpdesk(), input).await.unwrap();
        assert!(created.ticket_number.starts_with("VD-"));
    }

    #[tokio::test]
    async fn test_created_for_must_be_tenant_member() {
        let tenant = Tenant::new("Blue Sky Travel".into(), "bluesky".into()).unwrap();
        let outsider = User::new("other".into(), "other@x.com".into(), "h".into(), RoleName::ClientUser, Some(Uuid::new_v4()))
            .unwrap();
        let outsider_id = outsider.id;
        let tenant_id = tenant.id;
        let mut tenants = MockTenantRepository::new();
        tenants.expect_find_by_id().returning(move |_| Ok(Some(tenant.clone())));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(outsider.clone())));

        let input = NewTicket {
            tenant_id,
            created_for: Some(outsider_id),
            subject: "Sync failing".into(),
            description: "Calendar sync errors".into(),
            priority: TicketPriority::default(),
            category: TicketCategory::default(),
            due_date: None,
        };
        let result = service(MockTicketRepository::new(), users, tenants, MockEmailTransport::new())
            .create(&helpdesk(), input)
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_first_public_comment_records_response() {
        let t = ticket(Uuid::new_v4());
        let id = t.id;
        let mut tickets = MockTicketRepository::new();
        tickets.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));
        tickets.expect_add_comment().returning(|c| Ok(c.clone()));
        tickets
            .expect_update()
            .withf(|t| t.first_response_at.is_some())
            .times(1)
            .returning(|t| Ok(t.clone()));

        let comment = service(tickets, MockUserRepository::new(), MockTenantRepository::new(), MockEmailTransport::new())
            .comment(&helpdesk(), &id, NewComment { content: "Looking into it".into(), is_internal: false })
            .await
            .unwrap();
        assert!(!comment.is_internal);
    }

    #[tokio::test]
    async fn test_internal_comment_does_not_count_as_response() {
        let t = ticket(Uuid::new_v4());
        let id = t.id;
        let mut tickets = MockTicketRepository::new();
        tickets.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));
        tickets.expect_add_comment().returning(|c| Ok(c.clone()));
        tickets.expect_update().never();

        service(tickets, MockUserRepository::new(), MockTenantRepository::new(), MockEmailTransport::new())
            .comment(&helpdesk(), &id, NewComment { content: "Escalating to eng".into(), is_internal: true })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_requires_resolution_and_adds_comment() {
        let svc = service(
            MockTicketRepository::new(),
            MockUserRepository::new(),
            MockTenantRepository::new(),
            MockEmailTransport::new(),
        );
        let result = svc.resolve(&helpdesk(), &Uuid::new_v4(), "   ").await;
        assert!(matches!(result, Err(DomainError::ResolutionRequired)));

        let t = ticket(Uuid::new_v4());
        let id = t.id;
        let mut tickets = MockTicketRepository::new();
        tickets.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));
        tickets
            .expect_update()
            .withf(|t| t.status == TicketStatus::Resolved && t.resolved_at.is_some())
            .returning(|t| Ok(t.clone()));
        tickets
            .expect_add_comment()
            .withf(|c| !c.is_internal && c.content == "Ticket resolved by Sam Support:\n\nCleared the export cache")
            .times(1)
            .returning(|c| Ok(c.clone()));

        let resolved = service(tickets, MockUserRepository::new(), MockTenantRepository::new(), MockEmailTransport::new())
            .resolve(&helpdesk(), &id, "Cleared the export cache")
            .await
            .unwrap();
        assert_eq!(resolved.resolution.as_deref(), Some("Cleared the export cache"));
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let result = service(
            MockTicketRepository::new(),
            MockUserRepository::new(),
            MockTenantRepository::new(),
            MockEmailTransport::new(),
        )
        .change_status(&helpdesk(), &Uuid::new_v4(), "ESCALATED")
        .await;
        assert!(matches!(result, Err(DomainError::InvalidStatus(_))));
    }

    #[tokio::test]
    async fn test_client_cannot_read_other_tenant_ticket() {
        let t = ticket(Uuid::new_v4());
        let id = t.id;
        let mut tickets = MockTicketRepository::new();
        tickets.expect_find_by_id().returning(move |_| Ok(Some(t.clone())));

        let client = principal(RoleName::ClientUser, Some(Uuid::new_v4()), &["view_support_tickets"]);
        let result = service(tickets, MockUserRepository::new(), MockTenantRepository::new(), MockEmailTransport::new())
            .detail_own(&client, &id)
            .await;
        assert!(matches!(result, Err(DomainError::TicketNotFound)));
    }

    #[tokio::test]
    async fn test_client_ticket_starts_new_and_targets_self() {
        let tenant_id = Uuid::new_v4();
        let client = principal(RoleName::ClientUser, Some(tenant_id), &["create_support_tickets"]);
        let me = client.user.clone();
        let my_id = me.id;

        let mut tickets = MockTicketRepository::new();
        tickets.expect_number_exists().returning(|_| Ok(false));
        tickets
            .expect_create()
            .withf(move |t| t.status == TicketStatus::New && t.created_for == Some(my_id) && t.tenant_id == tenant_id)
            .returning(|t| Ok(t.clone()));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(me.clone())));
        let mut transport = MockEmailTransport::new();
        transport.expect_send().returning(|_| Err(DomainError::EmailDeliveryFailed("down".into())));

        let input = NewOwnTicket {
            subject: "Need training".into(),
            description: "New hire onboarding".into(),
            priority: TicketPriority::Low,
            category: TicketCategory::Training,
        };
        let created = service(tickets, users, MockTenantRepository::new(), transport)
            .create_own(&client, input)
            .await
            .unwrap();
        assert_eq!(created.category, TicketCategory::Training);
    }
}
