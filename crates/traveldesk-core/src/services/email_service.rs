// ============================================================================
// TravelDesk Core - Tenant Email Service
// File: crates/traveldesk-core/src/services/email_service.rs
// Description: Tenant-branded client email, ticket notifications and inbound mail
// ============================================================================

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use traveldesk_shared::config::EmailSettings;
use traveldesk_shared::constants::PRE_DEPARTURE_WINDOW_DAYS;
use traveldesk_shared::utils::{mailbox_from_name, mask_email, strip_tags};

use crate::domain::communication::DELIVERY_RECEIVED;
use crate::domain::{
    format_usd_cents, Client, ClientCommunication, CommunicationDirection, CommunicationType,
    Invoice, InvoiceLineItem, Principal, Tenant, Trip, TripItinerary, TripParticipant, TripStatus,
};
use crate::error::DomainError;
use crate::repositories::{
    ClientRepository, CommunicationRepository, EmailTransport, OutgoingEmail, TenantRepository,
};

const TEMPLATES: &[(&str, &str)] = &[
    ("trip_confirmation", include_str!("../../templates/emails/trip_confirmation.hbs")),
    ("payment_reminder", include_str!("../../templates/emails/payment_reminder.hbs")),
    ("itinerary_update", include_str!("../../templates/emails/itinerary_update.hbs")),
    ("pre_departure_checklist", include_str!("../../templates/emails/pre_departure_checklist.hbs")),
    ("invoice", include_str!("../../templates/emails/invoice.hbs")),
    ("itinerary", include_str!("../../templates/emails/itinerary.hbs")),
    ("ticket_created", include_str!("../../templates/emails/ticket_created.hbs")),
    ("ticket_comment", include_str!("../../templates/emails/ticket_comment.hbs")),
    ("ticket_resolved", include_str!("../../templates/emails/ticket_resolved.hbs")),
    ("ticket_status", include_str!("../../templates/emails/ticket_status.hbs")),
    ("password_reset", include_str!("../../templates/emails/password_reset.hbs")),
];

const SYSTEM_MAILBOX: &str = "system";

/// Who an outgoing client email is sent on behalf of.
#[derive(Debug, Clone, Default)]
pub struct EmailSender {
    pub name: Option<String>,
    pub user_id: Option<Uuid>,
}

impl EmailSender {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            name: Some(principal.user.display_name()),
            user_id: Some(principal.id()),
        }
    }
}

/// A templated email to one client, logged as a communication.
pub struct ClientEmail<'a> {
    pub client: &'a Client,
    pub tenant: Option<&'a Tenant>,
    pub subject: String,
    pub template: &'a str,
    /// Extra template variables, merged over the standard ones.
    pub context: Value,
    pub communication_type: CommunicationType,
    pub trip_id: Option<Uuid>,
    pub sender: EmailSender,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailOutcome {
    pub sent: bool,
    pub communication: ClientCommunication,
}

/// Mailgun inbound route payload.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEmail {
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub subject: String,
    #[serde(rename = "body-plain", default)]
    pub body_plain: String,
    #[serde(rename = "Message-Id")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundResult {
    pub processed: bool,
    pub communication_id: Option<Uuid>,
}

pub struct TenantEmailService {
    transport: Arc<dyn EmailTransport>,
    comm_repo: Arc<dyn CommunicationRepository>,
    client_repo: Arc<dyn ClientRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    templates: Handlebars<'static>,
    use_development_domain: bool,
    development_domain: String,
    base_domain: String,
    default_domain: String,
}

impl TenantEmailService {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        comm_repo: Arc<dyn CommunicationRepository>,
        client_repo: Arc<dyn ClientRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        settings: &EmailSettings,
        debug: bool,
    ) -> Result<Self, DomainError> {
        let mut templates = Handlebars::new();
        templates
            .register_partial("footer", include_str!("../../templates/emails/footer.hbs"))
            .map_err(|e| DomainError::TemplateError(e.to_string()))?;
        for (name, source) in TEMPLATES {
            templates
                .register_template_string(name, *source)
                .map_err(|e| DomainError::TemplateError(format!("{}: {}", name, e)))?;
        }

        Ok(Self {
            transport,
            comm_repo,
            client_repo,
            tenant_repo,
            templates,
            use_development_domain: debug || !settings.multi_domain_enabled,
            development_domain: settings.development_domain.clone(),
            base_domain: settings.base_domain.clone(),
            default_domain: settings.default_domain.clone(),
        })
    }

    /// Development domain unless multi-domain sending is live, then the tenant's subdomain.
    pub fn sending_domain(&self, tenant: Option<&Tenant>) -> String {
        if self.use_development_domain {
            return self.development_domain.clone();
        }
        match tenant {
            Some(t) => format!("{}.{}", t.subdomain, self.base_domain),
            None => self.default_domain.clone(),
        }
    }

    pub fn sender_address(&self, sender_name: Option<&str>, tenant: Option<&Tenant>) -> String {
        let mailbox = sender_name.map(mailbox_from_name).filter(|m| !m.is_empty());
        format!(
            "{}@{}",
            mailbox.as_deref().unwrap_or(SYSTEM_MAILBOX),
            self.sending_domain(tenant)
        )
    }

    pub fn render(&self, template: &str, context: &Value) -> Result<String, DomainError> {
        self.templates
            .render(template, context)
            .map_err(|e| DomainError::TemplateError(format!("{}: {}", template, e)))
    }

    async fn tenant_of(&self, client: &Client) -> Result<Option<Tenant>, DomainError> {
        self.tenant_repo.find_by_id(&client.tenant_id).await
    }

    /// Renders, logs and sends a client email. `Ok(None)` when the client has no address.
    pub async fn send_client_email(&self, email: ClientEmail<'_>) -> Result<Option<EmailOutcome>, DomainError> {
        let client = email.client;
        if !client.has_email() {
            warn!("Client {} has no email address, skipping '{}'", client.id, email.subject);
            return Ok(None);
        }

        // 1. Template context
        let tenant_name = email.tenant.map(|t| t.name.clone());
        let mut context = json!({
            "client": client,
            "tenant": email.tenant,
            "tenant_name": tenant_name,
            "subject": email.subject,
            "sender_email": email.tenant.and_then(|t| t.contact_email.clone()),
            "sender_phone": email.tenant.and_then(|t| t.phone.clone()),
            "sender_name": email.sender.name.clone().or(tenant_name),
        });
        merge(&mut context, email.context);

        // 2. Render
        let html = self.render(email.template, &context)?;
        let text = strip_tags(&html);

        // 3. Log the communication before sending
        let mut comm = ClientCommunication::new(
            client.id,
            email.communication_type,
            CommunicationDirection::Outbound,
            &email.subject,
            &text,
        );
        comm.trip_id = email.trip_id;
        comm.created_by = email.sender.user_id;
        comm.scheduled_at = Some(Utc::now());
        let mut comm = self.comm_repo.create(&comm).await?;

        // 4. Send
        let from = self.sender_address(email.sender.name.as_deref(), email.tenant);
        let message = OutgoingEmail::new(from, &client.email, &email.subject, text, Some(html));
        let sent = match self.transport.send(&message).await {
            Ok(delivered) => {
                comm.mark_sent(delivered);
                delivered
            }
            Err(e) => {
                error!("Email to {} failed: {}", mask_email(&client.email), e);
                comm.mark_error(&e.to_string());
                false
            }
        };
        self.comm_repo.update(&comm).await?;

        if sent {
            info!("Email '{}' sent to {}", email.subject, mask_email(&client.email));
        }
        Ok(Some(EmailOutcome { sent, communication: comm }))
    }

    pub async fn send_trip_confirmation(
        &self,
        client: &Client,
        trip: &Trip,
        sender: EmailSender,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        let tenant = self.tenant_of(client).await?;
        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Trip Confirmation - {}", trip.trip_name),
            template: "trip_confirmation",
            context: json!({ "trip": trip_context(trip) }),
            communication_type: CommunicationType::Email,
            trip_id: Some(trip.id),
            sender,
        })
        .await
    }

    pub async fn send_itinerary_update(
        &self,
        client: &Client,
        trip: &Trip,
        days: &[TripItinerary],
        sender: EmailSender,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        let tenant = self.tenant_of(client).await?;
        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Itinerary Update - {}", trip.trip_name),
            template: "itinerary_update",
            context: json!({ "trip": trip_context(trip), "itinerary_days": days }),
            communication_type: CommunicationType::Email,
            trip_id: Some(trip.id),
            sender,
        })
        .await
    }

    pub async fn send_pre_departure_checklist(
        &self,
        client: &Client,
        trip: &Trip,
        participants: &[TripParticipant],
        sender: EmailSender,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        let tenant = self.tenant_of(client).await?;
        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Pre-Departure Checklist - {}", trip.trip_name),
            template: "pre_departure_checklist",
            context: json!({ "trip": trip_context(trip), "participants": participants }),
            communication_type: CommunicationType::Email,
            trip_id: Some(trip.id),
            sender,
        })
        .await
    }

    /// Sends nothing unless the invoice is open, unpaid, and due within the reminder window.
    pub async fn send_payment_reminder(
        &self,
        client: &Client,
        invoice: &Invoice,
        trip: Option<&Trip>,
        sender: EmailSender,
        today: NaiveDate,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        if !invoice.needs_payment_reminder(today) {
            info!("Invoice {} does not need a payment reminder", invoice.invoice_number);
            return Ok(None);
        }
        let tenant = self.tenant_of(client).await?;
        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Payment Reminder - Invoice {}", invoice.invoice_number),
            template: "payment_reminder",
            context: json!({
                "invoice": invoice_context(invoice, today),
                "trip": trip.map(trip_context),
            }),
            communication_type: CommunicationType::Email,
            trip_id: invoice.trip_id,
            sender,
        })
        .await
    }

    pub async fn send_invoice(
        &self,
        client: &Client,
        invoice: &Invoice,
        lines: &[InvoiceLineItem],
        trip: Option<&Trip>,
        sender: EmailSender,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        let tenant = self.tenant_of(client).await?;
        let tenant_name = tenant.as_ref().map(|t| t.name.as_str()).unwrap_or("TravelDesk");
        let lines: Vec<Value> = lines
            .iter()
            .map(|l| {
                json!({
                    "description": l.description,
                    "quantity": l.quantity,
                    "unit_display": format_usd_cents(l.unit_price),
                    "total_display": format_usd_cents(l.total_price),
                })
            })
            .collect();

        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Invoice {} from {}", invoice.invoice_number, tenant_name),
            template: "invoice",
            context: json!({
                "invoice": invoice_context(invoice, Utc::now().date_naive()),
                "lines": lines,
                "trip": trip.map(trip_context),
            }),
            communication_type: CommunicationType::Email,
            trip_id: invoice.trip_id,
            sender,
        })
        .await
    }

    pub async fn send_itinerary(
        &self,
        client: &Client,
        trip: &Trip,
        days: &[TripItinerary],
        custom_message: Option<&str>,
        sender: EmailSender,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        let tenant = self.tenant_of(client).await?;
        self.send_client_email(ClientEmail {
            client,
            tenant: tenant.as_ref(),
            subject: format!("Your Itinerary: {} - {}", trip.trip_name, trip.destination),
            template: "itinerary",
            context: json!({
                "trip": trip_context(trip),
                "itinerary_days": days,
                "custom_message": custom_message.map(str::trim).filter(|m| !m.is_empty()),
            }),
            communication_type: CommunicationType::Email,
            trip_id: Some(trip.id),
            sender,
        })
        .await
    }

    /// Finalized trips get the checklist when departure is 1 to 30 days out,
    /// otherwise a confirmation.
    pub async fn schedule_trip_communications(
        &self,
        client: &Client,
        trip: &Trip,
        participants: &[TripParticipant],
        sender: EmailSender,
        today: NaiveDate,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        if trip.status != TripStatus::Finalized {
            return Ok(None);
        }
        let departing_soon = trip
            .days_until_departure(today)
            .map(|days| (1..=PRE_DEPARTURE_WINDOW_DAYS).contains(&days))
            .unwrap_or(false);

        if departing_soon {
            self.send_pre_departure_checklist(client, trip, participants, sender).await
        } else {
            self.send_trip_confirmation(client, trip, sender).await
        }
    }

    /// Platform mail (ticket notifications, password resets) from the system mailbox.
    pub async fn send_system_email(
        &self,
        to: &str,
        subject: &str,
        template: &str,
        context: Value,
    ) -> Result<bool, DomainError> {
        let mut context = context;
        merge(&mut context, json!({ "subject": subject }));
        let html = self.render(template, &context)?;
        let message = OutgoingEmail::new(
            self.sender_address(None, None),
            to,
            subject,
            strip_tags(&html),
            Some(html),
        );
        let sent = self.transport.send(&message).await?;
        if !sent {
            warn!("System email '{}' to {} was not accepted", subject, mask_email(to));
        }
        Ok(sent)
    }

    /// Records a client's reply. Only a single matching client is accepted.
    pub async fn process_inbound(&self, inbound: InboundEmail) -> Result<InboundResult, DomainError> {
        let address = sender_address_of(&inbound.sender);
        let mut matches = self.client_repo.find_by_email(&address).await?;
        if matches.len() != 1 {
            warn!(
                "Inbound email from {} matched {} clients, not processed",
                mask_email(&address),
                matches.len()
            );
            return Ok(InboundResult { processed: false, communication_id: None });
        }
        let mut client = matches.remove(0);

        let subject = if inbound.subject.trim().is_empty() {
            "(no subject)"
        } else {
            inbound.subject.trim()
        };
        let mut comm = ClientCommunication::new(
            client.id,
            CommunicationType::Email,
            CommunicationDirection::Inbound,
            subject,
            &inbound.body_plain,
        );
        let now = Utc::now();
        comm.email_message_id = inbound.message_id;
        comm.email_delivery_status = Some(DELIVERY_RECEIVED.to_string());
        comm.sent_at = Some(now);
        let saved = self.comm_repo.create(&comm).await?;

        client.last_contact_date = Some(now);
        client.updated_at = now;
        self.client_repo.update(&client).await?;

        info!("Inbound email from {} recorded for client {}", mask_email(&address), client.id);
        Ok(InboundResult { processed: true, communication_id: Some(saved.id) })
    }
}

/// Shallow merge of `extra`'s keys into `base`; both must be objects.
fn merge(base: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(source)) = (base.as_object_mut(), extra) {
        target.extend(source);
    }
}

fn trip_context(trip: &Trip) -> Value {
    let mut ctx = serde_json::to_value(trip).unwrap_or_else(|_| Value::Object(Map::new()));
    merge(
        &mut ctx,
        json!({
            "trip_type_display": trip.trip_type_display(),
            "duration_days": trip.duration_days(),
            "total_display": trip.total_amount.map(format_usd_cents),
        }),
    );
    ctx
}

fn invoice_context(invoice: &Invoice, today: NaiveDate) -> Value {
    let mut ctx = serde_json::to_value(invoice).unwrap_or_else(|_| Value::Object(Map::new()));
    merge(
        &mut ctx,
        json!({
            "subtotal_display": format_usd_cents(invoice.subtotal),
            "tax_display": format_usd_cents(invoice.tax_amount),
            "total_display": format_usd_cents(invoice.total_amount),
            "paid_display": format_usd_cents(invoice.paid_amount),
            "balance_display": format_usd_cents(invoice.balance_due()),
            "is_overdue": invoice.is_overdue(today),
        }),
    );
    ctx
}

/// `Jane Doe <jane@example.com>` and bare addresses both yield the address.
fn sender_address_of(sender: &str) -> String {
    let trimmed = sender.trim();
    let address = match (trimmed.rfind('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if start < end => &trimmed[start + 1..end],
        _ => trimmed,
    };
    address.trim().to_lowercase()
}
