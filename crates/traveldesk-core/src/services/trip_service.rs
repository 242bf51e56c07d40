// ============================================================================
// TravelDesk Core - Trip Service
// File: crates/traveldesk-core/src/services/trip_service.rs
// Description: Trip builder: trips, line items, itinerary, travelers and trip invoices
// ============================================================================

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use traveldesk_shared::constants::INVOICE_DUE_DAYS;
use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{
    Client, Invoice, InvoiceLineItem, LineItemType, ParticipantRelationship, Principal, Trip,
    TripItinerary, TripLineItem, TripParticipant, TripStatus, TripType,
};
use crate::error::DomainError;
use crate::repositories::{ClientRepository, InvoiceRepository, TripFilter, TripListRow, TripRepository};
use crate::services::email_service::{EmailOutcome, EmailSender, TenantEmailService};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    pub client_id: Uuid,
    pub trip_name: String,
    #[serde(default)]
    pub trip_type: TripType,
    pub custom_trip_type: Option<String>,
    pub destination: String,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub departure_location: Option<String>,
    pub budget_range_min: Option<Decimal>,
    pub budget_range_max: Option<Decimal>,
    pub estimated_cost: Option<Decimal>,
    pub quoted_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub number_of_travelers: Option<i32>,
    pub description: Option<String>,
    pub special_requests: Option<String>,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripUpdate {
    pub trip_name: Option<String>,
    pub trip_type: Option<TripType>,
    pub custom_trip_type: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub departure_location: Option<String>,
    pub budget_range_min: Option<Decimal>,
    pub budget_range_max: Option<Decimal>,
    pub estimated_cost: Option<Decimal>,
    pub quoted_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub number_of_travelers: Option<i32>,
    pub description: Option<String>,
    pub special_requests: Option<String>,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: TripStatus,
    #[serde(default)]
    pub auto_create_invoice: bool,
    /// Send the confirmation or pre-departure email when finalizing.
    #[serde(default)]
    pub notify_client: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeResult {
    pub trip: Trip,
    pub invoice: Option<Invoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemInput {
    #[serde(default)]
    pub item_type: LineItemType,
    pub description: String,
    pub supplier: Option<String>,
    #[serde(default = "one")]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Option<Decimal>,
    pub confirmation_number: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub service_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default)]
    pub is_paid: bool,
    pub notes: Option<String>,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItineraryDayInput {
    pub day_number: i32,
    pub date: Option<NaiveDate>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    pub accommodation: Option<String>,
    pub activities: Option<String>,
    pub meals: Option<String>,
    pub transportation: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewParticipant {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub relationship_to_client: ParticipantRelationship,
    pub passport_number: Option<String>,
    pub passport_expiry: Option<NaiveDate>,
    pub special_needs: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripEmailKind {
    Confirmation,
    ItineraryUpdate,
    PreDeparture,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripListResult {
    pub trips: Page<TripListRow>,
    pub total: i64,
    pub upcoming: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripDetail {
    pub trip: Trip,
    pub client: Client,
    pub trip_type_display: String,
    pub duration_days: Option<i64>,
    pub budget_range_display: Option<String>,
    pub line_items: Vec<TripLineItem>,
    pub line_items_total: Decimal,
    pub itinerary: Vec<TripItinerary>,
    pub participants: Vec<TripParticipant>,
    pub invoice: Option<Invoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushResult {
    pub invoice: Invoice,
    pub added: usize,
    pub skipped: usize,
}

pub struct TripService {
    trip_repo: Arc<dyn TripRepository>,
    client_repo: Arc<dyn ClientRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    email: Arc<TenantEmailService>,
}

impl TripService {
    pub fn new(
        trip_repo: Arc<dyn TripRepository>,
        client_repo: Arc<dyn ClientRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        email: Arc<TenantEmailService>,
    ) -> Self {
        Self { trip_repo, client_repo, invoice_repo, email }
    }

    async fn load(&self, principal: &Principal, id: &Uuid) -> Result<Trip, DomainError> {
        let tenant_id = principal.require_tenant()?;
        self.trip_repo
            .find_by_id(&tenant_id, id)
            .await?
            .ok_or(DomainError::TripNotFound)
    }

    async fn client_of(&self, principal: &Principal, trip: &Trip) -> Result<Client, DomainError> {
        let tenant_id = principal.require_tenant()?;
        self.client_repo
            .find_by_id(&tenant_id, &trip.client_id)
            .await?
            .ok_or(DomainError::ClientNotFound)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &TripFilter,
        pagination: Pagination,
    ) -> Result<TripListResult, DomainError> {
        principal.require("view_trips")?;
        let tenant_id = principal.require_tenant()?;
        let today = Utc::now().date_naive();

        let trips = self.trip_repo.list(&tenant_id, filter, today, pagination).await?;
        let upcoming = self.trip_repo.count_upcoming(&tenant_id, today).await?;
        Ok(TripListResult { total: trips.total, upcoming, trips })
    }

    pub async fn detail(&self, principal: &Principal, id: &Uuid) -> Result<TripDetail, DomainError> {
        principal.require("view_trips")?;
        let trip = self.load(principal, id).await?;
        let client = self.client_of(principal, &trip).await?;
        let line_items = self.trip_repo.list_line_items(&trip.id).await?;
        let invoice = if principal.has_permission("view_invoices") {
            self.invoice_repo.find_for_trip(&trip.id).await?
        } else {
            None
        };

        Ok(TripDetail {
            trip_type_display: trip.trip_type_display(),
            duration_days: trip.duration_days(),
            budget_range_display: trip.budget_range_display(),
            line_items_total: line_items.iter().map(|i| i.total_price).sum(),
            itinerary: self.trip_repo.list_itinerary(&trip.id).await?,
            participants: self.trip_repo.list_participants(&trip.id).await?,
            line_items,
            invoice,
            client,
            trip,
        })
    }

    pub async fn create(&self, principal: &Principal, input: NewTrip) -> Result<Trip, DomainError> {
        principal.require("create_trips")?;
        let tenant_id = principal.require_tenant()?;

        // 1. Client must be an active client of the tenant
        let client = self
            .client_repo
            .find_by_id(&tenant_id, &input.client_id)
            .await?
            .ok_or(DomainError::ClientNotFound)?;
        if !client.is_active {
            return Err(DomainError::ValidationError("Client is inactive".into()));
        }

        // 2. Build and validate
        let mut trip = Trip::new(
            client.id,
            Some(principal.id()),
            &input.trip_name,
            input.trip_type,
            &input.destination,
        )?;
        trip.set_trip_type(input.trip_type, input.custom_trip_type);
        trip.departure_date = input.departure_date;
        trip.return_date = input.return_date;
        trip.departure_location = input.departure_location;
        trip.budget_range_min = input.budget_range_min;
        trip.budget_range_max = input.budget_range_max;
        trip.estimated_cost = input.estimated_cost;
        trip.quoted_price = input.quoted_price;
        trip.total_amount = input.total_amount;
        trip.number_of_travelers = input.number_of_travelers.unwrap_or(1);
        trip.description = input.description;
        trip.special_requests = input.special_requests;
        trip.internal_notes = input.internal_notes;
        check_trip(&trip)?;

        // 3. Save
        let created = self.trip_repo.create(&trip).await?;
        info!("Trip created: {} for client {}", created.trip_name, client.id);
        Ok(created)
    }

    pub async fn update(&self, principal: &Principal, id: &Uuid, changes: TripUpdate) -> Result<Trip, DomainError> {
        principal.require("edit_trips")?;
        let mut trip = self.load(principal, id).await?;

        if let Some(v) = changes.trip_name {
            trip.trip_name = v.trim().to_string();
        }
        if let Some(v) = changes.trip_type {
            trip.set_trip_type(v, changes.custom_trip_type);
        } else if changes.custom_trip_type.is_some() {
            trip.set_trip_type(trip.trip_type, changes.custom_trip_type);
        }
        if let Some(v) = changes.destination {
            trip.destination = v.trim().to_string();
        }
        if changes.departure_date.is_some() {
            trip.departure_date = changes.departure_date;
        }
        if changes.return_date.is_some() {
            trip.return_date = changes.return_date;
        }
        if changes.departure_location.is_some() {
            trip.departure_location = changes.departure_location;
        }
        if changes.budget_range_min.is_some() {
            trip.budget_range_min = changes.budget_range_min;
        }
        if changes.budget_range_max.is_some() {
            trip.budget_range_max = changes.budget_range_max;
        }
        if changes.estimated_cost.is_some() {
            trip.estimated_cost = changes.estimated_cost;
        }
        if changes.quoted_price.is_some() {
            trip.quoted_price = changes.quoted_price;
        }
        if changes.total_amount.is_some() {
            trip.total_amount = changes.total_amount;
        }
        if let Some(v) = changes.number_of_travelers {
            trip.number_of_travelers = v;
        }
        if changes.description.is_some() {
            trip.description = changes.description;
        }
        if changes.special_requests.is_some() {
            trip.special_requests = changes.special_requests;
        }
        if changes.internal_notes.is_some() {
            trip.internal_notes = changes.internal_notes;
        }
        trip.updated_at = Utc::now();
        check_trip(&trip)?;

        self.trip_repo.update(&trip).await
    }

    pub async fn change_status(
        &self,
        principal: &Principal,
        id: &Uuid,
        change: StatusChange,
    ) -> Result<StatusChangeResult, DomainError> {
        principal.require("edit_trips")?;
        let finalized = change.status == TripStatus::Finalized;
        let wants_invoice = finalized && change.auto_create_invoice;
        if wants_invoice {
            principal.require("create_invoices")?;
        }

        let mut trip = self.load(principal, id).await?;
        let previous = trip.status;
        trip.status = change.status;
        trip.updated_at = Utc::now();

        let has_invoice = wants_invoice && self.invoice_repo.find_for_trip(&trip.id).await?.is_some();
        let (trip, invoice) = if wants_invoice && !has_invoice {
            let invoice = self.finalized_invoice(principal, &trip).await?;
            let created = self.invoice_repo.create_for_trip_status(&trip, &invoice).await?;
            info!("Invoice {} created for finalized trip {}", created.invoice_number, trip.id);
            (trip, Some(created))
        } else {
            if has_invoice {
                info!("Trip {} already has an invoice, none created", trip.id);
            }
            (self.trip_repo.update(&trip).await?, None)
        };
        info!("Trip {} status {} -> {}", trip.id, previous, trip.status);

        if finalized && change.notify_client {
            let client = self.client_of(principal, &trip).await?;
            let participants = self.trip_repo.list_participants(&trip.id).await?;
            let today = Utc::now().date_naive();
            if let Err(e) = self
                .email
                .schedule_trip_communications(&client, &trip, &participants, EmailSender::from_principal(principal), today)
                .await
            {
                warn!("Trip communication for {} failed: {}", trip.id, e);
            }
        }

        Ok(StatusChangeResult { trip, invoice })
    }

    /// DRAFT invoice for the whole trip amount, numbered by date and running
    /// count. The due date is left for the advisor to set.
    async fn finalized_invoice(&self, principal: &Principal, trip: &Trip) -> Result<Invoice, DomainError> {
        let today = Utc::now().date_naive();
        let sequence = self.invoice_repo.count_all().await? + 1;
        let amount = trip.total_amount.unwrap_or(Decimal::ZERO);

        let mut invoice = Invoice::new(trip.client_id, Invoice::dated_number(today, sequence), today);
        invoice.trip_id = Some(trip.id);
        invoice.created_by = Some(principal.id());
        invoice.subtotal = amount;
        invoice.total_amount = amount;
        invoice.notes = Some(format!("Auto-generated invoice for {}", trip.trip_name));
        Ok(invoice)
    }

    // ---- Line items ----

    pub async fn line_items(&self, principal: &Principal, trip_id: &Uuid) -> Result<Vec<TripLineItem>, DomainError> {
        principal.require("view_trips")?;
        let trip = self.load(principal, trip_id).await?;
        self.trip_repo.list_line_items(&trip.id).await
    }

    pub async fn add_line_item(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        input: LineItemInput,
    ) -> Result<TripLineItem, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let mut item = TripLineItem::new(
            trip.id,
            input.item_type,
            &input.description,
            input.quantity,
            input.unit_price,
            input.total_price,
        )?;
        apply_line_details(&mut item, input);
        self.trip_repo.add_line_item(&item).await
    }

    pub async fn update_line_item(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        item_id: &Uuid,
        input: LineItemInput,
    ) -> Result<TripLineItem, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let mut item = self
            .trip_repo
            .find_line_item(&trip.id, item_id)
            .await?
            .ok_or(DomainError::LineItemNotFound)?;

        item.item_type = input.item_type;
        item.description = input.description.trim().to_string();
        item.quantity = input.quantity;
        item.unit_price = input.unit_price;
        item.set_total(input.total_price);
        apply_line_details(&mut item, input);
        item.updated_at = Utc::now();
        validator::Validate::validate(&item)?;

        self.trip_repo.update_line_item(&item).await
    }

    pub async fn delete_line_item(&self, principal: &Principal, trip_id: &Uuid, item_id: &Uuid) -> Result<(), DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        if !self.trip_repo.delete_line_item(&trip.id, item_id).await? {
            return Err(DomainError::LineItemNotFound);
        }
        Ok(())
    }

    // ---- Push to invoice ----

    /// The trip's invoice, created as a DRAFT the first time anything is pushed.
    async fn trip_invoice(&self, principal: &Principal, trip: &Trip) -> Result<Invoice, DomainError> {
        if let Some(existing) = self.invoice_repo.find_for_trip(&trip.id).await? {
            return Ok(existing);
        }
        let today = Utc::now().date_naive();
        let mut invoice = Invoice::new(trip.client_id, Invoice::trip_number(&trip.id), today);
        invoice.trip_id = Some(trip.id);
        invoice.created_by = Some(principal.id());
        invoice.due_date = Some(today + Duration::days(INVOICE_DUE_DAYS));
        invoice.notes = Some(format!("Invoice for trip: {}", trip.trip_name));
        let created = self.invoice_repo.create(&invoice).await?;
        info!("Invoice {} opened for trip {}", created.invoice_number, trip.id);
        Ok(created)
    }

    async fn refresh_totals(&self, mut invoice: Invoice) -> Result<Invoice, DomainError> {
        let lines = self.invoice_repo.list_lines(&invoice.id).await?;
        invoice.recalculate(&lines);
        self.invoice_repo.update(&invoice).await
    }

    pub async fn push_line_item(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        item_id: &Uuid,
    ) -> Result<PushResult, DomainError> {
        principal.require("create_invoices")?;
        let trip = self.load(principal, trip_id).await?;
        let item = self
            .trip_repo
            .find_line_item(&trip.id, item_id)
            .await?
            .ok_or(DomainError::LineItemNotFound)?;

        let invoice = self.trip_invoice(principal, &trip).await?;
        let existing = self.invoice_repo.list_lines(&invoice.id).await?;
        let description = item.invoice_description();
        if is_duplicate(&existing, &description, item.unit_price) {
            return Err(DomainError::DuplicateInvoiceLine(description));
        }

        let line = InvoiceLineItem::new(invoice.id, &description, item.quantity, item.unit_price, Some(item.total_price))?;
        self.invoice_repo.add_line(&line).await?;
        let invoice = self.refresh_totals(invoice).await?;
        Ok(PushResult { invoice, added: 1, skipped: 0 })
    }

    /// Pushes every line item, skipping those already on the invoice.
    pub async fn push_all(&self, principal: &Principal, trip_id: &Uuid) -> Result<PushResult, DomainError> {
        principal.require("create_invoices")?;
        let trip = self.load(principal, trip_id).await?;
        let items = self.trip_repo.list_line_items(&trip.id).await?;

        let invoice = self.trip_invoice(principal, &trip).await?;
        let mut existing = self.invoice_repo.list_lines(&invoice.id).await?;
        let (mut added, mut skipped) = (0, 0);

        for item in &items {
            let description = item.invoice_description();
            if is_duplicate(&existing, &description, item.unit_price) {
                skipped += 1;
                continue;
            }
            let line = InvoiceLineItem::new(invoice.id, &description, item.quantity, item.unit_price, Some(item.total_price))?;
            existing.push(self.invoice_repo.add_line(&line).await?);
            added += 1;
        }

        let invoice = self.refresh_totals(invoice).await?;
        info!("Pushed trip {} to invoice {}: {} added, {} skipped", trip.id, invoice.invoice_number, added, skipped);
        Ok(PushResult { invoice, added, skipped })
    }

    // ---- Itinerary ----

    pub async fn itinerary(&self, principal: &Principal, trip_id: &Uuid) -> Result<Vec<TripItinerary>, DomainError> {
        principal.require("view_trips")?;
        let trip = self.load(principal, trip_id).await?;
        self.trip_repo.list_itinerary(&trip.id).await
    }

    pub async fn add_itinerary_day(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        input: ItineraryDayInput,
    ) -> Result<TripItinerary, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        if self.trip_repo.day_number_taken(&trip.id, input.day_number, None).await? {
            return Err(DomainError::ItineraryDayExists(input.day_number));
        }

        let mut day = TripItinerary::new(trip.id, input.day_number, &input.title, &input.description)?;
        apply_day_details(&mut day, input);
        self.trip_repo.add_itinerary_day(&day).await
    }

    pub async fn update_itinerary_day(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        day_id: &Uuid,
        input: ItineraryDayInput,
    ) -> Result<TripItinerary, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let mut day = self
            .trip_repo
            .find_itinerary_day(&trip.id, day_id)
            .await?
            .ok_or(DomainError::ItineraryDayNotFound)?;
        if input.day_number != day.day_number
            && self.trip_repo.day_number_taken(&trip.id, input.day_number, Some(day.id)).await?
        {
            return Err(DomainError::ItineraryDayExists(input.day_number));
        }

        day.day_number = input.day_number;
        day.title = input.title.trim().to_string();
        day.description = input.description.trim().to_string();
        apply_day_details(&mut day, input);
        validator::Validate::validate(&day)?;
        self.trip_repo.update_itinerary_day(&day).await
    }

    /// Later days move up one to close the gap.
    pub async fn delete_itinerary_day(&self, principal: &Principal, trip_id: &Uuid, day_id: &Uuid) -> Result<(), DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        if !self.trip_repo.delete_itinerary_day(&trip.id, day_id).await? {
            return Err(DomainError::ItineraryDayNotFound);
        }
        Ok(())
    }

    // ---- Participants ----

    pub async fn participants(&self, principal: &Principal, trip_id: &Uuid) -> Result<Vec<TripParticipant>, DomainError> {
        principal.require("view_trips")?;
        let trip = self.load(principal, trip_id).await?;
        self.trip_repo.list_participants(&trip.id).await
    }

    pub async fn add_participant(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        input: NewParticipant,
    ) -> Result<TripParticipant, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let participant = TripParticipant {
            id: Uuid::new_v4(),
            trip_id: trip.id,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            date_of_birth: input.date_of_birth,
            email: input.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()),
            phone: input.phone,
            relationship_to_client: input.relationship_to_client,
            passport_number: input.passport_number,
            passport_expiry: input.passport_expiry,
            special_needs: input.special_needs,
            created_at: Utc::now(),
        };
        validator::Validate::validate(&participant)?;
        if participant.passport_expires_before(&trip) {
            warn!("Passport of {} expires before trip {} ends", participant.full_name(), trip.id);
        }
        self.trip_repo.add_participant(&participant).await
    }

    pub async fn remove_participant(&self, principal: &Principal, trip_id: &Uuid, participant_id: &Uuid) -> Result<(), DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        if !self.trip_repo.delete_participant(&trip.id, participant_id).await? {
            return Err(DomainError::ParticipantNotFound);
        }
        Ok(())
    }

    // ---- Emails ----

    async fn emailable_client(&self, principal: &Principal, trip: &Trip) -> Result<Client, DomainError> {
        let client = self.client_of(principal, trip).await?;
        if !client.has_email() {
            return Err(DomainError::ClientHasNoEmail);
        }
        Ok(client)
    }

    pub async fn email_itinerary(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        custom_message: Option<&str>,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let client = self.emailable_client(principal, &trip).await?;
        let days = self.trip_repo.list_itinerary(&trip.id).await?;
        self.email
            .send_itinerary(&client, &trip, &days, custom_message, EmailSender::from_principal(principal))
            .await
    }

    pub async fn send_trip_email(
        &self,
        principal: &Principal,
        trip_id: &Uuid,
        kind: TripEmailKind,
    ) -> Result<Option<EmailOutcome>, DomainError> {
        principal.require("edit_trips")?;
        let trip = self.load(principal, trip_id).await?;
        let client = self.emailable_client(principal, &trip).await?;
        let sender = EmailSender::from_principal(principal);

        match kind {
            TripEmailKind::Confirmation => self.email.send_trip_confirmation(&client, &trip, sender).await,
            TripEmailKind::ItineraryUpdate => {
                let days = self.trip_repo.list_itinerary(&trip.id).await?;
                self.email.send_itinerary_update(&client, &trip, &days, sender).await
            }
            TripEmailKind::PreDeparture => {
                let participants = self.trip_repo.list_participants(&trip.id).await?;
                self.email
                    .send_pre_departure_checklist(&client, &trip, &participants, sender)
                    .await
            }
        }
    }
}

fn check_trip(trip: &Trip) -> Result<(), DomainError> {
    validator::Validate::validate(trip)?;
    if !trip.dates_are_consistent() {
        return Err(DomainError::ValidationError(
            "Return date cannot be before departure date".into(),
        ));
    }
    Ok(())
}

fn apply_line_details(item: &mut TripLineItem, input: LineItemInput) {
    item.supplier = input.supplier;
    item.confirmation_number = input.confirmation_number;
    item.booking_date = input.booking_date;
    item.service_date = input.service_date;
    item.is_confirmed = input.is_confirmed;
    item.is_paid = input.is_paid;
    item.notes = input.notes;
}

fn apply_day_details(day: &mut TripItinerary, input: ItineraryDayInput) {
    day.date = input.date;
    day.location = input.location;
    day.accommodation = input.accommodation;
    day.activities = input.activities;
    day.meals = input.meals;
    day.transportation = input.transportation;
    day.notes = input.notes;
}

/// Same description and unit price already on the invoice.
fn is_duplicate(lines: &[InvoiceLineItem], description: &str, unit_price: Decimal) -> bool {
    lines
        .iter()
        .any(|l| l.description == description && l.unit_price == unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InvoiceStatus, RequestMeta, RoleName, User};
    use crate::repositories::{
        MockClientRepository, MockCommunicationRepository, MockEmailTransport, MockInvoiceRepository,
        MockTenantRepository, MockTripRepository,
    };
    use rust_decimal_macros::dec;
    use traveldesk_shared::config::{EmailSettings, EmailTransportKind};

    fn advisor(tenant_id: Uuid, perms: &[&str]) -> Principal {
        let user = User::new("advisor".into(), "advisor@example.com".into(), "h".into(), RoleName::ClientAdmin, Some(tenant_id))
            .unwrap();
        Principal::new(user, perms.iter().map(|p| p.to_string()).collect(), RequestMeta::default())
    }

    fn idle_email() -> Arc<TenantEmailService> {
        let settings = EmailSettings {
            transport: EmailTransportKind::Log,
            mailgun_api_key: String::new(),
            mailgun_domain: String::new(),
            mailgun_api_base: String::new(),
            multi_domain_enabled: false,
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
                Arc::new(MockEmailTransport::new()),
                Arc::new(MockCommunicationRepository::new()),
                Arc::new(MockClientRepository::new()),
                Arc::new(MockTenantRepository::new()),
                &settings,
                true,
            )
            .unwrap(),
        )
    }

    fn service(trips: MockTripRepository, clients: MockClientRepository, invoices: MockInvoiceRepository) -> TripService {
        TripService::new(Arc::new(trips), Arc::new(clients), Arc::new(invoices), idle_email())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_trip(client_id: Uuid) -> NewTrip {
        NewTrip {
            client_id,
            trip_name: "Alaska Cruise".into(),
            trip_type: TripType::Cruise,
            custom_trip_type: None,
            destination: "Juneau".into(),
            departure_date: Some(date(2025, 6, 10)),
            return_date: Some(date(2025, 6, 17)),
            departure_location: None,
            budget_range_min: None,
            budget_range_max: None,
            estimated_cost: None,
            quoted_price: None,
            total_amount: Some(dec!(4200)),
            number_of_travelers: Some(2),
            description: None,
            special_requests: None,
            internal_notes: None,
        }
    }

    fn trip_line(trip_id: Uuid, description: &str, price: Decimal) -> TripLineItem {
        TripLineItem::new(trip_id, LineItemType::Excursion, description, 1, price, None).unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_return_before_departure() {
        let tenant_id = Uuid::new_v4();
        let client = Client::new(tenant_id, None, "Jane", "Doe", "jane@example.com").unwrap();
        let client_id = client.id;
        let mut clients = MockClientRepository::new();
        clients.expect_find_by_id().returning(move |_, _| Ok(Some(client.clone())));

        let mut input = new_trip(client_id);
        input.return_date = Some(date(2025, 6, 1));
        let result = service(MockTripRepository::new(), clients, MockInvoiceRepository::new())
            .create(&advisor(tenant_id, &["create_trips"]), input)
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_requires_active_client() {
        let tenant_id = Uuid::new_v4();
        let mut client = Client::new(tenant_id, None, "Jane", "Doe", "jane@example.com").unwrap();
        client.is_active = false;
        let client_id = client.id;
        let mut clients = MockClientRepository::new();
        clients.expect_find_by_id().returning(move |_, _| Ok(Some(client.clone())));

        let result = service(MockTripRepository::new(), clients, MockInvoiceRepository::new())
            .create(&advisor(tenant_id, &["create_trips"]), new_trip(client_id))
            .await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_finalize_with_auto_invoice() {
        let tenant_id = Uuid::new_v4();
        let mut trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        trip.total_amount = Some(dec!(4200));
        let trip_id = trip.id;

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips.expect_update().never();
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_find_for_trip().returning(|_| Ok(None));
        invoices.expect_count_all().returning(|| Ok(41));
        invoices.expect_create().never();
        invoices
            .expect_create_for_trip_status()
            .withf(move |t, i| {
                t.status == TripStatus::Finalized
                    && i.invoice_number.ends_with("-0042")
                    && i.status == InvoiceStatus::Draft
                    && i.total_amount == dec!(4200)
                    && i.subtotal == dec!(4200)
                    && i.trip_id == Some(trip_id)
                    && i.due_date.is_none()
                    && i.notes.as_deref() == Some("Auto-generated invoice for Alaska Cruise")
            })
            .times(1)
            .returning(|_, i| Ok(i.clone()));

        let change = StatusChange { status: TripStatus::Finalized, auto_create_invoice: true, notify_client: false };
        let result = service(trips, MockClientRepository::new(), invoices)
            .change_status(&advisor(tenant_id, &["edit_trips", "create_invoices"]), &trip_id, change)
            .await
            .unwrap();
        assert_eq!(result.trip.status, TripStatus::Finalized);
        let invoice = result.invoice.unwrap();
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.invoice_number.len(), "INV-20250101-0042".len());
    }

    #[tokio::test]
    async fn test_finalize_without_invoice_permission_changes_nothing() {
        let tenant_id = Uuid::new_v4();
        let trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips.expect_update().never();
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_create_for_trip_status().never();

        let change = StatusChange { status: TripStatus::Finalized, auto_create_invoice: true, notify_client: false };
        let result = service(trips, MockClientRepository::new(), invoices)
            .change_status(&advisor(tenant_id, &["edit_trips"]), &trip_id, change)
            .await;
        assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_finalize_with_existing_invoice_only_saves_status() {
        let tenant_id = Uuid::new_v4();
        let trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;
        let existing = Invoice::new(trip.client_id, Invoice::trip_number(&trip_id), date(2025, 1, 1));

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips
            .expect_update()
            .withf(|t| t.status == TripStatus::Finalized)
            .times(1)
            .returning(|t| Ok(t.clone()));
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_find_for_trip().returning(move |_| Ok(Some(existing.clone())));
        invoices.expect_create_for_trip_status().never();

        let change = StatusChange { status: TripStatus::Finalized, auto_create_invoice: true, notify_client: false };
        let result = service(trips, MockClientRepository::new(), invoices)
            .change_status(&advisor(tenant_id, &["edit_trips", "create_invoices"]), &trip_id, change)
            .await
            .unwrap();
        assert!(result.invoice.is_none());
    }

    #[tokio::test]
    async fn test_push_duplicate_line_rejected() {
        let tenant_id = Uuid::new_v4();
        let trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;
        let item = trip_line(trip_id, "Glacier hike", dec!(120));
        let item_id = item.id;
        let invoice = Invoice::new(trip.client_id, Invoice::trip_number(&trip_id), date(2025, 1, 1));
        let invoice_id = invoice.id;

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips.expect_find_line_item().returning(move |_, _| Ok(Some(item.clone())));
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_find_for_trip().returning(move |_| Ok(Some(invoice.clone())));
        invoices.expect_list_lines().returning(move |_| {
            Ok(vec![InvoiceLineItem::new(invoice_id, "Shore Excursion/Tour: Glacier hike", 1, dec!(120), None).unwrap()])
        });

        let result = service(trips, MockClientRepository::new(), invoices)
            .push_line_item(&advisor(tenant_id, &["create_invoices"]), &trip_id, &item_id)
            .await;
        assert!(matches!(result, Err(DomainError::DuplicateInvoiceLine(_))));
    }

    #[tokio::test]
    async fn test_push_all_creates_invoice_and_skips_duplicates() {
        let tenant_id = Uuid::new_v4();
        let trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;
        let items = vec![
            trip_line(trip_id, "Glacier hike", dec!(120)),
            trip_line(trip_id, "Glacier hike", dec!(120)),
            trip_line(trip_id, "Whale watching", dec!(95)),
        ];

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips.expect_list_line_items().returning(move |_| Ok(items.clone()));
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_find_for_trip().returning(|_| Ok(None));
        invoices
            .expect_create()
            .withf(move |i| {
                i.invoice_number == Invoice::trip_number(&trip_id)
                    && i.notes.as_deref() == Some("Invoice for trip: Alaska Cruise")
                    && i.due_date.is_some()
            })
            .returning(|i| Ok(i.clone()));
        let mut list_calls = 0;
        invoices.expect_list_lines().returning(move |id| {
            list_calls += 1;
            if list_calls == 1 {
                return Ok(vec![]);
            }
            Ok(vec![
                InvoiceLineItem::new(*id, "Shore Excursion/Tour: Glacier hike", 1, dec!(120), None).unwrap(),
                InvoiceLineItem::new(*id, "Shore Excursion/Tour: Whale watching", 1, dec!(95), None).unwrap(),
            ])
        });
        invoices.expect_add_line().times(2).returning(|l| Ok(l.clone()));
        invoices
            .expect_update()
            .withf(|i| i.total_amount == dec!(215))
            .returning(|i| Ok(i.clone()));

        let result = service(trips, MockClientRepository::new(), invoices)
            .push_all(&advisor(tenant_id, &["create_invoices"]), &trip_id)
            .await
            .unwrap();
        assert_eq!(result.added, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.invoice.subtotal, dec!(215));
    }

    #[tokio::test]
    async fn test_duplicate_itinerary_day_rejected() {
        let tenant_id = Uuid::new_v4();
        let trip = Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;
        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        trips.expect_day_number_taken().returning(|_, day, _| Ok(day == 2));

        let input = ItineraryDayInput {
            day_number: 2,
            date: None,
            title: "Skagway".into(),
            description: "White Pass railway".into(),
            location: None,
            accommodation: None,
            activities: None,
            meals: None,
            transportation: None,
            notes: None,
        };
        let result = service(trips, MockClientRepository::new(), MockInvoiceRepository::new())
            .add_itinerary_day(&advisor(tenant_id, &["edit_trips"]), &trip_id, input)
            .await;
        assert!(matches!(result, Err(DomainError::ItineraryDayExists(2))));
    }

    #[tokio::test]
    async fn test_email_requires_client_address() {
        let tenant_id = Uuid::new_v4();
        let mut client = Client::new(tenant_id, None, "Jane", "Doe", "jane@example.com").unwrap();
        client.email = String::new();
        let trip = Trip::new(client.id, None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap();
        let trip_id = trip.id;

        let mut trips = MockTripRepository::new();
        trips.expect_find_by_id().returning(move |_, _| Ok(Some(trip.clone())));
        let mut clients = MockClientRepository::new();
        clients.expect_find_by_id().returning(move |_, _| Ok(Some(client.clone())));

        let result = service(trips, clients, MockInvoiceRepository::new())
            .send_trip_email(&advisor(tenant_id, &["edit_trips"]), &trip_id, TripEmailKind::Confirmation)
            .await;
        assert!(matches!(result, Err(DomainError::ClientHasNoEmail)));
    }
}
