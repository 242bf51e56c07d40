// ============================================================================
// TravelDesk Core - Client Service
// File: crates/traveldesk-core/src/services/client_service.rs
// Description: Tenant-scoped CRM clients, notes and communication history
// ============================================================================

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};
use traveldesk_shared::utils::mask_email;

use crate::domain::{
    Client, ClientCommunication, ClientNote, CommunicationDirection, CommunicationPreference,
    CommunicationType, Invoice, LeadSource, NoteType, Principal, Trip, VipStatus,
};
use crate::error::DomainError;
use crate::repositories::{
    ClientCounts, ClientFilter, ClientListRow, ClientRepository, CommunicationCounts,
    CommunicationRepository, InvoiceRepository, TripRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_communication: Option<CommunicationPreference>,
    pub travel_style: Option<String>,
    pub special_needs: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub vip_status: Option<VipStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_communication: Option<CommunicationPreference>,
    pub travel_style: Option<String>,
    pub special_needs: Option<String>,
    pub lead_source: Option<LeadSource>,
    pub vip_status: Option<VipStatus>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    #[serde(default)]
    pub note_type: NoteType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
    pub follow_up_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommunication {
    pub communication_type: CommunicationType,
    #[serde(default)]
    pub direction: CommunicationDirection,
    pub subject: String,
    pub content: String,
    pub trip_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientListResult {
    pub clients: Page<ClientListRow>,
    pub counts: ClientCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    pub client: Client,
    pub total_trips: i64,
    /// Hidden from users without financial access.
    pub total_spent: Option<Decimal>,
    pub pending_balance: Option<Decimal>,
    pub recent_trips: Vec<Trip>,
    pub recent_invoices: Vec<Invoice>,
    pub recent_communications: Vec<ClientCommunication>,
    pub recent_notes: Vec<ClientNote>,
    pub upcoming_trips: Vec<Trip>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunicationHistory {
    pub communications: Vec<ClientCommunication>,
    pub counts: CommunicationCounts,
}

pub struct ClientService {
    client_repo: Arc<dyn ClientRepository>,
    trip_repo: Arc<dyn TripRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    comm_repo: Arc<dyn CommunicationRepository>,
}

impl ClientService {
    pub fn new(
        client_repo: Arc<dyn ClientRepository>,
        trip_repo: Arc<dyn TripRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        comm_repo: Arc<dyn CommunicationRepository>,
    ) -> Self {
        Self { client_repo, trip_repo, invoice_repo, comm_repo }
    }

    /// Loads a client of the caller's tenant; other tenants' clients read as missing.
    pub async fn load(&self, principal: &Principal, id: &Uuid) -> Result<Client, DomainError> {
        let tenant_id = principal.require_tenant()?;
        self.client_repo
            .find_by_id(&tenant_id, id)
            .await?
            .ok_or(DomainError::ClientNotFound)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &ClientFilter,
        pagination: Pagination,
    ) -> Result<ClientListResult, DomainError> {
        principal.require("view_crm")?;
        let tenant_id = principal.require_tenant()?;
        let mut clients = self.client_repo.list(&tenant_id, filter, pagination).await?;
        if !principal.can_access_financial_data() {
            for row in &mut clients.items {
                row.total_spent = None;
            }
        }
        let counts = self.client_repo.counts(&tenant_id).await?;
        Ok(ClientListResult { clients, counts })
    }

    pub async fn detail(&self, principal: &Principal, id: &Uuid) -> Result<ClientDetail, DomainError> {
        principal.require("view_crm")?;
        let client = self.load(principal, id).await?;
        let today = Utc::now().date_naive();
        let financial = principal.can_access_financial_data();

        let totals = self.trip_repo.client_totals(&client.id).await?;
        let pending_balance = if financial {
            Some(self.invoice_repo.pending_balance_for_client(&client.id).await?)
        } else {
            None
        };
        let recent_invoices = if principal.has_permission("view_invoices") {
            self.invoice_repo.recent_for_client(&client.id, 5).await?
        } else {
            Vec::new()
        };

        Ok(ClientDetail {
            total_trips: totals.trip_count,
            total_spent: financial.then_some(totals.total_amount),
            pending_balance,
            recent_trips: self.trip_repo.recent_for_client(&client.id, 5).await?,
            recent_invoices,
            recent_communications: self.comm_repo.list_for_client(&client.id, Some(10)).await?,
            recent_notes: self.client_repo.list_notes(&client.id, Some(5)).await?,
            upcoming_trips: self.trip_repo.upcoming_for_client(&client.id, today, 3).await?,
            client,
        })
    }

    pub async fn create(&self, principal: &Principal, input: NewClient) -> Result<Client, DomainError> {
        principal.require("create_crm_contacts")?;
        let tenant_id = principal.require_tenant()?;

        let mut client = Client::new(
            tenant_id,
            Some(principal.id()),
            &input.first_name,
            &input.last_name,
            &input.email,
        )?;
        client.phone = input.phone;
        client.address = input.address;
        client.city = input.city;
        client.state = input.state;
        client.country = input.country;
        client.postal_code = input.postal_code;
        client.date_of_birth = input.date_of_birth;
        client.preferred_communication = input.preferred_communication.unwrap_or_default();
        client.travel_style = input.travel_style;
        client.special_needs = input.special_needs;
        client.lead_source = input.lead_source.unwrap_or_default();
        client.vip_status = input.vip_status.unwrap_or_default();

        let created = self.client_repo.create(&client).await?;
        info!("Client created: {} ({})", created.full_name(), mask_email(&created.email));
        Ok(created)
    }

    pub async fn update(&self, principal: &Principal, id: &Uuid, changes: ClientUpdate) -> Result<Client, DomainError> {
        principal.require("edit_crm_contacts")?;
        let mut client = self.load(principal, id).await?;

        if let Some(v) = changes.first_name {
            client.first_name = v.trim().to_string();
        }
        if let Some(v) = changes.last_name {
            client.last_name = v.trim().to_string();
        }
        if let Some(v) = changes.email {
            client.email = v.trim().to_lowercase();
        }
        if changes.phone.is_some() {
            client.phone = changes.phone;
        }
        if changes.address.is_some() {
            client.address = changes.address;
        }
        if changes.city.is_some() {
            client.city = changes.city;
        }
        if changes.state.is_some() {
            client.state = changes.state;
        }
        if changes.country.is_some() {
            client.country = changes.country;
        }
        if changes.postal_code.is_some() {
            client.postal_code = changes.postal_code;
        }
        if changes.date_of_birth.is_some() {
            client.date_of_birth = changes.date_of_birth;
        }
        if changes.travel_style.is_some() {
            client.travel_style = changes.travel_style;
        }
        if changes.special_needs.is_some() {
            client.special_needs = changes.special_needs;
        }
        if let Some(v) = changes.preferred_communication {
            client.preferred_communication = v;
        }
        if let Some(v) = changes.lead_source {
            client.lead_source = v;
        }
        if let Some(v) = changes.vip_status {
            client.vip_status = v;
        }
        if let Some(v) = changes.is_active {
            client.is_active = v;
        }
        client.updated_at = Utc::now();
        validator::Validate::validate(&client)?;

        let updated = self.client_repo.update(&client).await?;
        info!("Client updated: {}", updated.id);
        Ok(updated)
    }

    /// Clients are never hard-deleted; they are marked inactive.
    pub async fn deactivate(&self, principal: &Principal, id: &Uuid) -> Result<(), DomainError> {
        principal.require("delete_crm_contacts")?;
        let mut client = self.load(principal, id).await?;
        client.is_active = false;
        client.updated_at = Utc::now();
        self.client_repo.update(&client).await?;
        info!("Client deactivated: {}", client.id);
        Ok(())
    }

    pub async fn add_note(&self, principal: &Principal, client_id: &Uuid, input: NewNote) -> Result<ClientNote, DomainError> {
        principal.require("edit_crm_contacts")?;
        let client = self.load(principal, client_id).await?;
        let mut note = ClientNote::new(client.id, Some(principal.id()), input.note_type, &input.title, &input.content)?;
        note.is_important = input.is_important;
        note.follow_up_date = input.follow_up_date;
        self.client_repo.add_note(&note).await
    }

    pub async fn list_notes(&self, principal: &Principal, client_id: &Uuid) -> Result<Vec<ClientNote>, DomainError> {
        principal.require("view_crm")?;
        let client = self.load(principal, client_id).await?;
        self.client_repo.list_notes(&client.id, None).await
    }

    /// Records a call, meeting or other contact made outside the system.
    pub async fn log_communication(
        &self,
        principal: &Principal,
        client_id: &Uuid,
        input: NewCommunication,
    ) -> Result<ClientCommunication, DomainError> {
        principal.require("edit_crm_contacts")?;
        let mut client = self.load(principal, client_id).await?;
        if let Some(trip_id) = input.trip_id {
            let trip = self
                .trip_repo
                .find_by_id(&client.tenant_id, &trip_id)
                .await?
                .ok_or(DomainError::TripNotFound)?;
            if trip.client_id != client.id {
                return Err(DomainError::TripNotFound);
            }
        }

        let mut comm = ClientCommunication::new(
            client.id,
            input.communication_type,
            input.direction,
            &input.subject,
            &input.content,
        );
        comm.trip_id = input.trip_id;
        comm.created_by = Some(principal.id());
        comm.sent_at = Some(input.sent_at.unwrap_or_else(Utc::now));
        let saved = self.comm_repo.create(&comm).await?;

        client.last_contact_date = saved.sent_at;
        client.updated_at = Utc::now();
        self.client_repo.update(&client).await?;
        Ok(saved)
    }

    pub async fn communications(&self, principal: &Principal, client_id: &Uuid) -> Result<CommunicationHistory, DomainError> {
        principal.require("view_crm")?;
        let client = self.load(principal, client_id).await?;
        Ok(CommunicationHistory {
            communications: self.comm_repo.list_for_client(&client.id, None).await?,
            counts: self.comm_repo.counts_for_client(&client.id).await?,
        })
    }
}
