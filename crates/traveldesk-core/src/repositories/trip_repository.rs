//! Trip storage: trips, line items, itinerary days and participants (port)

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{Trip, TripItinerary, TripLineItem, TripParticipant, TripStatus};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripTimeFilter {
    /// Departure on or after today.
    Upcoming,
    /// Returned before today.
    Past,
    /// Departed and not yet returned.
    Current,
}

#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub status: Option<TripStatus>,
    pub time: Option<TripTimeFilter>,
    /// Trip name, destination or client first/last name.
    pub search: Option<String>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripListRow {
    #[serde(flatten)]
    pub trip: Trip,
    pub client_name: String,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TripTotals {
    pub trip_count: i64,
    /// Sum of trip total amounts.
    pub total_amount: Decimal,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Only returns the trip when its client belongs to `tenant_id`.
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Trip>, DomainError>;
    async fn create(&self, trip: &Trip) -> Result<Trip, DomainError>;
    async fn update(&self, trip: &Trip) -> Result<Trip, DomainError>;
    /// Ordered by departure date desc, then creation desc.
    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &TripFilter,
        today: NaiveDate,
        pagination: Pagination,
    ) -> Result<Page<TripListRow>, DomainError>;
    /// Departure on or after `today`, whole tenant.
    async fn count_upcoming(&self, tenant_id: &Uuid, today: NaiveDate) -> Result<i64, DomainError>;
    async fn tenant_totals(&self, tenant_id: &Uuid) -> Result<TripTotals, DomainError>;
    async fn client_totals(&self, client_id: &Uuid) -> Result<TripTotals, DomainError>;
    /// Newest first.
    async fn recent_for_client(&self, client_id: &Uuid, limit: i64) -> Result<Vec<Trip>, DomainError>;
    /// Departing after `today`, soonest first.
    async fn upcoming_for_client(&self, client_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Trip>, DomainError>;
    /// Departing on or after `today`, soonest first.
    async fn upcoming_departures(&self, tenant_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Trip>, DomainError>;

    /// Ordered by item type, then service date.
    async fn list_line_items(&self, trip_id: &Uuid) -> Result<Vec<TripLineItem>, DomainError>;
    async fn find_line_item(&self, trip_id: &Uuid, id: &Uuid) -> Result<Option<TripLineItem>, DomainError>;
    async fn add_line_item(&self, item: &TripLineItem) -> Result<TripLineItem, DomainError>;
    async fn update_line_item(&self, item: &TripLineItem) -> Result<TripLineItem, DomainError>;
    async fn delete_line_item(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError>;

    /// Ordered by day number.
    async fn list_itinerary(&self, trip_id: &Uuid) -> Result<Vec<TripItinerary>, DomainError>;
    async fn find_itinerary_day(&self, trip_id: &Uuid, id: &Uuid) -> Result<Option<TripItinerary>, DomainError>;
    async fn day_number_taken(&self, trip_id: &Uuid, day_number: i32, exclude: Option<Uuid>) -> Result<bool, DomainError>;
    async fn add_itinerary_day(&self, day: &TripItinerary) -> Result<TripItinerary, DomainError>;
    async fn update_itinerary_day(&self, day: &TripItinerary) -> Result<TripItinerary, DomainError>;
    /// Removes the day and shifts every later day down by one, atomically.
    async fn delete_itinerary_day(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError>;

    async fn list_participants(&self, trip_id: &Uuid) -> Result<Vec<TripParticipant>, DomainError>;
    async fn add_participant(&self, participant: &TripParticipant) -> Result<TripParticipant, DomainError>;
    async fn delete_participant(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError>;
}
