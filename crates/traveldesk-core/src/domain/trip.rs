// ============================================================================
// TravelDesk Core - Trip Entities
// File: crates/traveldesk-core/src/domain/trip.rs
// Description: Trips, their priced line items, day-by-day itinerary and travelers
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::money::format_usd;

text_enum! {
    pub enum TripStatus {
        Planning => ("PLANNING", "Planning"),
        SentToClient => ("SENT_TO_CLIENT", "Sent to Client"),
        WorkingOnIt => ("WORKING_ON_IT", "Working on It"),
        Finalized => ("FINALIZED", "Finalized"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
    default = Planning;
}

text_enum! {
    pub enum TripType {
        Cruise => ("CRUISE", "Cruise"),
        Tour => ("TOUR", "Tour"),
        AllInclusive => ("ALL_INCLUSIVE", "All Inclusive"),
        CondoRental => ("CONDO_RENTAL", "Condo Rental"),
        Hotel => ("HOTEL", "Hotel"),
        Adventure => ("ADVENTURE", "Adventure"),
        Business => ("BUSINESS", "Business Travel"),
        Honeymoon => ("HONEYMOON", "Honeymoon"),
        Family => ("FAMILY", "Family Vacation"),
        Group => ("GROUP", "Group Travel"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Trip {
    pub id: Uuid,
    pub client_id: Uuid,
    pub created_by: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Trip name is required"))]
    pub trip_name: String,
    pub trip_type: TripType,
    pub custom_trip_type: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Destination is required"))]
    pub destination: String,

    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub departure_location: Option<String>,

    pub budget_range_min: Option<Decimal>,
    pub budget_range_max: Option<Decimal>,
    pub estimated_cost: Option<Decimal>,
    pub quoted_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,

    pub status: TripStatus,
    #[validate(range(min = 1, message = "At least one traveler is required"))]
    pub number_of_travelers: i32,

    pub description: Option<String>,
    pub special_requests: Option<String>,
    pub internal_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        client_id: Uuid,
        created_by: Option<Uuid>,
        trip_name: &str,
        trip_type: TripType,
        destination: &str,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let trip = Self {
            id: Uuid::new_v4(),
            client_id,
            created_by,
            trip_name: trip_name.trim().to_string(),
            trip_type,
            custom_trip_type: None,
            destination: destination.trim().to_string(),
            departure_date: None,
            return_date: None,
            departure_location: None,
            budget_range_min: None,
            budget_range_max: None,
            estimated_cost: None,
            quoted_price: None,
            total_amount: None,
            status: TripStatus::default(),
            number_of_travelers: 1,
            description: None,
            special_requests: None,
            internal_notes: None,
            created_at: now,
            updated_at: now,
        };
        trip.validate()?;
        Ok(trip)
    }

    /// Keeps the custom label only for OTHER trips.
    pub fn set_trip_type(&mut self, trip_type: TripType, custom: Option<String>) {
        self.trip_type = trip_type;
        self.custom_trip_type = match trip_type {
            TripType::Other => custom.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            _ => None,
        };
    }

    pub fn trip_type_display(&self) -> String {
        match (&self.trip_type, &self.custom_trip_type) {
            (TripType::Other, Some(custom)) => custom.clone(),
            (t, _) => t.label().to_string(),
        }
    }

    pub fn duration_days(&self) -> Option<i64> {
        match (self.departure_date, self.return_date) {
            (Some(dep), Some(ret)) => Some((ret - dep).num_days()),
            _ => None,
        }
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.departure_date.map(|d| d > today).unwrap_or(false)
    }

    pub fn days_until_departure(&self, today: NaiveDate) -> Option<i64> {
        self.departure_date.map(|d| (d - today).num_days())
    }

    pub fn dates_are_consistent(&self) -> bool {
        match (self.departure_date, self.return_date) {
            (Some(dep), Some(ret)) => ret >= dep,
            _ => true,
        }
    }

    pub fn budget_range_display(&self) -> Option<String> {
        let min = self.budget_range_min.filter(|v| !v.is_zero());
        let max = self.budget_range_max.filter(|v| !v.is_zero());
        match (min, max) {
            (Some(lo), Some(hi)) if lo == hi => Some(format_usd(lo)),
            (Some(lo), Some(hi)) => Some(format!("{} - {}", format_usd(lo), format_usd(hi))),
            (Some(lo), None) => Some(format!("{}+", format_usd(lo))),
            (None, Some(hi)) => Some(format!("Up to {}", format_usd(hi))),
            (None, None) => None,
        }
    }
}

text_enum! {
    pub enum LineItemType {
        Cruise => ("CRUISE", "Cruise"),
        Airfare => ("AIRFARE", "Airfare"),
        Hotel => ("HOTEL", "Hotel/Accommodation"),
        Transfer => ("TRANSFER", "Transfer/Transportation"),
        Excursion => ("EXCURSION", "Shore Excursion/Tour"),
        Insurance => ("INSURANCE", "Travel Insurance"),
        Visa => ("VISA", "Visa/Documentation"),
        RentalCar => ("RENTAL_CAR", "Rental Car"),
        Dining => ("DINING", "Dining/Meals"),
        Activities => ("ACTIVITIES", "Activities/Entertainment"),
        Fees => ("FEES", "Fees/Taxes"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TripLineItem {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub item_type: LineItemType,
    #[validate(length(min = 1, max = 300, message = "Description is required"))]
    pub description: String,
    pub supplier: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub confirmation_number: Option<String>,
    pub booking_date: Option<NaiveDate>,
    pub service_date: Option<NaiveDate>,
    pub is_confirmed: bool,
    pub is_paid: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripLineItem {
    pub fn new(
        trip_id: Uuid,
        item_type: LineItemType,
        description: &str,
        quantity: i32,
        unit_price: Decimal,
        total_price: Option<Decimal>,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let mut item = Self {
            id: Uuid::new_v4(),
            trip_id,
            item_type,
            description: description.trim().to_string(),
            supplier: None,
            quantity,
            unit_price,
            total_price: Decimal::ZERO,
            confirmation_number: None,
            booking_date: None,
            service_date: None,
            is_confirmed: false,
            is_paid: false,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        item.validate()?;
        item.set_total(total_price);
        Ok(item)
    }

    /// An absent or zero total falls back to quantity × unit price.
    pub fn set_total(&mut self, total_price: Option<Decimal>) {
        self.total_price = match total_price {
            Some(t) if !t.is_zero() => t,
            _ => Decimal::from(self.quantity) * self.unit_price,
        };
    }

    /// Description used when the item is copied onto an invoice.
    pub fn invoice_description(&self) -> String {
        format!("{}: {}", self.item_type.label(), self.description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TripItinerary {
    pub id: Uuid,
    pub trip_id: Uuid,
    #[validate(range(min = 1, message = "Day number must be at least 1"))]
    pub day_number: i32,
    pub date: Option<NaiveDate>,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub accommodation: Option<String>,
    pub activities: Option<String>,
    pub meals: Option<String>,
    pub transportation: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TripItinerary {
    pub fn new(trip_id: Uuid, day_number: i32, title: &str, description: &str) -> Result<Self, validator::ValidationErrors> {
        let day = Self {
            id: Uuid::new_v4(),
            trip_id,
            day_number,
            date: None,
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            location: None,
            accommodation: None,
            activities: None,
            meals: None,
            transportation: None,
            notes: None,
            created_at: Utc::now(),
        };
        day.validate()?;
        Ok(day)
    }
}

text_enum! {
    pub enum ParticipantRelationship {
        Primary => ("PRIMARY", "Primary Traveler"),
        Spouse => ("SPOUSE", "Spouse"),
        Child => ("CHILD", "Child"),
        Family => ("FAMILY", "Family Member"),
        Friend => ("FRIEND", "Friend"),
        Colleague => ("COLLEAGUE", "Colleague"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TripParticipant {
    pub id: Uuid,
    pub trip_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub relationship_to_client: ParticipantRelationship,
    pub passport_number: Option<String>,
    pub passport_expiry: Option<NaiveDate>,
    pub special_needs: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TripParticipant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Passport expiring before the trip returns (or departs, for one-way trips).
    pub fn passport_expires_before(&self, trip: &Trip) -> bool {
        let travel_end = trip.return_date.or(trip.departure_date);
        match (self.passport_expiry, travel_end) {
            (Some(expiry), Some(end)) => expiry < end,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trip() -> Trip {
        Trip::new(Uuid::new_v4(), None, "Alaska Cruise", TripType::Cruise, "Juneau").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_trip_defaults() {
        let t = trip();
        assert_eq!(t.status, TripStatus::Planning);
        assert_eq!(t.number_of_travelers, 1);
        assert_eq!(t.duration_days(), None);
    }

    #[test]
    fn test_duration_and_upcoming() {
        let mut t = trip();
        t.departure_date = Some(date(2025, 6, 1));
        t.return_date = Some(date(2025, 6, 8));
        assert_eq!(t.duration_days(), Some(7));
        assert!(t.is_upcoming(date(2025, 5, 31)));
        assert!(!t.is_upcoming(date(2025, 6, 1)));
        assert_eq!(t.days_until_departure(date(2025, 5, 2)), Some(30));
        assert!(t.dates_are_consistent());
        t.return_date = Some(date(2025, 5, 30));
        assert!(!t.dates_are_consistent());
    }

    #[test]
    fn test_budget_range_display() {
        let mut t = trip();
        assert_eq!(t.budget_range_display(), None);
        t.budget_range_min = Some(dec!(5000));
        assert_eq!(t.budget_range_display().as_deref(), Some("$5,000+"));
        t.budget_range_max = Some(dec!(5000));
        assert_eq!(t.budget_range_display().as_deref(), Some("$5,000"));
        t.budget_range_max = Some(dec!(12500));
        assert_eq!(t.budget_range_display().as_deref(), Some("$5,000 - $12,500"));
        t.budget_range_min = None;
        assert_eq!(t.budget_range_display().as_deref(), Some("Up to $12,500"));
    }

    #[test]
    fn test_custom_trip_type_only_for_other() {
        let mut t = trip();
        t.set_trip_type(TripType::Cruise, Some("River barge".into()));
        assert_eq!(t.custom_trip_type, None);
        t.set_trip_type(TripType::Other, Some(" River barge ".into()));
        assert_eq!(t.trip_type_display(), "River barge");
    }

    #[test]
    fn test_line_item_total_defaults_to_quantity_times_price() {
        let item = TripLineItem::new(Uuid::new_v4(), LineItemType::Excursion, "Glacier hike", 3, dec!(120.50), None)
            .unwrap();
        assert_eq!(item.total_price, dec!(361.50));
        assert_eq!(item.invoice_description(), "Shore Excursion/Tour: Glacier hike");

        let explicit = TripLineItem::new(Uuid::new_v4(), LineItemType::Fees, "Port fees", 2, dec!(50), Some(dec!(90)))
            .unwrap();
        assert_eq!(explicit.total_price, dec!(90));
    }

    #[test]
    fn test_line_item_requires_quantity() {
        assert!(TripLineItem::new(Uuid::new_v4(), LineItemType::Other, "x", 0, dec!(1), None).is_err());
    }

    #[test]
    fn test_passport_expiry_check() {
        let mut t = trip();
        t.departure_date = Some(date(2025, 6, 1));
        t.return_date = Some(date(2025, 6, 8));
        let participant = TripParticipant {
            id: Uuid::new_v4(),
            trip_id: t.id,
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            date_of_birth: None,
            email: None,
            phone: None,
            relationship_to_client: ParticipantRelationship::Spouse,
            passport_number: Some("X123".into()),
            passport_expiry: Some(date(2025, 6, 5)),
            special_needs: None,
            created_at: Utc::now(),
        };
        assert!(participant.passport_expires_before(&t));
    }
}
