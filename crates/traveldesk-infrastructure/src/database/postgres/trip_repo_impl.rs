// ============================================================================
// TravelDesk Infrastructure - PostgreSQL Trip Repository
// File: crates/traveldesk-infrastructure/src/database/postgres/trip_repo_impl.rs
// Description: Trips with their line items, itinerary days and participants.
//              Tenant scope is enforced through the owning client.
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use traveldesk_core::domain::{
    LineItemType, ParticipantRelationship, Trip, TripItinerary, TripLineItem, TripParticipant, TripStatus, TripType,
};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{TripFilter, TripListRow, TripRepository, TripTimeFilter, TripTotals};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, is_unique_violation, like_pattern};

const TRIP_COLUMNS: &str = r#"
    t.id, t.client_id, t.created_by, t.trip_name, t.trip_type, t.custom_trip_type, t.destination,
    t.departure_date, t.return_date, t.departure_location, t.budget_range_min, t.budget_range_max,
    t.estimated_cost, t.quoted_price, t.total_amount, t.status, t.number_of_travelers,
    t.description, t.special_requests, t.internal_notes, t.created_at, t.updated_at
"#;

const LINE_ITEM_COLUMNS: &str = r#"
    id, trip_id, item_type, description, supplier, quantity, unit_price, total_price,
    confirmation_number, booking_date, service_date, is_confirmed, is_paid, notes, created_at, updated_at
"#;

const ITINERARY_COLUMNS: &str = r#"
    id, trip_id, day_number, date, title, description, location, accommodation,
    activities, meals, transportation, notes, created_at
"#;

const PARTICIPANT_COLUMNS: &str = r#"
    id, trip_id, first_name, last_name, date_of_birth, email, phone,
    relationship_to_client, passport_number, passport_expiry, special_needs, created_at
"#;

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, tenant_id: Uuid, filter: &TripFilter, today: NaiveDate) {
        qb.push(" WHERE c.tenant_id = ").push_bind(tenant_id);
        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status.as_str());
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND t.client_id = ").push_bind(client_id);
        }
        match filter.time {
            Some(TripTimeFilter::Upcoming) => {
                qb.push(" AND t.departure_date >= ").push_bind(today);
            }
            Some(TripTimeFilter::Past) => {
                qb.push(" AND t.return_date < ").push_bind(today);
            }
            Some(TripTimeFilter::Current) => {
                qb.push(" AND t.departure_date <= ")
                    .push_bind(today)
                    .push(" AND t.return_date >= ")
                    .push_bind(today);
            }
            None => {}
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (t.trip_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.destination ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct TripRow {
    id: Uuid,
    client_id: Uuid,
    created_by: Option<Uuid>,
    trip_name: String,
    trip_type: String,
    custom_trip_type: Option<String>,
    destination: String,
    departure_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    departure_location: Option<String>,
    budget_range_min: Option<Decimal>,
    budget_range_max: Option<Decimal>,
    estimated_cost: Option<Decimal>,
    quoted_price: Option<Decimal>,
    total_amount: Option<Decimal>,
    status: String,
    number_of_travelers: i32,
    description: Option<String>,
    special_requests: Option<String>,
    internal_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            client_id: row.client_id,
            created_by: row.created_by,
            trip_name: row.trip_name,
            trip_type: TripType::from_str(&row.trip_type).unwrap_or_default(),
            custom_trip_type: row.custom_trip_type,
            destination: row.destination,
            departure_date: row.departure_date,
            return_date: row.return_date,
            departure_location: row.departure_location,
            budget_range_min: row.budget_range_min,
            budget_range_max: row.budget_range_max,
            estimated_cost: row.estimated_cost,
            quoted_price: row.quoted_price,
            total_amount: row.total_amount,
            status: TripStatus::from_str(&row.status).unwrap_or_default(),
            number_of_travelers: row.number_of_travelers,
            description: row.description,
            special_requests: row.special_requests,
            internal_notes: row.internal_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TripListDbRow {
    #[sqlx(flatten)]
    trip: TripRow,
    client_name: String,
    participant_count: i64,
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    trip_count: i64,
    total_amount: Decimal,
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: Uuid,
    trip_id: Uuid,
    item_type: String,
    description: String,
    supplier: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    confirmation_number: Option<String>,
    booking_date: Option<NaiveDate>,
    service_date: Option<NaiveDate>,
    is_confirmed: bool,
    is_paid: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LineItemRow> for TripLineItem {
    fn from(row: LineItemRow) -> Self {
        TripLineItem {
            id: row.id,
            trip_id: row.trip_id,
            item_type: LineItemType::from_str(&row.item_type).unwrap_or_default(),
            description: row.description,
            supplier: row.supplier,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            confirmation_number: row.confirmation_number,
            booking_date: row.booking_date,
            service_date: row.service_date,
            is_confirmed: row.is_confirmed,
            is_paid: row.is_paid,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItineraryRow {
    id: Uuid,
    trip_id: Uuid,
    day_number: i32,
    date: Option<NaiveDate>,
    title: String,
    description: String,
    location: Option<String>,
    accommodation: Option<String>,
    activities: Option<String>,
    meals: Option<String>,
    transportation: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ItineraryRow> for TripItinerary {
    fn from(row: ItineraryRow) -> Self {
        TripItinerary {
            id: row.id,
            trip_id: row.trip_id,
            day_number: row.day_number,
            date: row.date,
            title: row.title,
            description: row.description,
            location: row.location,
            accommodation: row.accommodation,
            activities: row.activities,
            meals: row.meals,
            transportation: row.transportation,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ParticipantRow {
    id: Uuid,
    trip_id: Uuid,
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    email: Option<String>,
    phone: Option<String>,
    relationship_to_client: String,
    passport_number: Option<String>,
    passport_expiry: Option<NaiveDate>,
    special_needs: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ParticipantRow> for TripParticipant {
    fn from(row: ParticipantRow) -> Self {
        TripParticipant {
            id: row.id,
            trip_id: row.trip_id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            email: row.email,
            phone: row.phone,
            relationship_to_client: ParticipantRelationship::from_str(&row.relationship_to_client)
                .unwrap_or_default(),
            passport_number: row.passport_number,
            passport_expiry: row.passport_expiry,
            special_needs: row.special_needs,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Trip>, DomainError> {
        let row: Option<TripRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM trips t
            JOIN clients c ON c.id = t.client_id
            WHERE t.id = $1 AND c.tenant_id = $2
            "#,
            TRIP_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error finding trip by id: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, trip: &Trip) -> Result<Trip, DomainError> {
        let row: TripRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO trips AS t (
                id, client_id, created_by, trip_name, trip_type, custom_trip_type, destination,
                departure_date, return_date, departure_location, budget_range_min, budget_range_max,
                estimated_cost, quoted_price, total_amount, status, number_of_travelers,
                description, special_requests, internal_notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {}
            "#,
            TRIP_COLUMNS
        ))
        .bind(trip.id)
        .bind(trip.client_id)
        .bind(trip.created_by)
        .bind(&trip.trip_name)
        .bind(trip.trip_type.as_str())
        .bind(&trip.custom_trip_type)
        .bind(&trip.destination)
        .bind(trip.departure_date)
        .bind(trip.return_date)
        .bind(&trip.departure_location)
        .bind(trip.budget_range_min)
        .bind(trip.budget_range_max)
        .bind(trip.estimated_cost)
        .bind(trip.quoted_price)
        .bind(trip.total_amount)
        .bind(trip.status.as_str())
        .bind(trip.number_of_travelers)
        .bind(&trip.description)
        .bind(&trip.special_requests)
        .bind(&trip.internal_notes)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("creating trip", e))?;

        info!("Trip created: {} ({})", row.trip_name, row.id);
        Ok(row.into())
    }

    async fn update(&self, trip: &Trip) -> Result<Trip, DomainError> {
        let row: Option<TripRow> = sqlx::query_as(&format!(
            r#"
            UPDATE trips AS t SET
                trip_name = $2, trip_type = $3, custom_trip_type = $4, destination = $5,
                departure_date = $6, return_date = $7, departure_location = $8,
                budget_range_min = $9, budget_range_max = $10, estimated_cost = $11,
                quoted_price = $12, total_amount = $13, status = $14, number_of_travelers = $15,
                description = $16, special_requests = $17, internal_notes = $18, updated_at = NOW()
            WHERE t.id = $1
            RETURNING {}
            "#,
            TRIP_COLUMNS
        ))
        .bind(trip.id)
        .bind(&trip.trip_name)
        .bind(trip.trip_type.as_str())
        .bind(&trip.custom_trip_type)
        .bind(&trip.destination)
        .bind(trip.departure_date)
        .bind(trip.return_date)
        .bind(&trip.departure_location)
        .bind(trip.budget_range_min)
        .bind(trip.budget_range_max)
        .bind(trip.estimated_cost)
        .bind(trip.quoted_price)
        .bind(trip.total_amount)
        .bind(trip.status.as_str())
        .bind(trip.number_of_travelers)
        .bind(&trip.description)
        .bind(&trip.special_requests)
        .bind(&trip.internal_notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating trip", e))?;

        row.map(|r| r.into()).ok_or(DomainError::TripNotFound)
    }

    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &TripFilter,
        today: NaiveDate,
        pagination: Pagination,
    ) -> Result<Page<TripListRow>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM trips t JOIN clients c ON c.id = t.client_id");
        Self::push_filters(&mut count_qb, *tenant_id, filter, today);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting trips", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"
            SELECT {},
                TRIM(c.first_name || ' ' || c.last_name) AS client_name,
                (SELECT COUNT(*) FROM trip_participants p WHERE p.trip_id = t.id) AS participant_count
            FROM trips t
            JOIN clients c ON c.id = t.client_id
            "#,
            TRIP_COLUMNS
        ));
        Self::push_filters(&mut qb, *tenant_id, filter, today);
        qb.push(" ORDER BY t.departure_date DESC NULLS LAST, t.created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<TripListDbRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing trips", e))?;

        let items = rows
            .into_iter()
            .map(|r| TripListRow {
                trip: r.trip.into(),
                client_name: r.client_name,
                participant_count: r.participant_count,
            })
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    async fn count_upcoming(&self, tenant_id: &Uuid, today: NaiveDate) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM trips t
            JOIN clients c ON c.id = t.client_id
            WHERE c.tenant_id = $1 AND t.departure_date >= $2
            "#,
        )
        .bind(tenant_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting upcoming trips", e))
    }

    async fn tenant_totals(&self, tenant_id: &Uuid) -> Result<TripTotals, DomainError> {
        let row: TotalsRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS trip_count, COALESCE(SUM(t.total_amount), 0) AS total_amount
            FROM trips t
            JOIN clients c ON c.id = t.client_id
            WHERE c.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("summing tenant trips", e))?;

        Ok(TripTotals { trip_count: row.trip_count, total_amount: row.total_amount })
    }

    async fn client_totals(&self, client_id: &Uuid) -> Result<TripTotals, DomainError> {
        let row: TotalsRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS trip_count, COALESCE(SUM(total_amount), 0) AS total_amount
            FROM trips
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("summing client trips", e))?;

        Ok(TripTotals { trip_count: row.trip_count, total_amount: row.total_amount })
    }

    async fn recent_for_client(&self, client_id: &Uuid, limit: i64) -> Result<Vec<Trip>, DomainError> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trips t WHERE t.client_id = $1 ORDER BY t.created_at DESC LIMIT $2",
            TRIP_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing recent client trips", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upcoming_for_client(&self, client_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Trip>, DomainError> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM trips t
            WHERE t.client_id = $1 AND t.departure_date > $2
            ORDER BY t.departure_date ASC
            LIMIT $3
            "#,
            TRIP_COLUMNS
        ))
        .bind(client_id)
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing upcoming client trips", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upcoming_departures(&self, tenant_id: &Uuid, today: NaiveDate, limit: i64) -> Result<Vec<Trip>, DomainError> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM trips t
            JOIN clients c ON c.id = t.client_id
            WHERE c.tenant_id = $1 AND t.departure_date >= $2
            ORDER BY t.departure_date ASC
            LIMIT $3
            "#,
            TRIP_COLUMNS
        ))
        .bind(tenant_id)
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing upcoming departures", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    // ------------------------------------------------------------------
    // Line items
    // ------------------------------------------------------------------

    async fn list_line_items(&self, trip_id: &Uuid) -> Result<Vec<TripLineItem>, DomainError> {
        let rows: Vec<LineItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trip_line_items WHERE trip_id = $1 ORDER BY item_type, service_date NULLS LAST",
            LINE_ITEM_COLUMNS
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing line items", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_line_item(&self, trip_id: &Uuid, id: &Uuid) -> Result<Option<TripLineItem>, DomainError> {
        let row: Option<LineItemRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trip_line_items WHERE trip_id = $1 AND id = $2",
            LINE_ITEM_COLUMNS
        ))
        .bind(trip_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding line item", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn add_line_item(&self, item: &TripLineItem) -> Result<TripLineItem, DomainError> {
        let row: LineItemRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO trip_line_items ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {cols}
            "#,
            cols = LINE_ITEM_COLUMNS
        ))
        .bind(item.id)
        .bind(item.trip_id)
        .bind(item.item_type.as_str())
        .bind(&item.description)
        .bind(&item.supplier)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(&item.confirmation_number)
        .bind(item.booking_date)
        .bind(item.service_date)
        .bind(item.is_confirmed)
        .bind(item.is_paid)
        .bind(&item.notes)
        .bind(item.created_at)
        .bind(item.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("adding line item", e))?;

        Ok(row.into())
    }

    async fn update_line_item(&self, item: &TripLineItem) -> Result<TripLineItem, DomainError> {
        let row: Option<LineItemRow> = sqlx::query_as(&format!(
            r#"
            UPDATE trip_line_items SET
                item_type = $3, description = $4, supplier = $5, quantity = $6, unit_price = $7,
                total_price = $8, confirmation_number = $9, booking_date = $10, service_date = $11,
                is_confirmed = $12, is_paid = $13, notes = $14, updated_at = NOW()
            WHERE id = $1 AND trip_id = $2
            RETURNING {}
            "#,
            LINE_ITEM_COLUMNS
        ))
        .bind(item.id)
        .bind(item.trip_id)
        .bind(item.item_type.as_str())
        .bind(&item.description)
        .bind(&item.supplier)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total_price)
        .bind(&item.confirmation_number)
        .bind(item.booking_date)
        .bind(item.service_date)
        .bind(item.is_confirmed)
        .bind(item.is_paid)
        .bind(&item.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating line item", e))?;

        row.map(|r| r.into()).ok_or(DomainError::LineItemNotFound)
    }

    async fn delete_line_item(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM trip_line_items WHERE trip_id = $1 AND id = $2")
            .bind(trip_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting line item", e))?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Itinerary
    // ------------------------------------------------------------------

    async fn list_itinerary(&self, trip_id: &Uuid) -> Result<Vec<TripItinerary>, DomainError> {
        let rows: Vec<ItineraryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trip_itineraries WHERE trip_id = $1 ORDER BY day_number",
            ITINERARY_COLUMNS
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing itinerary", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_itinerary_day(&self, trip_id: &Uuid, id: &Uuid) -> Result<Option<TripItinerary>, DomainError> {
        let row: Option<ItineraryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trip_itineraries WHERE trip_id = $1 AND id = $2",
            ITINERARY_COLUMNS
        ))
        .bind(trip_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding itinerary day", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn day_number_taken(&self, trip_id: &Uuid, day_number: i32, exclude: Option<Uuid>) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM trip_itineraries
                WHERE trip_id = $1 AND day_number = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(trip_id)
        .bind(day_number)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking itinerary day number", e))
    }

    async fn add_itinerary_day(&self, day: &TripItinerary) -> Result<TripItinerary, DomainError> {
        let row: ItineraryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO trip_itineraries ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {cols}
            "#,
            cols = ITINERARY_COLUMNS
        ))
        .bind(day.id)
        .bind(day.trip_id)
        .bind(day.day_number)
        .bind(day.date)
        .bind(&day.title)
        .bind(&day.description)
        .bind(&day.location)
        .bind(&day.accommodation)
        .bind(&day.activities)
        .bind(&day.meals)
        .bind(&day.transportation)
        .bind(&day.notes)
        .bind(day.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::ItineraryDayExists(day.day_number)
            } else {
                error!("Database error adding itinerary day: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        Ok(row.into())
    }

    async fn update_itinerary_day(&self, day: &TripItinerary) -> Result<TripItinerary, DomainError> {
        let row: Option<ItineraryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE trip_itineraries SET
                day_number = $3, date = $4, title = $5, description = $6, location = $7,
                accommodation = $8, activities = $9, meals = $10, transportation = $11, notes = $12
            WHERE id = $1 AND trip_id = $2
            RETURNING {}
            "#,
            ITINERARY_COLUMNS
        ))
        .bind(day.id)
        .bind(day.trip_id)
        .bind(day.day_number)
        .bind(day.date)
        .bind(&day.title)
        .bind(&day.description)
        .bind(&day.location)
        .bind(&day.accommodation)
        .bind(&day.activities)
        .bind(&day.meals)
        .bind(&day.transportation)
        .bind(&day.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::ItineraryDayExists(day.day_number)
            } else {
                error!("Database error updating itinerary day: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        row.map(|r| r.into()).ok_or(DomainError::ItineraryDayNotFound)
    }

    async fn delete_itinerary_day(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let removed: Option<i32> = sqlx::query_scalar(
            "DELETE FROM trip_itineraries WHERE trip_id = $1 AND id = $2 RETURNING day_number",
        )
        .bind(trip_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("deleting itinerary day", e))?;

        let Some(day_number) = removed else {
            return Ok(false);
        };

        // The unique (trip_id, day_number) constraint is deferred until commit
        sqlx::query("UPDATE trip_itineraries SET day_number = day_number - 1 WHERE trip_id = $1 AND day_number > $2")
            .bind(trip_id)
            .bind(day_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("renumbering itinerary days", e))?;

        tx.commit().await.map_err(|e| db_error("committing itinerary renumbering", e))?;
        info!("Removed itinerary day {} from trip {}", day_number, trip_id);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    async fn list_participants(&self, trip_id: &Uuid) -> Result<Vec<TripParticipant>, DomainError> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trip_participants WHERE trip_id = $1 ORDER BY created_at",
            PARTICIPANT_COLUMNS
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing participants", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_participant(&self, participant: &TripParticipant) -> Result<TripParticipant, DomainError> {
        let row: ParticipantRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO trip_participants ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {cols}
            "#,
            cols = PARTICIPANT_COLUMNS
        ))
        .bind(participant.id)
        .bind(participant.trip_id)
        .bind(&participant.first_name)
        .bind(&participant.last_name)
        .bind(participant.date_of_birth)
        .bind(&participant.email)
        .bind(&participant.phone)
        .bind(participant.relationship_to_client.as_str())
        .bind(&participant.passport_number)
        .bind(participant.passport_expiry)
        .bind(&participant.special_needs)
        .bind(participant.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("adding participant", e))?;

        Ok(row.into())
    }

    async fn delete_participant(&self, trip_id: &Uuid, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM trip_participants WHERE trip_id = $1 AND id = $2")
            .bind(trip_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting participant", e))?;

        Ok(result.rows_affected() > 0)
    }
}
