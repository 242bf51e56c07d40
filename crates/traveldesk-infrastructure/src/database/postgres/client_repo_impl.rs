// ============================================================================
// TravelDesk Infrastructure - PostgreSQL Client Repository
// File: crates/traveldesk-infrastructure/src/database/postgres/client_repo_impl.rs
// Description: CRM clients and their notes, always scoped by tenant
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use traveldesk_core::domain::{Client, ClientNote, CommunicationPreference, LeadSource, NoteType, VipStatus};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{ClientCounts, ClientFilter, ClientListRow, ClientRepository};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, like_pattern};

const CLIENT_COLUMNS: &str = r#"
    c.id, c.tenant_id, c.created_by, c.first_name, c.last_name, c.email, c.phone,
    c.address, c.city, c.state, c.country, c.postal_code, c.date_of_birth,
    c.preferred_communication, c.travel_style, c.special_needs, c.lead_source,
    c.is_active, c.vip_status, c.last_contact_date, c.created_at, c.updated_at
"#;

const NOTE_COLUMNS: &str =
    "id, client_id, created_by, note_type, title, content, is_important, follow_up_date, created_at, updated_at";

pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, tenant_id: Uuid, filter: &ClientFilter) {
        qb.push(" WHERE c.tenant_id = ").push_bind(tenant_id);
        if let Some(vip) = filter.vip_status {
            qb.push(" AND c.vip_status = ").push_bind(vip.as_str());
        }
        if let Some(source) = filter.lead_source {
            qb.push(" AND c.lead_source = ").push_bind(source.as_str());
        }
        if let Some(active) = filter.is_active {
            qb.push(" AND c.is_active = ").push_bind(active);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (c.first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    tenant_id: Uuid,
    created_by: Option<Uuid>,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postal_code: Option<String>,
    date_of_birth: Option<NaiveDate>,
    preferred_communication: String,
    travel_style: Option<String>,
    special_needs: Option<String>,
    lead_source: String,
    is_active: bool,
    vip_status: String,
    last_contact_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            tenant_id: row.tenant_id,
            created_by: row.created_by,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            country: row.country,
            postal_code: row.postal_code,
            date_of_birth: row.date_of_birth,
            preferred_communication: CommunicationPreference::from_str(&row.preferred_communication)
                .unwrap_or_default(),
            travel_style: row.travel_style,
            special_needs: row.special_needs,
            lead_source: LeadSource::from_str(&row.lead_source).unwrap_or_default(),
            is_active: row.is_active,
            vip_status: VipStatus::from_str(&row.vip_status).unwrap_or_default(),
            last_contact_date: row.last_contact_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ClientListDbRow {
    #[sqlx(flatten)]
    client: ClientRow,
    trip_count: i64,
    total_spent: Decimal,
}

#[derive(Debug, FromRow)]
struct NoteRow {
    id: Uuid,
    client_id: Uuid,
    created_by: Option<Uuid>,
    note_type: String,
    title: String,
    content: String,
    is_important: bool,
    follow_up_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NoteRow> for ClientNote {
    fn from(row: NoteRow) -> Self {
        ClientNote {
            id: row.id,
            client_id: row.client_id,
            created_by: row.created_by,
            note_type: NoteType::from_str(&row.note_type).unwrap_or_default(),
            title: row.title,
            content: row.content,
            is_important: row.is_important,
            follow_up_date: row.follow_up_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CountsRow {
    total: i64,
    active: i64,
    vip: i64,
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_by_id(&self, tenant_id: &Uuid, id: &Uuid) -> Result<Option<Client>, DomainError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients c WHERE c.id = $1 AND c.tenant_id = $2",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding client by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Client>, DomainError> {
        let rows: Vec<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients c WHERE LOWER(c.email) = LOWER($1) AND c.email <> ''",
            CLIENT_COLUMNS
        ))
        .bind(email.trim())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding clients by email", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, client: &Client) -> Result<Client, DomainError> {
        let row: ClientRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO clients AS c (
                id, tenant_id, created_by, first_name, last_name, email, phone,
                address, city, state, country, postal_code, date_of_birth,
                preferred_communication, travel_style, special_needs, lead_source,
                is_active, vip_status, last_contact_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(client.id)
        .bind(client.tenant_id)
        .bind(client.created_by)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.state)
        .bind(&client.country)
        .bind(&client.postal_code)
        .bind(client.date_of_birth)
        .bind(client.preferred_communication.as_str())
        .bind(&client.travel_style)
        .bind(&client.special_needs)
        .bind(client.lead_source.as_str())
        .bind(client.is_active)
        .bind(client.vip_status.as_str())
        .bind(client.last_contact_date)
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("creating client", e))?;

        info!("Client created: {} ({})", row.id, row.tenant_id);
        Ok(row.into())
    }

    async fn update(&self, client: &Client) -> Result<Client, DomainError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            r#"
            UPDATE clients AS c SET
                first_name = $3, last_name = $4, email = $5, phone = $6, address = $7,
                city = $8, state = $9, country = $10, postal_code = $11, date_of_birth = $12,
                preferred_communication = $13, travel_style = $14, special_needs = $15,
                lead_source = $16, is_active = $17, vip_status = $18, last_contact_date = $19,
                updated_at = NOW()
            WHERE c.id = $1 AND c.tenant_id = $2
            RETURNING {}
            "#,
            CLIENT_COLUMNS
        ))
        .bind(client.id)
        .bind(client.tenant_id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.city)
        .bind(&client.state)
        .bind(&client.country)
        .bind(&client.postal_code)
        .bind(client.date_of_birth)
        .bind(client.preferred_communication.as_str())
        .bind(&client.travel_style)
        .bind(&client.special_needs)
        .bind(client.lead_source.as_str())
        .bind(client.is_active)
        .bind(client.vip_status.as_str())
        .bind(client.last_contact_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating client", e))?;

        row.map(|r| r.into()).ok_or(DomainError::ClientNotFound)
    }

    async fn list(
        &self,
        tenant_id: &Uuid,
        filter: &ClientFilter,
        pagination: Pagination,
    ) -> Result<Page<ClientListRow>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM clients c");
        Self::push_filters(&mut count_qb, *tenant_id, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting clients", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM trips t WHERE t.client_id = c.id) AS trip_count,
                (SELECT COALESCE(SUM(t.total_amount), 0) FROM trips t WHERE t.client_id = c.id) AS total_spent
            FROM clients c
            "#,
            CLIENT_COLUMNS
        ));
        Self::push_filters(&mut qb, *tenant_id, filter);
        qb.push(" ORDER BY c.created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<ClientListDbRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing clients", e))?;

        let items = rows
            .into_iter()
            .map(|r| ClientListRow {
                client: r.client.into(),
                trip_count: r.trip_count,
                total_spent: Some(r.total_spent),
            })
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    async fn counts(&self, tenant_id: &Uuid) -> Result<ClientCounts, DomainError> {
        let row: CountsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_active) AS active,
                COUNT(*) FILTER (WHERE vip_status IN ('VIP', 'PREMIUM')) AS vip
            FROM clients
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting clients", e))?;

        Ok(ClientCounts { total: row.total, active: row.active, vip: row.vip })
    }

    async fn recent(&self, tenant_id: &Uuid, limit: i64) -> Result<Vec<Client>, DomainError> {
        let rows: Vec<ClientRow> = sqlx::query_as(&format!(
            "SELECT {} FROM clients c WHERE c.tenant_id = $1 ORDER BY c.created_at DESC LIMIT $2",
            CLIENT_COLUMNS
        ))
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing recent clients", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn add_note(&self, note: &ClientNote) -> Result<ClientNote, DomainError> {
        let row: NoteRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO client_notes ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {cols}
            "#,
            cols = NOTE_COLUMNS
        ))
        .bind(note.id)
        .bind(note.client_id)
        .bind(note.created_by)
        .bind(note.note_type.as_str())
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.is_important)
        .bind(note.follow_up_date)
        .bind(note.created_at)
        .bind(note.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("adding client note", e))?;

        Ok(row.into())
    }

    async fn list_notes(&self, client_id: &Uuid, limit: Option<i64>) -> Result<Vec<ClientNote>, DomainError> {
        // LIMIT NULL returns every row
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {} FROM client_notes WHERE client_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTE_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing client notes", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
