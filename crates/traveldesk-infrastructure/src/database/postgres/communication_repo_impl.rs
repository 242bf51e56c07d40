//! Client communication log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use traveldesk_core::domain::{ClientCommunication, CommunicationDirection, CommunicationType};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{CommunicationCounts, CommunicationRepository};

use super::db_error;

const COMMUNICATION_COLUMNS: &str = r#"
    id, client_id, trip_id, created_by, communication_type, direction, subject, content,
    email_message_id, email_thread_id, email_delivery_status, scheduled_at, sent_at, created_at
"#;

pub struct PgCommunicationRepository {
    pool: PgPool,
}

impl PgCommunicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CommunicationRow {
    id: Uuid,
    client_id: Uuid,
    trip_id: Option<Uuid>,
    created_by: Option<Uuid>,
    communication_type: String,
    direction: String,
    subject: String,
    content: String,
    email_message_id: Option<String>,
    email_thread_id: Option<String>,
    email_delivery_status: Option<String>,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CommunicationRow> for ClientCommunication {
    fn from(row: CommunicationRow) -> Self {
        ClientCommunication {
            id: row.id,
            client_id: row.client_id,
            trip_id: row.trip_id,
            created_by: row.created_by,
            communication_type: CommunicationType::from_str(&row.communication_type).unwrap_or_default(),
            direction: CommunicationDirection::from_str(&row.direction).unwrap_or_default(),
            subject: row.subject,
            content: row.content,
            email_message_id: row.email_message_id,
            email_thread_id: row.email_thread_id,
            email_delivery_status: row.email_delivery_status,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CountsRow {
    total: i64,
    email: i64,
    phone: i64,
}

#[async_trait]
impl CommunicationRepository for PgCommunicationRepository {
    async fn create(&self, communication: &ClientCommunication) -> Result<ClientCommunication, DomainError> {
        let row: CommunicationRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO client_communications ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {cols}
            "#,
            cols = COMMUNICATION_COLUMNS
        ))
        .bind(communication.id)
        .bind(communication.client_id)
        .bind(communication.trip_id)
        .bind(communication.created_by)
        .bind(communication.communication_type.as_str())
        .bind(communication.direction.as_str())
        .bind(&communication.subject)
        .bind(&communication.content)
        .bind(&communication.email_message_id)
        .bind(&communication.email_thread_id)
        .bind(&communication.email_delivery_status)
        .bind(communication.scheduled_at)
        .bind(communication.sent_at)
        .bind(communication.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("logging client communication", e))?;

        Ok(row.into())
    }

    async fn update(&self, communication: &ClientCommunication) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE client_communications SET
                subject = $2, content = $3, email_message_id = $4, email_thread_id = $5,
                email_delivery_status = $6, scheduled_at = $7, sent_at = $8
            WHERE id = $1
            "#,
        )
        .bind(communication.id)
        .bind(&communication.subject)
        .bind(&communication.content)
        .bind(&communication.email_message_id)
        .bind(&communication.email_thread_id)
        .bind(&communication.email_delivery_status)
        .bind(communication.scheduled_at)
        .bind(communication.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("updating client communication", e))?;

        Ok(())
    }

    async fn list_for_client(&self, client_id: &Uuid, limit: Option<i64>) -> Result<Vec<ClientCommunication>, DomainError> {
        let rows: Vec<CommunicationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM client_communications WHERE client_id = $1 ORDER BY created_at DESC LIMIT $2",
            COMMUNICATION_COLUMNS
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing client communications", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn counts_for_client(&self, client_id: &Uuid) -> Result<CommunicationCounts, DomainError> {
        let row: CountsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE communication_type = 'EMAIL') AS email,
                COUNT(*) FILTER (WHERE communication_type = 'PHONE') AS phone
            FROM client_communications
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting client communications", e))?;

        Ok(CommunicationCounts { total: row.total, email: row.email, phone: row.phone })
    }
}
