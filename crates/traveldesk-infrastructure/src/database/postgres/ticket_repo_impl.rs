//! Support tickets and their comment threads

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use traveldesk_core::domain::{SupportTicket, TicketCategory, TicketComment, TicketPriority, TicketStatus};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{AssignedFilter, TicketFilter, TicketListRow, TicketRepository, TicketStats};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, is_unique_violation, like_pattern};

const TICKET_COLUMNS: &str = r#"
    s.id, s.ticket_number, s.tenant_id, s.created_by, s.created_for, s.assigned_to, s.subject,
    s.description, s.priority, s.status, s.category, s.resolution, s.resolved_at, s.closed_at,
    s.first_response_at, s.due_date, s.created_at, s.updated_at
"#;

pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
        qb.push(" WHERE 1=1");
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND s.tenant_id = ").push_bind(tenant_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND s.priority = ").push_bind(priority.as_str());
        }
        match filter.assigned {
            Some(AssignedFilter::To(staff_id)) => {
                qb.push(" AND s.assigned_to = ").push_bind(staff_id);
            }
            Some(AssignedFilter::Unassigned) => {
                qb.push(" AND s.assigned_to IS NULL");
            }
            None => {}
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (s.ticket_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR s.subject ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    ticket_number: String,
    tenant_id: Uuid,
    created_by: Uuid,
    created_for: Option<Uuid>,
    assigned_to: Option<Uuid>,
    subject: String,
    description: String,
    priority: String,
    status: String,
    category: String,
    resolution: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    first_response_at: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TicketRow> for SupportTicket {
    fn from(row: TicketRow) -> Self {
        SupportTicket {
            id: row.id,
            ticket_number: row.ticket_number,
            tenant_id: row.tenant_id,
            created_by: row.created_by,
            created_for: row.created_for,
            assigned_to: row.assigned_to,
            subject: row.subject,
            description: row.description,
            priority: TicketPriority::from_str(&row.priority).unwrap_or_default(),
            status: TicketStatus::from_str(&row.status).unwrap_or_default(),
            category: TicketCategory::from_str(&row.category).unwrap_or_default(),
            resolution: row.resolution,
            resolved_at: row.resolved_at,
            closed_at: row.closed_at,
            first_response_at: row.first_response_at,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TicketListDbRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    tenant_name: String,
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    ticket_id: Uuid,
    author_id: Uuid,
    content: String,
    is_internal: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for TicketComment {
    fn from(row: CommentRow) -> Self {
        TicketComment {
            id: row.id,
            ticket_id: row.ticket_id,
            author_id: row.author_id,
            content: row.content,
            is_internal: row.is_internal,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StatsRow {
    open: i64,
    pending: i64,
    assigned_to_me: i64,
    unassigned: i64,
    high_priority: i64,
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SupportTicket>, DomainError> {
        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {} FROM support_tickets s WHERE s.id = $1", TICKET_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding ticket by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn number_exists(&self, ticket_number: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM support_tickets WHERE ticket_number = $1)")
            .bind(ticket_number)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("checking ticket number", e))
    }

    async fn create(&self, ticket: &SupportTicket) -> Result<SupportTicket, DomainError> {
        let row: TicketRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO support_tickets AS s (
                id, ticket_number, tenant_id, created_by, created_for, assigned_to, subject,
                description, priority, status, category, resolution, resolved_at, closed_at,
                first_response_at, due_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(&ticket.ticket_number)
        .bind(ticket.tenant_id)
        .bind(ticket.created_by)
        .bind(ticket.created_for)
        .bind(ticket.assigned_to)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.category.as_str())
        .bind(&ticket.resolution)
        .bind(ticket.resolved_at)
        .bind(ticket.closed_at)
        .bind(ticket.first_response_at)
        .bind(ticket.due_date)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::UnableToGenerateUniqueNumber
            } else {
                error!("Database error creating ticket: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        info!("Support ticket created: {}", row.ticket_number);
        Ok(row.into())
    }

    async fn update(&self, ticket: &SupportTicket) -> Result<SupportTicket, DomainError> {
        let row: Option<TicketRow> = sqlx::query_as(&format!(
            r#"
            UPDATE support_tickets AS s SET
                created_for = $2, assigned_to = $3, subject = $4, description = $5,
                priority = $6, status = $7, category = $8, resolution = $9, resolved_at = $10,
                closed_at = $11, first_response_at = $12, due_date = $13, updated_at = NOW()
            WHERE s.id = $1
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(ticket.id)
        .bind(ticket.created_for)
        .bind(ticket.assigned_to)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.category.as_str())
        .bind(&ticket.resolution)
        .bind(ticket.resolved_at)
        .bind(ticket.closed_at)
        .bind(ticket.first_response_at)
        .bind(ticket.due_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating ticket", e))?;

        row.map(|r| r.into()).ok_or(DomainError::TicketNotFound)
    }

    async fn list(&self, filter: &TicketFilter, pagination: Pagination) -> Result<Page<TicketListRow>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM support_tickets s JOIN tenants t ON t.id = s.tenant_id");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tickets", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {}, t.name AS tenant_name FROM support_tickets s JOIN tenants t ON t.id = s.tenant_id",
            TICKET_COLUMNS
        ));
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY s.created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<TicketListDbRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing tickets", e))?;

        let items = rows
            .into_iter()
            .map(|r| TicketListRow { ticket: r.ticket.into(), tenant_name: r.tenant_name })
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    async fn add_comment(&self, comment: &TicketComment) -> Result<TicketComment, DomainError> {
        let row: CommentRow = sqlx::query_as(
            r#"
            INSERT INTO ticket_comments (id, ticket_id, author_id, content, is_internal, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, ticket_id, author_id, content, is_internal, created_at
            "#,
        )
        .bind(comment.id)
        .bind(comment.ticket_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.is_internal)
        .bind(comment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("adding ticket comment", e))?;

        Ok(row.into())
    }

    async fn list_comments(&self, ticket_id: &Uuid, include_internal: bool) -> Result<Vec<TicketComment>, DomainError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_id, author_id, content, is_internal, created_at
            FROM ticket_comments
            WHERE ticket_id = $1 AND ($2 OR NOT is_internal)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing ticket comments", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stats(&self, staff_id: &Uuid) -> Result<TicketStats, DomainError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status IN ('OPEN', 'IN_PROGRESS')) AS open,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE assigned_to = $1 AND status NOT IN ('RESOLVED', 'CLOSED')) AS assigned_to_me,
                COUNT(*) FILTER (WHERE assigned_to IS NULL AND status NOT IN ('RESOLVED', 'CLOSED')) AS unassigned,
                COUNT(*) FILTER (WHERE priority IN ('HIGH', 'URGENT') AND status NOT IN ('RESOLVED', 'CLOSED')) AS high_priority
            FROM support_tickets
            "#,
        )
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("computing ticket stats", e))?;

        Ok(TicketStats {
            open: row.open,
            pending: row.pending,
            assigned_to_me: row.assigned_to_me,
            unassigned: row.unassigned,
            high_priority: row.high_priority,
        })
    }
}
