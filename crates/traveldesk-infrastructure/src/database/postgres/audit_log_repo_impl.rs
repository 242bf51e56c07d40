//! Append-only audit trail

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use traveldesk_core::domain::{AuditAction, AuditLog};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{AuditLogFilter, AuditLogRepository};
use traveldesk_shared::types::{Page, Pagination};

use super::db_error;

pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
        qb.push(" WHERE 1=1");
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND tenant_id = ").push_bind(tenant_id);
        }
        if let Some(action) = filter.action {
            qb.push(" AND action = ").push_bind(action.as_str());
        }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: Uuid,
    user_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
    action: String,
    resource_type: Option<String>,
    resource_id: Option<String>,
    details: Value,
    ip_address: Option<IpAddr>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        AuditLog {
            id: row.id,
            user_id: row.user_id,
            tenant_id: row.tenant_id,
            action: AuditAction::from_str(&row.action).unwrap_or_default(),
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            details: row.details,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            timestamp: row.timestamp,
        }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn insert(&self, entry: &AuditLog) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, user_id, tenant_id, action, resource_type, resource_id,
                details, ip_address, user_agent, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.tenant_id)
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.details)
        .bind(entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("writing audit log", e))?;

        Ok(())
    }

    async fn list(&self, filter: &AuditLogFilter, pagination: Pagination) -> Result<Page<AuditLog>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting audit logs", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, user_id, tenant_id, action, resource_type, resource_id, details, ip_address, user_agent, timestamp FROM audit_logs",
        );
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY timestamp DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<AuditLogRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing audit logs", e))?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), pagination, total))
    }
}
