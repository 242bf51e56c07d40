// ============================================================================
// TravelDesk Infrastructure - PostgreSQL Tenant Repository
// File: crates/traveldesk-infrastructure/src/database/postgres/tenant_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use traveldesk_core::domain::{Tenant, TenantStatus, TenantType};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{TenantCounts, TenantFilter, TenantRepository};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, is_unique_violation, like_pattern};

const TENANT_COLUMNS: &str = r#"
    id, name, subdomain, is_active, tenant_type, status, trial_start_date, trial_end_date,
    contact_email, phone, address, plan_type, max_users, created_at, updated_at
"#;

pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TenantFilter) {
        qb.push(" WHERE 1=1");
        if let Some(tenant_type) = filter.tenant_type {
            qb.push(" AND tenant_type = ").push_bind(tenant_type.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR subdomain ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact_email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    subdomain: String,
    is_active: bool,
    tenant_type: String,
    status: String,
    trial_start_date: Option<NaiveDate>,
    trial_end_date: Option<NaiveDate>,
    contact_email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    plan_type: String,
    max_users: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            subdomain: row.subdomain,
            is_active: row.is_active,
            tenant_type: TenantType::from_str(&row.tenant_type).unwrap_or_default(),
            status: TenantStatus::from_str(&row.status).unwrap_or_default(),
            trial_start_date: row.trial_start_date,
            trial_end_date: row.trial_end_date,
            contact_email: row.contact_email,
            phone: row.phone,
            address: row.address,
            plan_type: row.plan_type,
            max_users: row.max_users,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CountsRow {
    total: i64,
    active: i64,
    trial: i64,
    prospect: i64,
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error finding tenant by id: {}", e);
                    DomainError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE LOWER(subdomain) = LOWER($1)",
            TENANT_COLUMNS
        ))
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding tenant by subdomain", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let row: TenantRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tenants (
                id, name, subdomain, is_active, tenant_type, status, trial_start_date, trial_end_date,
                contact_email, phone, address, plan_type, max_users, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(tenant.is_active)
        .bind(tenant.tenant_type.as_str())
        .bind(tenant.status.as_str())
        .bind(tenant.trial_start_date)
        .bind(tenant.trial_end_date)
        .bind(&tenant.contact_email)
        .bind(&tenant.phone)
        .bind(&tenant.address)
        .bind(&tenant.plan_type)
        .bind(tenant.max_users)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::TenantSubdomainAlreadyExists(tenant.subdomain.clone())
            } else {
                error!("Database error creating tenant: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        info!("Tenant created: {} ({})", row.name, row.id);
        Ok(row.into())
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tenants SET
                name = $2, subdomain = $3, is_active = $4, tenant_type = $5, status = $6,
                trial_start_date = $7, trial_end_date = $8, contact_email = $9, phone = $10,
                address = $11, plan_type = $12, max_users = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.subdomain)
        .bind(tenant.is_active)
        .bind(tenant.tenant_type.as_str())
        .bind(tenant.status.as_str())
        .bind(tenant.trial_start_date)
        .bind(tenant.trial_end_date)
        .bind(&tenant.contact_email)
        .bind(&tenant.phone)
        .bind(&tenant.address)
        .bind(&tenant.plan_type)
        .bind(tenant.max_users)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            if is_unique_violation(&e) {
                DomainError::TenantSubdomainAlreadyExists(tenant.subdomain.clone())
            } else {
                error!("Database error updating tenant: {}", e);
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        row.map(|r| r.into()).ok_or(DomainError::TenantNotFound)
    }

    async fn list(&self, filter: &TenantFilter, pagination: Pagination) -> Result<Page<Tenant>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM tenants");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tenants", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM tenants", TENANT_COLUMNS));
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY name ASC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<TenantRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing tenants", e))?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), pagination, total))
    }

    async fn count_users(&self, tenant_id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tenant users", e))
    }

    async fn counts(&self) -> Result<TenantCounts, DomainError> {
        let row: CountsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_active) AS active,
                COUNT(*) FILTER (WHERE tenant_type = 'TRIAL') AS trial,
                COUNT(*) FILTER (WHERE tenant_type = 'PROSPECT') AS prospect
            FROM tenants
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting tenants by type", e))?;

        Ok(TenantCounts {
            total: row.total,
            active: row.active,
            trial: row.trial,
            prospect: row.prospect,
        })
    }
}
