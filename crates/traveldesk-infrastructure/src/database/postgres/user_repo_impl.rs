// ============================================================================
// TravelDesk Infrastructure - PostgreSQL User Repository
// File: crates/traveldesk-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use traveldesk_core::domain::{RoleName, User};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{UserFilter, UserRepository};
use traveldesk_shared::types::{Page, Pagination};

use super::{db_error, is_unique_violation, like_pattern};

const USER_COLUMNS: &str = r#"
    id, tenant_id, username, email, password_hash, first_name, last_name, role,
    is_active, is_tenant_admin, mfa_enabled, phone, timezone, has_financial_access,
    last_login, last_login_ip, created_at, created_by, updated_at
"#;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn write_error(user: &User, e: sqlx::Error) -> DomainError {
        if is_unique_violation(&e) {
            if e.to_string().contains("email") {
                return DomainError::EmailAlreadyExists(user.email.clone());
            }
            return DomainError::UsernameAlreadyExists(user.username.clone());
        }
        error!("Database error writing user {}: {}", user.username, e);
        DomainError::DatabaseError(e.to_string())
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
        qb.push(" WHERE 1=1");
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND tenant_id = ").push_bind(tenant_id);
        }
        if let Some(role) = filter.role {
            qb.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (username ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: Option<Uuid>,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    is_active: bool,
    is_tenant_admin: bool,
    mfa_enabled: bool,
    phone: Option<String>,
    timezone: String,
    has_financial_access: bool,
    last_login: Option<DateTime<Utc>>,
    last_login_ip: Option<IpAddr>,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            tenant_id: row.tenant_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role: RoleName::from_str(&row.role).unwrap_or_default(),
            is_active: row.is_active,
            is_tenant_admin: row.is_tenant_admin,
            mfa_enabled: row.mfa_enabled,
            phone: row.phone,
            timezone: row.timezone,
            has_financial_access: row.has_financial_access,
            last_login: row.last_login,
            last_login_ip: row.last_login_ip,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e: sqlx::Error| {
                    error!("Database error finding user by id: {}", e);
                    DomainError::DatabaseError(e.to_string())
                })?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding user by username", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding user by email", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, DomainError> {
        // Username match wins over an email match on another account
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM users
            WHERE username = $1 OR LOWER(email) = LOWER($1)
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#,
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding user by login", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (
                id, tenant_id, username, email, password_hash, first_name, last_name, role,
                is_active, is_tenant_admin, mfa_enabled, phone, timezone, has_financial_access,
                last_login, last_login_ip, created_at, created_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(user.tenant_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_tenant_admin)
        .bind(user.mfa_enabled)
        .bind(&user.phone)
        .bind(&user.timezone)
        .bind(user.has_financial_access)
        .bind(user.last_login)
        .bind(user.last_login_ip)
        .bind(user.created_at)
        .bind(user.created_by)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Self::write_error(user, e))?;

        info!("User created: {} ({})", row.username, row.id);
        Ok(row.into())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                tenant_id = $2, username = $3, email = $4, password_hash = $5,
                first_name = $6, last_name = $7, role = $8, is_active = $9,
                is_tenant_admin = $10, mfa_enabled = $11, phone = $12, timezone = $13,
                has_financial_access = $14, last_login = $15, last_login_ip = $16,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(user.tenant_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.is_tenant_admin)
        .bind(user.mfa_enabled)
        .bind(&user.phone)
        .bind(&user.timezone)
        .bind(user.has_financial_access)
        .bind(user.last_login)
        .bind(user.last_login_ip)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::write_error(user, e))?;

        row.map(|r| r.into()).ok_or(DomainError::UserNotFound)
    }

    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> Result<Page<User>, DomainError> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting users", e))?;

        let pagination = pagination.clamp_to(total);
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM users", USER_COLUMNS));
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY username ASC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<UserRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing users", e))?;

        Ok(Page::new(rows.into_iter().map(Into::into).collect(), pagination, total))
    }

    async fn count_active_in_tenant(&self, tenant_id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tenant users", e))
    }

    async fn list_active_in_tenant(&self, tenant_id: &Uuid, roles: &[RoleName]) -> Result<Vec<User>, DomainError> {
        let codes: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE tenant_id = $1 AND is_active AND role = ANY($2) ORDER BY username",
            USER_COLUMNS
        ))
        .bind(tenant_id)
        .bind(&codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing tenant users by role", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_active_system_users(&self) -> Result<Vec<User>, DomainError> {
        let codes: Vec<String> = RoleName::ALL
            .iter()
            .filter(|r| r.is_system_role())
            .map(|r| r.as_str().to_string())
            .collect();
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE is_active AND role = ANY($1) ORDER BY username",
            USER_COLUMNS
        ))
        .bind(&codes)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing system users", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
