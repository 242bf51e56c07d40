//! Permission catalog, role grants and per-user overrides

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};
use uuid::Uuid;

use traveldesk_core::domain::{PermissionDef, RoleName, UserPermissionOverride};
use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::PermissionRepository;

use super::db_error;

pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    id: Uuid,
    user_id: Uuid,
    codename: String,
    is_granted: bool,
    granted_by: Option<Uuid>,
    reason: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OverrideRow> for UserPermissionOverride {
    fn from(row: OverrideRow) -> Self {
        UserPermissionOverride {
            id: row.id,
            user_id: row.user_id,
            codename: row.codename,
            is_granted: row.is_granted,
            granted_by: row.granted_by,
            reason: row.reason,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn upsert_permission(&self, permission: &PermissionDef) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO permissions (codename, name, category, description, is_sensitive)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (codename) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                description = EXCLUDED.description,
                is_sensitive = EXCLUDED.is_sensitive
            "#,
        )
        .bind(permission.codename)
        .bind(permission.name)
        .bind(permission.category.as_str())
        .bind(permission.description)
        .bind(permission.is_sensitive)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("upserting permission", e))?;

        Ok(())
    }

    async fn grant_to_role(&self, role: RoleName, codename: &str, granted_by: Option<Uuid>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (role, codename, granted_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (role, codename) DO NOTHING
            "#,
        )
        .bind(role.as_str())
        .bind(codename)
        .bind(granted_by)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("granting permission to role", e))?;

        let created = result.rows_affected() > 0;
        if created {
            debug!("Granted {} to {}", codename, role);
        }
        Ok(created)
    }

    async fn role_grants(&self, role: RoleName) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar("SELECT codename FROM role_permissions WHERE role = $1 ORDER BY codename")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("loading role grants", e))
    }

    async fn list_overrides(&self, user_id: &Uuid) -> Result<Vec<UserPermissionOverride>, DomainError> {
        let rows: Vec<OverrideRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, codename, is_granted, granted_by, reason, expires_at, created_at
            FROM user_permissions
            WHERE user_id = $1
            ORDER BY codename
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing permission overrides", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_override(&self, ov: &UserPermissionOverride) -> Result<UserPermissionOverride, DomainError> {
        let row: OverrideRow = sqlx::query_as(
            r#"
            INSERT INTO user_permissions (id, user_id, codename, is_granted, granted_by, reason, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, codename) DO UPDATE SET
                is_granted = EXCLUDED.is_granted,
                granted_by = EXCLUDED.granted_by,
                reason = EXCLUDED.reason,
                expires_at = EXCLUDED.expires_at
            RETURNING id, user_id, codename, is_granted, granted_by, reason, expires_at, created_at
            "#,
        )
        .bind(ov.id)
        .bind(ov.user_id)
        .bind(&ov.codename)
        .bind(ov.is_granted)
        .bind(ov.granted_by)
        .bind(&ov.reason)
        .bind(ov.expires_at)
        .bind(ov.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e: sqlx::Error| {
            // Foreign key on permissions.codename
            if e.to_string().contains("foreign key") {
                return DomainError::UnknownPermission(ov.codename.clone());
            }
            error!("Database error saving permission override: {}", e);
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(row.into())
    }

    async fn delete_override(&self, user_id: &Uuid, codename: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND codename = $2")
            .bind(user_id)
            .bind(codename)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting permission override", e))?;

        Ok(result.rows_affected() > 0)
    }
}
