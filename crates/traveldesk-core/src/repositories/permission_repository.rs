//! Permission, role grant and override storage (port)

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{PermissionDef, RoleName, UserPermissionOverride};
use crate::error::DomainError;

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Inserts the permission or refreshes its name, category and description.
    async fn upsert_permission(&self, permission: &PermissionDef) -> Result<(), DomainError>;
    /// Returns true when the grant did not exist yet.
    async fn grant_to_role(&self, role: RoleName, codename: &str, granted_by: Option<Uuid>) -> Result<bool, DomainError>;
    async fn role_grants(&self, role: RoleName) -> Result<Vec<String>, DomainError>;
    async fn list_overrides(&self, user_id: &Uuid) -> Result<Vec<UserPermissionOverride>, DomainError>;
    /// One override per (user, permission); a second call replaces the first.
    async fn upsert_override(&self, ov: &UserPermissionOverride) -> Result<UserPermissionOverride, DomainError>;
    async fn delete_override(&self, user_id: &Uuid, codename: &str) -> Result<bool, DomainError>;
}
