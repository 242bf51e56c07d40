//! User repository trait (port)

use async_trait::async_trait;
use uuid::Uuid;

use traveldesk_shared::types::{Page, Pagination};

use crate::domain::{RoleName, User};
use crate::error::DomainError;

/// Filters for the user administration list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Restricts the list to one tenant (client admins always set this).
    pub tenant_id: Option<Uuid>,
    /// Case-insensitive match on username, email, first or last name.
    pub search: Option<String>,
    pub role: Option<RoleName>,
    pub is_active: Option<bool>,
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    /// Login lookup: matches the username exactly or the email case-insensitively.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, DomainError>;
    async fn create(&self, user: &User) -> Result<User, DomainError>;
    async fn update(&self, user: &User) -> Result<User, DomainError>;
    async fn list(&self, filter: &UserFilter, pagination: Pagination) -> Result<Page<User>, DomainError>;
    async fn count_active_in_tenant(&self, tenant_id: &Uuid) -> Result<i64, DomainError>;
    /// Active users of a tenant holding one of `roles`.
    async fn list_active_in_tenant(&self, tenant_id: &Uuid, roles: &[RoleName]) -> Result<Vec<User>, DomainError>;
    /// Active platform staff.
    async fn list_active_system_users(&self) -> Result<Vec<User>, DomainError>;
}
