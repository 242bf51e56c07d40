//! Request extractors and guards

pub mod auth;
pub mod rate_limit;

pub use auth::{AuthUser, ClientMeta};
pub use rate_limit::LoginRateLimiter;
