//! Request payloads and list query parameters

pub mod auth;
pub mod query;
pub mod requests;

pub use auth::{ChangePasswordRequest, LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest, SetPasswordRequest};
pub use query::*;
pub use requests::*;
