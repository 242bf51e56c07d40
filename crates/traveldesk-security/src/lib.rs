//! # TravelDesk Security
//!
//! Security utilities: JWT, password hashing and strength, opaque tokens.

pub mod jwt;
pub mod password;
pub mod token;

pub use jwt::{Claims, JwtService};
pub use password::PasswordService;
