//! # TravelDesk Core
//!
//! Domain entities, services, and repository traits for the TravelDesk
//! back-office: RBAC, tenants, CRM, trips, invoicing, support tickets and
//! staff impersonation.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::DomainError;
