//! HTTP handlers, one module per route group

pub mod audit;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod impersonation;
pub mod invoices;
pub mod rbac;
pub mod tenants;
pub mod tickets;
pub mod trips;
pub mod users;
pub mod webhooks;
