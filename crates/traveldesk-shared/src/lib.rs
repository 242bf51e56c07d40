//! # TravelDesk Shared
//!
//! Configuration, pagination types, utilities and telemetry shared by every
//! TravelDesk crate.

pub mod constants;
pub mod types;
pub mod utils;
pub mod telemetry;
pub mod config;

pub use types::*;
