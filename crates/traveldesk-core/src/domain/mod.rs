//! # TravelDesk Core - Domain Module
//!
//! Domain entities for the TravelDesk back-office.

/// Declares a closed set of codes persisted as TEXT. Generates `as_str`,
/// `from_str` (case-insensitive), `label`, `ALL`, `Default` and `Display`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn from_str(s: &str) -> Option<Self> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod money;
pub mod role;
pub mod permission;
pub mod principal;
pub mod tenant;
pub mod user;
pub mod audit_log;
pub mod client;
pub mod communication;
pub mod trip;
pub mod invoice;
pub mod support;

// Re-export all entities and enums
pub use money::{format_usd, format_usd_cents};
pub use role::{RoleInfo, RoleName};
pub use permission::{PermissionCategory, PermissionDef, PERMISSION_CATALOG};
pub use principal::{Impersonator, Principal, RequestMeta};
pub use tenant::{Tenant, TenantStatus, TenantType};
pub use user::{User, UserPermissionOverride};
pub use audit_log::{AuditAction, AuditLog};
pub use client::{Client, ClientNote, CommunicationPreference, LeadSource, NoteType, VipStatus};
pub use communication::{ClientCommunication, CommunicationDirection, CommunicationType};
pub use trip::{
    LineItemType, ParticipantRelationship, Trip, TripItinerary, TripLineItem, TripParticipant,
    TripStatus, TripType,
};
pub use invoice::{
    Invoice, InvoiceLineItem, InvoiceStatus, Payment, PaymentMethod, PaymentSchedule,
    ScheduleStatus,
};
pub use support::{SupportTicket, TicketCategory, TicketComment, TicketPriority, TicketStatus};
