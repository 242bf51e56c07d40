//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const CLIENT_PAGE_SIZE: u32 = 25;
pub const TRIP_PAGE_SIZE: u32 = 20;
pub const INVOICE_PAGE_SIZE: u32 = 25;
pub const TICKET_PAGE_SIZE: u32 = 25;
pub const TENANT_PAGE_SIZE: u32 = 20;
pub const USER_PAGE_SIZE: u32 = 25;
pub const AUDIT_PAGE_SIZE: u32 = 50;

pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 28800;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

pub const IMPERSONATION_KEY_PREFIX: &str = "imp_token:";
pub const IMPERSONATION_TTL_HOURS: i64 = 8;
pub const IMPERSONATION_EXTEND_HOURS: i64 = 2;
pub const IMPERSONATION_HEADER: &str = "x-impersonation-token";

pub const PASSWORD_RESET_KEY_PREFIX: &str = "pwd_reset:";
pub const PASSWORD_RESET_TTL_HOURS: i64 = 72;

pub const DEFAULT_TRIAL_DAYS: i64 = 14;
pub const DEFAULT_PLAN_TYPE: &str = "basic";
pub const DEFAULT_MAX_USERS: i32 = 5;
pub const DEFAULT_TIMEZONE: &str = "UTC";

pub const INVOICE_DUE_DAYS: i64 = 30;
pub const PAYMENT_REMINDER_WINDOW_DAYS: i64 = 3;
pub const PRE_DEPARTURE_WINDOW_DAYS: i64 = 30;
pub const TICKET_NUMBER_PREFIX: &str = "VD-";
pub const TICKET_NUMBER_ATTEMPTS: u32 = 10;
