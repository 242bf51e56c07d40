// ============================================================================
// TravelDesk Core - Tenant Entity
// File: crates/traveldesk-core/src/domain/tenant.rs
// Description: Travel agency organization, the unit of data isolation
// ============================================================================

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use traveldesk_shared::constants::{DEFAULT_MAX_USERS, DEFAULT_PLAN_TYPE};

text_enum! {
    pub enum TenantType {
        Prospect => ("PROSPECT", "Prospect"),
        Trial => ("TRIAL", "Trial"),
        Client => ("CLIENT", "Client"),
    }
    default = Prospect;
}

text_enum! {
    pub enum TenantStatus {
        Active => ("ACTIVE", "Active"),
        TrialExpired => ("TRIAL_EXPIRED", "Trial Expired"),
        Suspended => ("SUSPENDED", "Suspended"),
        Cancelled => ("CANCELLED", "Cancelled"),
        PendingSetup => ("PENDING_SETUP", "Pending Setup"),
    }
    default = PendingSetup;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Tenant {
    pub id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 63, message = "Subdomain must be 1-63 characters"))]
    pub subdomain: String,

    pub is_active: bool,
    pub tenant_type: TenantType,
    pub status: TenantStatus,
    pub trial_start_date: Option<NaiveDate>,
    pub trial_end_date: Option<NaiveDate>,

    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    pub plan_type: String,
    #[validate(range(min = 1, message = "Max users must be at least 1"))]
    pub max_users: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: String, subdomain: String) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let tenant = Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            subdomain: subdomain.trim().to_lowercase(),
            is_active: true,
            tenant_type: TenantType::default(),
            status: TenantStatus::default(),
            trial_start_date: None,
            trial_end_date: None,
            contact_email: None,
            phone: None,
            address: None,
            plan_type: DEFAULT_PLAN_TYPE.to_string(),
            max_users: DEFAULT_MAX_USERS,
            created_at: now,
            updated_at: now,
        };
        tenant.validate()?;
        Ok(tenant)
    }

    pub fn start_trial(&mut self, today: NaiveDate, days: i64) {
        self.tenant_type = TenantType::Trial;
        self.status = TenantStatus::Active;
        self.is_active = true;
        self.trial_start_date = Some(today);
        self.trial_end_date = Some(today + Duration::days(days));
        self.updated_at = Utc::now();
    }

    pub fn convert_to_client(&mut self) {
        self.tenant_type = TenantType::Client;
        self.status = TenantStatus::Active;
        self.is_active = true;
        self.trial_end_date = None;
        self.updated_at = Utc::now();
    }

    pub fn suspend(&mut self) {
        self.status = TenantStatus::Suspended;
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) {
        self.status = TenantStatus::Active;
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    pub fn is_trial_expired(&self, today: NaiveDate) -> bool {
        self.tenant_type == TenantType::Trial
            && self.trial_end_date.map(|end| end < today).unwrap_or(false)
    }

    pub fn trial_days_remaining(&self, today: NaiveDate) -> Option<i64> {
        if self.tenant_type != TenantType::Trial {
            return None;
        }
        self.trial_end_date
            .map(|end| (end - today).num_days().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_new_tenant_defaults() {
        let tenant = Tenant::new("  Sunny Travel ".into(), "Sunny-Travel".into()).unwrap();
        assert_eq!(tenant.name, "Sunny Travel");
        assert_eq!(tenant.subdomain, "sunny-travel");
        assert_eq!(tenant.tenant_type, TenantType::Prospect);
        assert_eq!(tenant.status, TenantStatus::PendingSetup);
        assert_eq!(tenant.plan_type, "basic");
        assert_eq!(tenant.max_users, 5);
    }

    #[test]
    fn test_new_tenant_requires_name() {
        assert!(Tenant::new("   ".into(), "x".into()).is_err());
    }

    #[test]
    fn test_trial_lifecycle() {
        let mut tenant = Tenant::new("Agency".into(), "agency".into()).unwrap();
        tenant.start_trial(today(), 14);
        assert_eq!(tenant.tenant_type, TenantType::Trial);
        assert_eq!(tenant.status, TenantStatus::Active);
        assert_eq!(tenant.trial_days_remaining(today()), Some(14));
        assert!(!tenant.is_trial_expired(today()));
        assert!(tenant.is_trial_expired(today() + Duration::days(15)));

        tenant.convert_to_client();
        assert_eq!(tenant.tenant_type, TenantType::Client);
        assert!(!tenant.is_trial_expired(today() + Duration::days(30)));
        assert_eq!(tenant.trial_days_remaining(today()), None);
    }

    #[test]
    fn test_suspend_and_activate() {
        let mut tenant = Tenant::new("Agency".into(), "agency".into()).unwrap();
        tenant.suspend();
        assert!(!tenant.is_active);
        assert_eq!(tenant.status, TenantStatus::Suspended);
        tenant.activate();
        assert!(tenant.is_active);
        assert_eq!(tenant.status, TenantStatus::Active);
    }
}
