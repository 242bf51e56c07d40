// ============================================================================
// TravelDesk Core - CRM Client Entity
// File: crates/traveldesk-core/src/domain/client.rs
// Description: Travel clients of a tenant and advisor notes about them
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    pub enum CommunicationPreference {
        Email => ("EMAIL", "Email"),
        Phone => ("PHONE", "Phone"),
        Text => ("TEXT", "Text Message"),
        Mail => ("MAIL", "Mail"),
    }
    default = Email;
}

text_enum! {
    pub enum LeadSource {
        Website => ("WEBSITE", "Website"),
        Referral => ("REFERRAL", "Referral"),
        SocialMedia => ("SOCIAL_MEDIA", "Social Media"),
        EmailMarketing => ("EMAIL_MARKETING", "Email Marketing"),
        WalkIn => ("WALK_IN", "Walk In"),
        RepeatClient => ("REPEAT_CLIENT", "Repeat Client"),
        Other => ("OTHER", "Other"),
    }
    default = Other;
}

text_enum! {
    pub enum VipStatus {
        Regular => ("REGULAR", "Regular"),
        Vip => ("VIP", "VIP"),
        Premium => ("PREMIUM", "Premium"),
    }
    default = Regular;
}

impl VipStatus {
    /// VIP and Premium both count as VIP clients.
    pub fn is_vip(&self) -> bool {
        matches!(self, VipStatus::Vip | VipStatus::Premium)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Client {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_by: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,

    pub preferred_communication: CommunicationPreference,
    pub travel_style: Option<String>,
    pub special_needs: Option<String>,
    pub lead_source: LeadSource,
    pub is_active: bool,
    pub vip_status: VipStatus,
    pub last_contact_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        tenant_id: Uuid,
        created_by: Option<Uuid>,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let client = Self {
            id: Uuid::new_v4(),
            tenant_id,
            created_by,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            date_of_birth: None,
            preferred_communication: CommunicationPreference::default(),
            travel_style: None,
            special_needs: None,
            lead_source: LeadSource::default(),
            is_active: true,
            vip_status: VipStatus::default(),
            last_contact_date: None,
            created_at: now,
            updated_at: now,
        };
        client.validate()?;
        Ok(client)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

text_enum! {
    pub enum NoteType {
        General => ("GENERAL", "General Note"),
        CallLog => ("CALL_LOG", "Call Log"),
        Meeting => ("MEETING", "Meeting Notes"),
        Preference => ("PREFERENCE", "Travel Preference"),
        Issue => ("ISSUE", "Issue/Complaint"),
        FollowUp => ("FOLLOW_UP", "Follow Up Required"),
    }
    default = General;
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientNote {
    pub id: Uuid,
    pub client_id: Uuid,
    pub created_by: Option<Uuid>,
    pub note_type: NoteType,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub is_important: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientNote {
    pub fn new(
        client_id: Uuid,
        created_by: Option<Uuid>,
        note_type: NoteType,
        title: &str,
        content: &str,
    ) -> Result<Self, validator::ValidationErrors> {
        let now = Utc::now();
        let note = Self {
            id: Uuid::new_v4(),
            client_id,
            created_by,
            note_type,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            is_important: false,
            follow_up_date: None,
            created_at: now,
            updated_at: now,
        };
        note.validate()?;
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;

    #[test]
    fn test_new_client_defaults() {
        let first: String = FirstName().fake();
        let last: String = LastName().fake();
        let email: String = SafeEmail().fake();
        let client = Client::new(Uuid::new_v4(), None, &first, &last, &email).unwrap();

        assert_eq!(client.full_name(), format!("{} {}", first.trim(), last.trim()));
        assert_eq!(client.lead_source, LeadSource::Other);
        assert_eq!(client.preferred_communication, CommunicationPreference::Email);
        assert_eq!(client.vip_status, VipStatus::Regular);
        assert!(client.is_active);
    }

    #[test]
    fn test_client_requires_names_and_email() {
        assert!(Client::new(Uuid::new_v4(), None, "", "Doe", "jd@example.com").is_err());
        assert!(Client::new(Uuid::new_v4(), None, "Jane", "Doe", "not-an-email").is_err());
    }

    #[test]
    fn test_vip_grouping() {
        assert!(VipStatus::Vip.is_vip());
        assert!(VipStatus::Premium.is_vip());
        assert!(!VipStatus::Regular.is_vip());
    }

    #[test]
    fn test_note_validation() {
        assert!(ClientNote::new(Uuid::new_v4(), None, NoteType::CallLog, "Called", "Left voicemail").is_ok());
        assert!(ClientNote::new(Uuid::new_v4(), None, NoteType::General, "", "x").is_err());
    }
}
