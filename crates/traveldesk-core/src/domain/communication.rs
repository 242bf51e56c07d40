//! Client communication records (emails, calls, meetings)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    pub enum CommunicationType {
        Email => ("EMAIL", "Email"),
        Phone => ("PHONE", "Phone Call"),
        Sms => ("SMS", "Text Message"),
        Meeting => ("MEETING", "In-Person Meeting"),
        VideoCall => ("VIDEO_CALL", "Video Call"),
        Mail => ("MAIL", "Physical Mail"),
        Other => ("OTHER", "Other"),
    }
    default = Email;
}

text_enum! {
    pub enum CommunicationDirection {
        Outbound => ("OUTBOUND", "Outbound"),
        Inbound => ("INBOUND", "Inbound"),
    }
    default = Outbound;
}

pub const DELIVERY_SENT: &str = "SENT";
pub const DELIVERY_FAILED: &str = "FAILED";
pub const DELIVERY_RECEIVED: &str = "RECEIVED";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCommunication {
    pub id: Uuid,
    pub client_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub communication_type: CommunicationType,
    pub direction: CommunicationDirection,
    pub subject: String,
    pub content: String,
    pub email_message_id: Option<String>,
    pub email_thread_id: Option<String>,
    pub email_delivery_status: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ClientCommunication {
    pub fn new(
        client_id: Uuid,
        communication_type: CommunicationType,
        direction: CommunicationDirection,
        subject: &str,
        content: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            trip_id: None,
            created_by: None,
            communication_type,
            direction,
            subject: subject.to_string(),
            content: content.to_string(),
            email_message_id: None,
            email_thread_id: None,
            email_delivery_status: None,
            scheduled_at: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_sent(&mut self, delivered: bool) {
        self.sent_at = Some(Utc::now());
        self.email_delivery_status = Some(if delivered { DELIVERY_SENT } else { DELIVERY_FAILED }.to_string());
    }

    pub fn mark_error(&mut self, message: &str) {
        self.email_delivery_status = Some(format!("ERROR: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_status_transitions() {
        let mut comm = ClientCommunication::new(
            Uuid::new_v4(),
            CommunicationType::Email,
            CommunicationDirection::Outbound,
            "Hello",
            "Body",
        );
        comm.mark_sent(true);
        assert_eq!(comm.email_delivery_status.as_deref(), Some("SENT"));
        assert!(comm.sent_at.is_some());

        comm.mark_sent(false);
        assert_eq!(comm.email_delivery_status.as_deref(), Some("FAILED"));

        comm.mark_error("connection refused");
        assert_eq!(comm.email_delivery_status.as_deref(), Some("ERROR: connection refused"));
    }
}
