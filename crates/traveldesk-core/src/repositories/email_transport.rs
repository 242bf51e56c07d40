//! Outgoing mail delivery (port)

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DomainError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl OutgoingEmail {
    pub fn new(from: String, to: &str, subject: &str, text: String, html: Option<String>) -> Self {
        Self {
            from,
            to: vec![to.to_string()],
            subject: subject.to_string(),
            text,
            html,
            ..Default::default()
        }
    }
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// `Ok(false)` when the provider refused the message, `Err` when it was unreachable.
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, DomainError>;
}
