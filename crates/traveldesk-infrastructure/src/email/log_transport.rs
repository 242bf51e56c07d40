//! Development transport: logs the message instead of delivering it

use async_trait::async_trait;
use tracing::info;

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{EmailTransport, OutgoingEmail};

#[derive(Debug, Default)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, DomainError> {
        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            html = email.html.is_some(),
            "Email not delivered (log transport)"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_always_accepts() {
        let email = OutgoingEmail::new("a@b.c".into(), "d@e.f", "Hello", "body".into(), None);
        assert!(LogTransport::new().send(&email).await.unwrap());
    }
}
