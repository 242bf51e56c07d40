//! SMTP delivery through lettre

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{EmailTransport, OutgoingEmail};
use traveldesk_shared::utils::mask_email;

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// STARTTLS relay with username/password authentication.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self, DomainError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| DomainError::InternalError(format!("SMTP relay {}: {}", host, e)))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self { mailer })
    }

    fn mailbox(address: &str) -> Result<Mailbox, DomainError> {
        address
            .parse::<Mailbox>()
            .map_err(|e| DomainError::ValidationError(format!("Invalid address {}: {}", address, e)))
    }

    fn build_message(email: &OutgoingEmail) -> Result<Message, DomainError> {
        let mut builder = Message::builder().from(Self::mailbox(&email.from)?).subject(&email.subject);
        for to in &email.to {
            builder = builder.to(Self::mailbox(to)?);
        }
        for cc in &email.cc {
            builder = builder.cc(Self::mailbox(cc)?);
        }
        for bcc in &email.bcc {
            builder = builder.bcc(Self::mailbox(bcc)?);
        }

        let message = match &email.html {
            Some(html) => builder.multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(email.text.clone()))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html.clone())),
            ),
            None => builder.header(ContentType::TEXT_PLAIN).body(email.text.clone()),
        };
        message.map_err(|e| DomainError::ValidationError(e.to_string()))
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, DomainError> {
        let recipient = email.to.first().map(|to| mask_email(to)).unwrap_or_default();
        let message = match Self::build_message(email) {
            Ok(message) => message,
            Err(e) => {
                warn!("Cannot build email for {}: {}", recipient, e);
                return Ok(false);
            }
        };

        match self.mailer.send(message).await {
            Ok(response) if response.is_positive() => {
                info!("Email relayed over SMTP for {}", recipient);
                Ok(true)
            }
            Ok(response) => {
                warn!("SMTP server refused email for {}: {:?}", recipient, response.code());
                Ok(false)
            }
            Err(e) if e.is_permanent() => {
                warn!("SMTP permanent failure for {}: {}", recipient, e);
                Ok(false)
            }
            Err(e) => {
                error!("SMTP delivery failed for {}: {}", recipient, e);
                Err(DomainError::EmailDeliveryFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_with_html_alternative() {
        let email = OutgoingEmail::new(
            "Acme Travel <ops@acme.traveldesk.app>".into(),
            "guest@example.com",
            "Invoice INV-20260301-0007 from Acme Travel",
            "Amount due: $1,250.00".into(),
            Some("<p>Amount due: $1,250.00</p>".into()),
        );
        let message = SmtpTransport::build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("To: guest@example.com"));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let email = OutgoingEmail::new("not an address".into(), "guest@example.com", "Hi", "x".into(), None);
        assert!(matches!(SmtpTransport::build_message(&email), Err(DomainError::ValidationError(_))));
    }
}
