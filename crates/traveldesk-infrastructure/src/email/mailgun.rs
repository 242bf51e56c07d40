// ============================================================================
// TravelDesk Infrastructure - Mailgun Transport
// File: crates/traveldesk-infrastructure/src/email/mailgun.rs
// Description: Sends mail through the Mailgun messages API
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};

use traveldesk_core::error::DomainError;
use traveldesk_core::repositories::{EmailTransport, OutgoingEmail};
use traveldesk_shared::utils::mask_email;

pub struct MailgunTransport {
    client: Client,
    api_base: String,
    api_key: String,
    domain: String,
}

impl MailgunTransport {
    pub fn new(api_base: &str, api_key: &str, domain: &str) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DomainError::InternalError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            domain: domain.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v3/{}/messages", self.api_base, self.domain)
    }

    fn form(email: &OutgoingEmail) -> Vec<(&'static str, String)> {
        let mut form = vec![("from", email.from.clone())];
        form.extend(email.to.iter().map(|to| ("to", to.clone())));
        form.extend(email.cc.iter().map(|cc| ("cc", cc.clone())));
        form.extend(email.bcc.iter().map(|bcc| ("bcc", bcc.clone())));
        form.push(("subject", email.subject.clone()));
        form.push(("text", email.text.clone()));
        if let Some(html) = &email.html {
            form.push(("html", html.clone()));
        }
        form
    }
}

#[async_trait]
impl EmailTransport for MailgunTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, DomainError> {
        let recipient = email.to.first().map(|to| mask_email(to)).unwrap_or_default();

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(&Self::form(email))
            .send()
            .await
            .map_err(|e| {
                error!("Mailgun request failed for {}: {}", recipient, e);
                DomainError::EmailDeliveryFailed(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Email accepted by Mailgun for {}", recipient);
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Mailgun rejected email for {}: {} {}", recipient, status, body);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutgoingEmail {
        OutgoingEmail::new(
            "Dana Reyes <dana.reyes@acme.traveldesk.app>".into(),
            "guest@example.com",
            "Your Trip Confirmation: Lisbon",
            "See you soon".into(),
            Some("<p>See you soon</p>".into()),
        )
    }

    #[tokio::test]
    async fn test_send_posts_form_to_domain() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mg.example.com/messages"))
            .and(header_exists("authorization"))
            .and(body_string_contains("to=guest%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"<1@mg>","message":"Queued"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let transport = MailgunTransport::new(&server.uri(), "key-123", "mg.example.com").unwrap();
        assert!(transport.send(&email()).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_message_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("'from' parameter is not a valid address"))
            .mount(&server)
            .await;

        let transport = MailgunTransport::new(&server.uri(), "key-123", "mg.example.com").unwrap();
        assert!(!transport.send(&email()).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_error() {
        let transport = MailgunTransport::new("http://127.0.0.1:9", "key-123", "mg.example.com").unwrap();
        let result = transport.send(&email()).await;
        assert!(matches!(result, Err(DomainError::EmailDeliveryFailed(_))));
    }

    #[test]
    fn test_form_includes_html_and_all_recipients() {
        let mut message = email();
        message.cc = vec!["agent@example.com".into()];
        let form = MailgunTransport::form(&message);
        assert!(form.contains(&("cc", "agent@example.com".to_string())));
        assert!(form.iter().any(|(k, _)| *k == "html"));
        assert_eq!(form.iter().filter(|(k, _)| *k == "to").count(), 1);
    }
}
