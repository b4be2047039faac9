//! WhatsAppSender -- concrete [`MessageSender`] for the WhatsApp Cloud API.
//!
//! Posts to `{base}/{api_version}/{phone_number_id}/messages` with a bearer
//! token. The token is wrapped in [`secrecy::SecretString`] and is only
//! exposed when building the request header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use parley_core::collaborator::MessageSender;
use parley_types::config::WhatsAppConfig;
use parley_types::error::{CollaboratorError, ConfigError};
use parley_types::outbound::OutboundPayload;

use super::types::GraphMessage;

const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// WhatsApp Cloud API sender.
///
/// Does not derive Debug so the access token can never end up in logs.
pub struct WhatsAppSender {
    client: reqwest::Client,
    access_token: SecretString,
    messages_url: String,
}

impl WhatsAppSender {
    /// Build a sender from config plus the access token resolved from the
    /// environment.
    pub fn from_config(
        config: &WhatsAppConfig,
        access_token: Option<SecretString>,
    ) -> Result<Self, ConfigError> {
        let phone_number_id = config
            .phone_number_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::Missing("PARLEY_WHATSAPP_PHONE_NUMBER_ID"))?;
        let access_token = access_token.ok_or(ConfigError::Missing("PARLEY_WHATSAPP_ACCESS_TOKEN"))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(
            client,
            access_token,
            GRAPH_API_BASE,
            &config.api_version,
            phone_number_id,
        ))
    }

    pub fn new(
        client: reqwest::Client,
        access_token: SecretString,
        base_url: &str,
        api_version: &str,
        phone_number_id: &str,
    ) -> Self {
        let messages_url = format!(
            "{}/{}/{}/messages",
            base_url.trim_end_matches('/'),
            api_version,
            phone_number_id
        );
        Self {
            client,
            access_token,
            messages_url,
        }
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

impl MessageSender for WhatsAppSender {
    async fn send(&self, recipient: &str, payload: &OutboundPayload) -> Result<(), CollaboratorError> {
        let message = GraphMessage::render(recipient, payload);
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(recipient, status = status.as_u16(), "Message delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, serve};

    fn sender_for(url: &str) -> WhatsAppSender {
        WhatsAppSender::new(
            reqwest::Client::new(),
            SecretString::from("test-token-not-real"),
            url,
            "v20.0",
            "10987654321",
        )
    }

    #[test]
    fn test_messages_url() {
        let sender = sender_for("https://graph.facebook.com/");
        assert_eq!(
            sender.messages_url(),
            "https://graph.facebook.com/v20.0/10987654321/messages"
        );
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut config = WhatsAppConfig::default();
        let err = WhatsAppSender::from_config(&config, Some(SecretString::from("t")))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Missing("PARLEY_WHATSAPP_PHONE_NUMBER_ID")));

        config.phone_number_id = Some("10987654321".to_string());
        let err = WhatsAppSender::from_config(&config, None).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("PARLEY_WHATSAPP_ACCESS_TOKEN")));

        assert!(WhatsAppSender::from_config(&config, Some(SecretString::from("t"))).is_ok());
    }

    #[tokio::test]
    async fn test_send_posts_graph_payload_with_bearer() {
        let (url, mut requests) = serve(vec![CannedResponse::ok(r#"{"messages":[{"id":"wamid"}]}"#)]).await;
        sender_for(&url)
            .send("5491100000000", &OutboundPayload::Text { body: "Hola".into() })
            .await
            .unwrap();

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /v20.0/10987654321/messages "));
        assert!(
            request
                .lines()
                .any(|l| l.eq_ignore_ascii_case("authorization: Bearer test-token-not-real"))
        );
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["to"], "5491100000000");
        assert_eq!(json["text"]["body"], "Hola");
    }

    #[tokio::test]
    async fn test_rejected_send_is_status_error() {
        let (url, _requests) = serve(vec![CannedResponse::status(401, r#"{"error":"bad token"}"#)]).await;
        let err = sender_for(&url)
            .send("549", &OutboundPayload::Text { body: "x".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Status { status: 401, .. }));
    }
}
