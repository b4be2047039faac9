//! HttpAssistantClient -- concrete [`AssistantClient`] over the assistant
//! service's JSON API.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /threads` and `POST /analysis-threads` open contexts
//! - `POST /analyze` returns raw interest lines
//! - `POST /generate` returns the reply in the `reply|||follow-up|||a|b` form

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use parley_core::collaborator::AssistantClient;
use parley_types::assistant::GeneratedReply;
use parley_types::config::AssistantConfig;
use parley_types::error::{CollaboratorError, ConfigError};

use super::types::{AnalyzeRequest, GenerateRequest, TextResponse, ThreadCreated};

pub struct HttpAssistantClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssistantClient {
    /// Build a client from config. The base URL is required.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, ConfigError> {
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("PARLEY_ASSISTANT_URL"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(client, base_url))
    }

    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, CollaboratorError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
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

        response
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("failed to parse response from {path}: {e}")))
    }

    async fn create_thread(&self, path: &str) -> Result<String, CollaboratorError> {
        let created: ThreadCreated = self.post(path, &serde_json::json!({})).await?;
        if created.thread_id.trim().is_empty() {
            return Err(CollaboratorError::Decode(format!("empty thread_id from {path}")));
        }
        Ok(created.thread_id)
    }
}

// HttpAssistantClient does not derive Debug; the reqwest client carries no
// useful state to print.

impl AssistantClient for HttpAssistantClient {
    async fn create_conversation_context(&self) -> Result<String, CollaboratorError> {
        self.create_thread("/threads").await
    }

    async fn create_analysis_context(&self) -> Result<String, CollaboratorError> {
        self.create_thread("/analysis-threads").await
    }

    async fn analyze(&self, analysis_thread_id: &str, text: &str) -> Result<String, CollaboratorError> {
        let body = AnalyzeRequest {
            thread_id: analysis_thread_id,
            message: text,
        };
        let response: TextResponse = self.post("/analyze", &body).await?;
        Ok(response.response)
    }

    async fn generate(
        &self,
        conversation_thread_id: &str,
        correspondent_id: &str,
        text: &str,
    ) -> Result<GeneratedReply, CollaboratorError> {
        let body = GenerateRequest {
            thread_id: conversation_thread_id,
            phone: correspondent_id,
            message: text,
        };
        let response: TextResponse = self.post("/generate", &body).await?;
        Ok(GeneratedReply::parse(&response.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, serve};

    fn client_for(url: &str) -> HttpAssistantClient {
        HttpAssistantClient::new(reqwest::Client::new(), url)
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = client_for("http://localhost:50052/");
        assert_eq!(client.url("/threads"), "http://localhost:50052/threads");
    }

    #[test]
    fn test_from_config_requires_url() {
        let err = HttpAssistantClient::from_config(&AssistantConfig::default()).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("PARLEY_ASSISTANT_URL")));

        let config = AssistantConfig {
            base_url: Some("http://assistant:8080".to_string()),
            ..Default::default()
        };
        assert!(HttpAssistantClient::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_create_conversation_context() {
        let (url, mut requests) = serve(vec![CannedResponse::ok(r#"{"thread_id":"thread_abc"}"#)]).await;
        let id = client_for(&url).create_conversation_context().await.unwrap();
        assert_eq!(id, "thread_abc");

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /threads "));
    }

    #[tokio::test]
    async fn test_analyze_sends_thread_and_message() {
        let (url, mut requests) =
            serve(vec![CannedResponse::ok(r#"{"response":"A01 Autos usados;"}"#)]).await;
        let raw = client_for(&url).analyze("thread_an", "quiero un auto").await.unwrap();
        assert_eq!(raw, "A01 Autos usados;");

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /analyze "));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["thread_id"], "thread_an");
        assert_eq!(json["message"], "quiero un auto");
    }

    #[tokio::test]
    async fn test_generate_parses_wire_form() {
        let (url, mut requests) = serve(vec![CannedResponse::ok(
            r#"{"response":"Claro|||¿Algo más?|||Sí|No"}"#,
        )])
        .await;
        let reply = client_for(&url)
            .generate("thread_conv", "5491100000000", "hola")
            .await
            .unwrap();
        assert_eq!(reply.reply, "Claro");
        assert_eq!(reply.follow_up.as_deref(), Some("¿Algo más?"));
        assert_eq!(reply.options, vec!["Sí", "No"]);

        let request = requests.recv().await.unwrap();
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["phone"], "5491100000000");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, _requests) = serve(vec![CannedResponse::status(503, "overloaded")]).await;
        let err = client_for(&url).analyze("t", "x").await.unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Status { status: 503, ref body } if body == "overloaded"
        ));
    }

    #[tokio::test]
    async fn test_bad_json_is_decode_error() {
        let (url, _requests) = serve(vec![CannedResponse::ok("not json")]).await;
        let err = client_for(&url).create_analysis_context().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let err = client_for("http://127.0.0.1:9")
            .create_conversation_context()
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Transport(_)));
    }
}
