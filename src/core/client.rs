//! Session Client
//!
//! Information Hiding:
//! - URL layout and `session_id` query tagging hidden behind `BackendApi`
//! - Response envelope handling hidden; callers see payloads or `ClientError`
//! - The client holds no global state: everything comes from `ClientConfig`

use super::api::{
    decode_envelope, Acknowledgement, ChatReply, ChatRequest, DocumentDescriptor, DocumentList,
    HealthStatus, UploadReply,
};
use super::error::ClientError;
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A file to upload: its display name and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// The operations the conversation layer needs from the backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<ChatReply, ClientError>;

    async fn upload_document(&self, file: UploadFile) -> Result<DocumentDescriptor, ClientError>;

    async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, ClientError>;

    /// Drop every stored document and the index built over them.
    async fn clear_session(&self) -> Result<(), ClientError>;

    async fn health_check(&self) -> Result<HealthStatus, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    /// `None` talks to the backend's single implicit session.
    pub session_id: Option<String>,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            session_id: None,
        }
    }

    pub fn from_settings(settings: &Settings, session_id: Option<String>) -> Self {
        Self {
            api_url: settings.backend.api_url.clone(),
            timeout: settings.request_timeout(),
            session_id,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

pub struct SessionClient {
    client: Client,
    config: ClientConfig,
}

impl SessionClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.config.session_id.as_deref()
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), name)
    }

    fn scoped(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(self.config.timeout);
        match &self.config.session_id {
            Some(session_id) => request.query(&[("session_id", session_id.as_str())]),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let timeout = self.config.timeout;

        let response = self.scoped(request).send().await.map_err(|e| {
            tracing::warn!("[SessionClient] {} request failed: {}", operation, e);
            ClientError::from_reqwest(e, timeout)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(e, timeout))?;

        decode_envelope(status, &body).inspect_err(|e| {
            tracing::warn!("[SessionClient] {} failed (HTTP {}): {}", operation, status, e);
        })
    }
}

#[async_trait]
impl BackendApi for SessionClient {
    async fn send_message(&self, text: &str) -> Result<ChatReply, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "message cannot be empty".to_string(),
            ));
        }

        tracing::debug!("[SessionClient] Sending chat message ({} chars)", text.len());
        let request = self
            .client
            .post(self.endpoint("chat"))
            .json(&ChatRequest { message: text });

        self.execute("chat", request).await
    }

    async fn upload_document(&self, file: UploadFile) -> Result<DocumentDescriptor, ClientError> {
        tracing::info!(
            "[SessionClient] Uploading '{}' ({} bytes)",
            file.name,
            file.bytes.len()
        );

        let part = Part::bytes(file.bytes).file_name(file.name);
        let form = Form::new().part("file", part);
        let request = self.client.post(self.endpoint("upload")).multipart(form);

        let reply: UploadReply = self.execute("upload", request).await?;
        Ok(reply.document)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentDescriptor>, ClientError> {
        let request = self.client.get(self.endpoint("documents"));
        let list: DocumentList = self.execute("documents", request).await?;

        tracing::debug!("[SessionClient] Backend lists {} documents", list.documents.len());
        Ok(list.documents)
    }

    async fn clear_session(&self) -> Result<(), ClientError> {
        let request = self.client.post(self.endpoint("clear"));
        let _: Acknowledgement = self.execute("clear", request).await?;

        tracing::info!("[SessionClient] Backend session cleared");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, ClientError> {
        let request = self.client.get(self.endpoint("health"));
        self.execute("health", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = SessionClient::new(ClientConfig::new("http://localhost:5000/api/"));
        assert_eq!(client.endpoint("chat"), "http://localhost:5000/api/chat");

        let client = SessionClient::new(ClientConfig::new("http://localhost:5000/api"));
        assert_eq!(client.endpoint("health"), "http://localhost:5000/api/health");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings::from_defaults().unwrap();
        let config = ClientConfig::from_settings(&settings, Some("session_1_abc".to_string()));

        assert_eq!(config.api_url, crate::config::DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.session_id.as_deref(), Some("session_1_abc"));
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_request() {
        // Nothing listens here; an issued request would be a transport error.
        let client = SessionClient::new(
            ClientConfig::new("http://127.0.0.1:9/api").with_timeout(Duration::from_millis(200)),
        );

        let err = client.send_message("   ").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }
}
