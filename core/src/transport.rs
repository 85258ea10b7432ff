use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::errors::{ChatError, ChatResult};
use crate::types::{ArchivedMessage, FeedbackRecord, RequestPayload};

/// Delivers a conversation request and returns the backend's raw JSON reply
#[async_trait]
pub trait ChatTransport: Send + Sync + Debug {
    async fn send(&self, payload: &RequestPayload) -> ChatResult<Value>;
}

/// Delivers one feedback record; `Ok` means the endpoint accepted it
#[async_trait]
pub trait FeedbackTransport: Send + Sync + Debug {
    async fn submit(&self, record: &FeedbackRecord) -> ChatResult<()>;
}

/// Best-effort sink for every message appended to a conversation
#[async_trait]
pub trait MessageArchive: Send + Sync + Debug {
    async fn archive(&self, message: &ArchivedMessage) -> ChatResult<()>;
}

/// Builds the shared HTTP client with the configured timeouts
pub fn build_http_client(config: &ClientConfig) -> ChatResult<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(|e| ChatError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// HTTP client for the suggestion webhook and the feedback endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    chat_endpoint: String,
    feedback_endpoint: String,
}

impl HttpBackend {
    pub fn new(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            chat_endpoint: config.chat_endpoint().to_string(),
            feedback_endpoint: config.feedback_endpoint().to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> ChatResult<Self> {
        Ok(Self::new(build_http_client(config)?, config))
    }

    pub fn chat_endpoint(&self) -> &str {
        &self.chat_endpoint
    }

    pub fn feedback_endpoint(&self) -> &str {
        &self.feedback_endpoint
    }
}

/// POST a JSON body and fail on any non-success status
async fn post_json<T: serde::Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &T,
) -> ChatResult<reqwest::Response> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| ChatError::RequestError(format!("Failed to send request: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(ChatError::HttpError {
            status_code: status.as_u16(),
            message: format!("Request to {} failed: {}", url, error_body),
        });
    }

    Ok(response)
}

#[async_trait]
impl ChatTransport for HttpBackend {
    #[instrument(skip(self, payload), fields(session_id = %payload.session_id, message_id = %payload.message_id))]
    async fn send(&self, payload: &RequestPayload) -> ChatResult<Value> {
        debug!("Sending chat request to {}", self.chat_endpoint);
        let response = post_json(&self.client, &self.chat_endpoint, payload).await?;

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ChatError::ParsingError(format!("Failed to parse reply: {}", e)))?;
        debug!("Received reply from suggestion backend");
        Ok(body)
    }
}

#[async_trait]
impl FeedbackTransport for HttpBackend {
    #[instrument(skip(self, record), fields(message_id = %record.message_id, is_helpful = record.is_helpful))]
    async fn submit(&self, record: &FeedbackRecord) -> ChatResult<()> {
        post_json(&self.client, &self.feedback_endpoint, record).await?;
        debug!("Feedback accepted");
        Ok(())
    }
}

/// HTTP sink posting messages to an archive endpoint
#[derive(Debug, Clone)]
pub struct HttpMessageArchive {
    client: Client,
    endpoint: String,
}

impl HttpMessageArchive {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl MessageArchive for HttpMessageArchive {
    async fn archive(&self, message: &ArchivedMessage) -> ChatResult<()> {
        post_json(&self.client, &self.endpoint, message).await?;
        debug!(message_id = %message.message_id, "Message archived");
        Ok(())
    }
}
