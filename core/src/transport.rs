//! Server Transport
//!
//! HTTP access to the chat server, behind a trait so the client can be
//! exercised against an in-memory fake.
//!
//! # Endpoints
//!
//! - `POST /api/send` - submit a message, streamed response
//! - `GET  /api/new` - start a new conversation
//! - `GET  /api/history` - conversation index
//! - `GET  /api/history/<id>` - one stored conversation
//! - `POST /api/toggle-search` - persist the web-search preference

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::protocol::{
    ErrorBody, ExchangeRecord, HistoryEntry, NewConversation, OutgoingRequest,
};

/// Raw byte chunks of a streamed response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Access to the chat server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit a message. Returns the response byte stream on an OK
    /// status, a [`ClientError::Server`] built from the error body
    /// otherwise.
    async fn send(&self, request: &OutgoingRequest) -> Result<ByteStream, ClientError>;

    /// Ask the server for a fresh conversation id.
    async fn new_conversation(&self) -> Result<Option<String>, ClientError>;

    /// Fetch the conversation index, newest first.
    async fn history_index(&self) -> Result<Vec<HistoryEntry>, ClientError>;

    /// Fetch one stored conversation.
    async fn conversation(&self, id: &str) -> Result<Vec<ExchangeRecord>, ClientError>;

    /// Persist the web-search preference server-side.
    async fn set_web_search(&self, enabled: bool) -> Result<(), ClientError>;
}

/// HTTP transport backed by reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(120))
    }

    /// Create a transport with an explicit whole-request timeout.
    ///
    /// The timeout covers the full streamed body, so it should leave
    /// room for search plus model generation.
    #[must_use]
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create a transport from configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_timeout(config.server_url.clone(), config.request_timeout)
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_url(&self) -> String {
        format!("{}/api/send", self.base_url)
    }

    fn new_url(&self) -> String {
        format!("{}/api/new", self.base_url)
    }

    fn history_url(&self) -> String {
        format!("{}/api/history", self.base_url)
    }

    fn conversation_url(&self, id: &str) -> String {
        format!("{}/api/history/{id}", self.base_url)
    }

    fn toggle_search_url(&self) -> String {
        format!("{}/api/toggle-search", self.base_url)
    }

    /// Turn a non-OK response into a structured error.
    async fn error_from_response(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        parse_error_body(status, &body)
    }

    /// GET a JSON endpoint and decode the body.
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ClientError> {
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::network(&e))?;
        serde_json::from_str(&body).map_err(|e| ClientError::Unexpected(e.to_string()))
    }
}

/// Build a [`ClientError::Server`] from a non-OK status and body.
///
/// The body is expected to be `{"error": "..."}`; anything else falls
/// back to a generic message carrying the status code.
#[must_use]
pub fn parse_error_body(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| format!("the server returned an error (status {status})"));
    ClientError::Server { status, message }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutgoingRequest) -> Result<ByteStream, ClientError> {
        let response = self
            .http_client
            .post(self.send_url())
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(response
            .bytes_stream()
            .map_err(|e| ClientError::network(&e))
            .boxed())
    }

    async fn new_conversation(&self) -> Result<Option<String>, ClientError> {
        let created: NewConversation = self.get_json(self.new_url()).await?;
        Ok(created.conversation_id)
    }

    async fn history_index(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        self.get_json(self.history_url()).await
    }

    async fn conversation(&self, id: &str) -> Result<Vec<ExchangeRecord>, ClientError> {
        self.get_json(self.conversation_url(id)).await
    }

    async fn set_web_search(&self, enabled: bool) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(self.toggle_search_url())
            .json(&serde_json::json!({ "enable_web_search": enabled }))
            .send()
            .await
            .map_err(|e| ClientError::network(&e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let transport = HttpTransport::new("http://localhost:5000/");
        assert_eq!(transport.base_url(), "http://localhost:5000");
        assert_eq!(transport.send_url(), "http://localhost:5000/api/send");
        assert_eq!(transport.new_url(), "http://localhost:5000/api/new");
        assert_eq!(transport.history_url(), "http://localhost:5000/api/history");
        assert_eq!(
            transport.conversation_url("c1"),
            "http://localhost:5000/api/history/c1"
        );
        assert_eq!(
            transport.toggle_search_url(),
            "http://localhost:5000/api/toggle-search"
        );
    }

    #[test]
    fn test_parse_error_body_with_message() {
        let err = parse_error_body(429, r#"{"error":"rate limited"}"#);
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected a server error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_body_fallback() {
        for body in ["", "not json", "{}", r#"{"error":null}"#] {
            let err = parse_error_body(500, body);
            match err {
                ClientError::Server { status, message } => {
                    assert_eq!(status, 500);
                    assert!(message.contains("500"), "body: {body}");
                }
                other => panic!("expected a server error, got {other:?}"),
            }
        }
    }
}
