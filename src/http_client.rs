//! HTTP client abstraction for external API communication.
//!
//! Both the generation service and Google Drive are reached through the
//! [`HttpClient`] trait, so tests can substitute scripted responses without
//! making real network requests.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use thiserror::Error;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Builds a response from raw body bytes, rejecting anything that is not
    /// UTF-8 instead of decoding it lossily.
    pub fn from_bytes(status: u16, body: Vec<u8>) -> Result<Self, HttpError> {
        let body = String::from_utf8(body).map_err(|_| HttpError::NotUtf8 { status })?;
        Ok(Self { status, body })
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure: no response was received.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Transport(String),

    /// A response arrived but its body is not UTF-8 text.
    #[error("response body (HTTP {status}) is not valid UTF-8 text")]
    NotUtf8 { status: u16 },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::Transport(err.to_string())
        }
    }
}

/// Trait for HTTP communication with external APIs.
///
/// Non-2xx statuses are not errors at this layer; callers inspect
/// [`HttpResponse::status`] and decide.
///
/// # Example
///
/// ```ignore
/// use docdraft::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new(std::time::Duration::from_secs(30))?;
/// let response = client.post_json(
///     "https://api.example.com/endpoint",
///     &[("content-type", "application/json")],
///     &serde_json::json!({"key": "value"}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns status and body.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError>;

    /// Sends a POST request with a JSON body.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, HttpError>;

    /// Sends a POST request with a raw body (media uploads). The content type
    /// comes from `headers`.
    async fn post_bytes(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError>;
}

/// HTTP client implementation using reqwest.
///
/// Every request is bounded by the timeout given at construction.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn send(mut request: RequestBuilder, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        HttpResponse::from_bytes(status, body.to_vec())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, HttpError> {
        Self::send(self.client.get(url), headers).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, HttpError> {
        Self::send(self.client.post(url).json(body), headers).await
    }

    async fn post_bytes(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        Self::send(self.client.post(url).body(body), headers).await
    }
}
