//! # Invoice Client SDK
//!
//! A typed Rust client for the invoice automator's HTTP triggers.

use invoice_types::{
    ConnectionReport, HealthResponse, PreCacheOutcome, StatusResponse, TriggerResponse,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

/// Header carrying the trigger token on protected endpoints.
pub const TRIGGER_TOKEN_HEADER: &str = "x-trigger-token";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invoice automator API client.
pub struct InvoiceClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl InvoiceClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Sets the trigger token sent on protected endpoints.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Fetches the health document. Needs no token.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.send(Method::GET, "/health").await
    }

    /// Runs the monthly invoice now.
    pub async fn trigger(&self) -> Result<TriggerResponse, ClientError> {
        self.send(Method::POST, "/trigger").await
    }

    /// Fetches and caches today's exchange rate.
    pub async fn precache(&self) -> Result<PreCacheOutcome, ClientError> {
        self.send(Method::POST, "/precache").await
    }

    /// Runs the server-side connection test.
    pub async fn test_connections(&self) -> Result<ConnectionReport, ClientError> {
        self.send(Method::GET, "/test").await
    }

    /// Current sequence position and cached rate.
    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.send(Method::GET, "/status").await
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            req = req.header(TRIGGER_TOKEN_HEADER, token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
