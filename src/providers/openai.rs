use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error};
use parking_lot::Mutex;
use reqwest::Client;

use crate::errors::ProviderError;
use super::{ChatRequest, Provider, RawResponse};

/// Public endpoint used when no base URL is configured
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAI {
    /// HTTP client, created on first use and dropped by `close`
    client: Mutex<Option<Client>>,
    /// API key for authentication
    api_key: String,
    /// Base URL including the version segment
    endpoint: String,
    /// Transport-level timeout
    timeout: Duration,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.client.lock().is_some())
            .finish()
    }
}

impl OpenAI {
    /// Create a new client; an empty endpoint selects the public API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim().trim_end_matches('/').to_string()
        };

        Self {
            client: Mutex::new(None),
            api_key: api_key.into(),
            endpoint,
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a pooled HTTP client is currently held
    pub fn is_connected(&self) -> bool {
        self.client.lock().is_some()
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    fn client(&self) -> Result<Client, ProviderError> {
        let mut guard = self.client.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;
        *guard = Some(client.clone());
        Ok(client)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout { secs: self.timeout.as_secs() }
        } else if e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }
}

/// True when a body looks like a web page rather than API output
pub fn looks_like_html(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.starts_with("<!doctype") || lower.contains("<html")
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: ChatRequest) -> Result<RawResponse, ProviderError> {
        let client = self.client()?;
        let url = self.completions_url();
        debug!("POST {} (model {})", url, request.model);

        let response = client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            if looks_like_html(&body) {
                error!("Endpoint {} answered {} with an HTML page", url, status);
                return Err(ProviderError::MisconfiguredEndpoint);
            }
            let message: String = body.trim().chars().take(500).collect();
            error!("API error ({}): {}", status, message);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        Ok(RawResponse::from_body(&body))
    }

    async fn close(&self) {
        if self.client.lock().take().is_some() {
            debug!("Released HTTP client for {}", self.endpoint);
        }
    }
}
