// ticket-backend-http/src/lib.rs
// ============================================================================
// Module: Ticket Backend HTTP Library
// Description: HTTPS implementation of ticket_core::BackendAdapter.
// Purpose: Talk to the remote ticketing backend over basic-auth HTTPS.
// Dependencies: ticket-core, reqwest
// ============================================================================

//! ## Overview
//! `HttpBackendAdapter` implements [`ticket_core::interfaces::BackendAdapter`]
//! against a ServiceNow-style table API (§6): HTTPS basic auth, a bounded
//! per-call timeout, `Accept`/`Content-Type: application/json` headers, and
//! `X-Total-Count` parsing on list reads. Every call opens no persistent
//! session state beyond the pooled [`reqwest::blocking::Client`]; field-name
//! translation and payload shaping live in `ticket-core` and are not
//! duplicated here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderValue;
use ticket_core::BackendAdapter;
use ticket_core::BackendError;
use ticket_core::RemoteResponse;
use tracing::debug;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`HttpBackendAdapter`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the table API, e.g. `https://instance.example/api/now/table`.
    pub base_url: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Per-call timeout in milliseconds. Defaults to 10,000 (§6).
    pub timeout_ms: u64,
}

impl HttpBackendConfig {
    /// Default per-call timeout, in milliseconds (§6).
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Stateless HTTPS adapter to the remote ticketing backend.
pub struct HttpBackendAdapter {
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    client: Client,
}

impl HttpBackendAdapter {
    /// Builds a new adapter from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: HttpBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
            timeout: Duration::from_millis(config.timeout_ms),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn build_response(response: reqwest::blocking::Response) -> Result<RemoteResponse, BackendError> {
        let status = response.status();
        let total_count = response
            .headers()
            .get("x-total-count")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let text = response.text().map_err(|error| BackendError::Transport(error.to_string()))?;
        let body: serde_json::Value = if text.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|error| BackendError::InvalidResponse(error.to_string()))?
        };

        Ok(RemoteResponse { status: status.as_u16(), total_count, body })
    }
}

impl BackendAdapter for HttpBackendAdapter {
    fn get(&self, path: &str) -> Result<RemoteResponse, BackendError> {
        debug!(path, "issuing backend get");
        let response = self
            .client
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .timeout(self.timeout)
            .send()
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        Self::build_response(response)
    }

    fn post(&self, path: &str, body: serde_json::Value) -> Result<RemoteResponse, BackendError> {
        debug!(path, "issuing backend post");
        let response = self
            .client
            .post(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        Self::build_response(response)
    }

    fn patch(&self, path: &str, body: serde_json::Value) -> Result<RemoteResponse, BackendError> {
        debug!(path, "issuing backend patch");
        let response = self
            .client
            .patch(self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        Self::build_response(response)
    }
}

/// Returns true when `status` is the expected success code for a create
/// (`201`) or update (`200`) call, matching the remote backend's documented
/// contract (§6).
#[must_use]
pub fn is_expected_write_status(status: u16, is_create: bool) -> bool {
    let expected = if is_create { StatusCode::CREATED } else { StatusCode::OK };
    StatusCode::from_u16(status).map(|actual| actual == expected).unwrap_or(false)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_relative_path() {
        let config = HttpBackendConfig {
            base_url: "https://instance.example/api/now/table/".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            timeout_ms: HttpBackendConfig::DEFAULT_TIMEOUT_MS,
        };
        let adapter = HttpBackendAdapter::new(config).expect("client must build");
        assert_eq!(adapter.url("u_dcu_ticket?limit=1"), "https://instance.example/api/now/table/u_dcu_ticket?limit=1");
    }

    #[test]
    fn is_expected_write_status_distinguishes_create_and_update() {
        assert!(is_expected_write_status(201, true));
        assert!(!is_expected_write_status(200, true));
        assert!(is_expected_write_status(200, false));
        assert!(!is_expected_write_status(201, false));
    }
}
