//! `reqwest`-backed transport for the platform REST API.

use std::time::Duration;

use anyhow::Context;
use serde_json::Value;

use super::{sanitize_error_body, ApiMethod, ApiRequest, GatewayError, Transport};
use crate::config::ApiConfig;
use crate::credentials::AccessToken;

/// Bearer-authenticated HTTP transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_root: String,
    token: AccessToken,
}

impl HttpTransport {
    /// Create a transport for `<base_url>/api/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, token: AccessToken) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_root: format!("{}/api", config.base_url.trim_end_matches('/')),
            token,
        })
    }

    /// Full URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, GatewayError> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(&url),
            ApiMethod::Post => self.client.post(&url),
        }
        .bearer_auth(self.token.expose());

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_error_body(&body),
            });
        }

        decode_body(&body)
    }
}

/// Decode a successful response body. An empty body is a successful call
/// without payload and decodes to an empty object.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] if the body is not JSON.
pub fn decode_body(body: &str) -> Result<Value, GatewayError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_decode() {
        GatewayError::Decode(e.to_string())
    } else {
        GatewayError::Transport(sanitize_error_body(&e.to_string()))
    }
}
