//! HTTP Gateway
//!
//! reqwest-backed [`RemoteGateway`] used for both the backend and the price
//! provider (one instance per base URL).

use super::{GatewayError, GatewayRequest, GatewayResponse, Method, RemoteGateway};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Configuration for an HTTP gateway
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL every request path is appended to (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 10_000,
            user_agent: format!("crypto-advisor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Gateway performing real HTTP requests
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// Create a new gateway with the given configuration
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

fn classify(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::Unavailable
    } else {
        GatewayError::Request(e.to_string())
    }
}

/// Interpret a response body: JSON when it parses, raw text otherwise
fn parse_payload(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn request(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let url = self.url_for(&request.path);
        let request_id = uuid::Uuid::new_v4();
        let started = std::time::Instant::now();

        let mut builder = self.client.request(request.method.into(), &url);
        if let Some(token) = &request.auth_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = classify(e);
            tracing::debug!(
                request_id = %request_id,
                method = %request.method,
                url = %url,
                error = %err,
                "Gateway request failed"
            );
            err
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(classify)?;

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gateway request completed"
        );

        Ok(GatewayResponse::new(status, parse_payload(&bytes)))
    }
}
