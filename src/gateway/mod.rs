//! Remote Gateway
//!
//! Generic request/response seam used by every other component to reach the
//! Crypto Advisor backend and the third-party price provider.
//!
//! ## Layers
//!
//! - [`RemoteGateway`]: transport contract, returns status + JSON payload or
//!   a [`GatewayError`] when the remote could not be reached
//! - [`GatewayResponse::decode`]: classifies a response into a typed value or
//!   a [`RemoteError`] (authorization, domain, malformed)
//! - [`HttpGateway`]: reqwest-backed implementation

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::{HttpGateway, HttpGatewayConfig};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// HTTP method used by a gateway request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request routed through a gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: Method,
    /// Path relative to the gateway's base URL, including any query string
    pub path: String,
    pub body: Option<Value>,
    pub auth_token: Option<String>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).body(body)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach the session token, if any
    pub fn auth(mut self, token: Option<&str>) -> Self {
        self.auth_token = token.map(str::to_string);
        self
    }
}

/// Status and payload of a completed request
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    /// Parsed JSON body; a non-JSON body is carried as a string, an empty one as null
    pub payload: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, payload: Value) -> Self {
        Self { status, payload }
    }

    pub fn ok(payload: Value) -> Self {
        Self::new(200, payload)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Human-readable error reported by the server, if the body carries one
    pub fn error_message(&self) -> Option<String> {
        match &self.payload {
            Value::Object(map) => map
                .get("error")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        }
    }

    /// Check the status and deserialize the payload
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, RemoteError> {
        self.ensure_success()?;
        serde_json::from_value(self.payload).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    /// Check the status, discarding the payload
    pub fn ensure_success(&self) -> Result<(), RemoteError> {
        if self.is_unauthorized() {
            return Err(RemoteError::Unauthorized {
                message: self.error_message(),
            });
        }
        if !self.is_success() {
            return Err(RemoteError::Domain {
                status: self.status,
                message: self.error_message(),
            });
        }
        Ok(())
    }
}

/// Transport contract shared by the backend and the price provider
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Perform a request and return the raw status and payload
    async fn request(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}

/// The remote could not be reached or did not answer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Remote unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Classified failure of a typed remote call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Network unreachable, timeout, or similar
    #[error("Transport failure: {0}")]
    Transport(#[from] GatewayError),

    /// HTTP 401
    #[error("Authorization rejected")]
    Unauthorized { message: Option<String> },

    /// Well-formed non-success response
    #[error("Remote returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Domain {
        status: u16,
        message: Option<String>,
    },

    /// Success status with a payload of the wrong shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized { .. })
    }

    /// Transport and malformed-payload failures are handled alike by callers
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_) | RemoteError::Malformed(_))
    }

    /// Server-reported message, when one exists
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RemoteError::Unauthorized { message } | RemoteError::Domain { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}
