use std::error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub mod client;
pub mod protocol;

pub use client::{GatewayConfig, HttpGateway};
pub use protocol::{GatewayRequest, GatewayResponse, Password};

/// Everything that can go wrong between the client and the gateway. All
/// variants are treated alike by callers: the gateway is unavailable.
#[derive(Debug, Clone)]
pub enum GatewayError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    Timeout {
        url: String,
    },
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl error::Error for GatewayError {}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GatewayError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            GatewayError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            GatewayError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            GatewayError::Timeout { url } => write!(f, "Request to {} timed out.", url),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout {
                url: e.url().map(|url| url.to_string()).unwrap_or_default(),
            }
        } else {
            GatewayError::RequestError(Arc::new(e))
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::JsonError(Arc::new(e))
    }
}

/// The single remote endpoint handling authentication and request storage.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse>;
}
