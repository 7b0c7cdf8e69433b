use std::error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use model::{Coordinates, RouteQuery, RouteResult};

pub mod osm;

pub use osm::{OsmConfig, OsmProvider};

#[derive(Debug, Clone)]
pub enum MappingError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    /// The provider answered, but with a failure it reports itself.
    Provider(String),
}

pub type Result<T> = std::result::Result<T, MappingError>;

impl error::Error for MappingError {}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MappingError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            MappingError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            MappingError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            MappingError::Provider(why) => write!(f, "Mapping provider error: {}", why),
        }
    }
}

impl From<reqwest::Error> for MappingError {
    fn from(e: reqwest::Error) -> Self {
        MappingError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(e: serde_json::Error) -> Self {
        MappingError::JsonError(Arc::new(e))
    }
}

/// Geocoding and routing as consumed by the client. Drawing routes is left
/// to the presentation layer.
#[async_trait]
pub trait MappingProvider: Send + Sync {
    /// Street address for a position. `Ok(None)` means the provider knows no
    /// address there.
    async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<String>>;

    /// Candidate routes for a query. An empty result is not an error.
    async fn route(&self, query: &RouteQuery) -> Result<RouteResult>;

    /// Place names completing what was typed into the destination field.
    async fn suggest(&self, partial: &str) -> Result<Vec<String>>;
}
