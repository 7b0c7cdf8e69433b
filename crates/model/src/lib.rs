use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use serde_with;

pub mod help_request;
pub mod position;
pub mod role;
pub mod route;
pub mod screen;

pub use help_request::{HelpRequest, HelpType, RequestStatus};
pub use position::Coordinates;
pub use role::Role;
pub use route::{Place, Route, RouteQuery, RouteResult, TravelMode};
pub use screen::Screen;

/// A value together with its great-circle distance to some reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithDistance<T> {
    pub distance_km: f64,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithDistance<T> {
    pub fn new(distance_km: f64, content: T) -> Self {
        Self {
            distance_km,
            content,
        }
    }
}
