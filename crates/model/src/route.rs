use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Coordinates;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Transit,
    Walking,
}

/// Where a route should end: either free text the provider has to geocode,
/// or an exact point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    Address(String),
    Point(Coordinates),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub origin: Coordinates,
    pub destination: Place,
    pub mode: TravelMode,
    pub alternatives: bool,
}

impl RouteQuery {
    pub fn new(origin: Coordinates, destination: Place, mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            mode,
            alternatives: false,
        }
    }

    pub fn with_alternatives(mut self, alternatives: bool) -> Self {
        self.alternatives = alternatives;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub summary: String,
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Candidate routes in the provider's order of preference. An empty list
/// means the provider found no path for the requested mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub mode: TravelMode,
    pub routes: Vec<Route>,
}

impl RouteResult {
    pub fn new(mode: TravelMode, routes: Vec<Route>) -> Self {
        Self { mode, routes }
    }

    pub fn empty(mode: TravelMode) -> Self {
        Self::new(mode, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn best(&self) -> Option<&Route> {
        self.routes.first()
    }
}
