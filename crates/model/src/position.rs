use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        geo::is_valid_position(self.lat, self.lng)
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        geo::haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// Numeric label used when no address could be resolved.
    pub fn label(&self) -> String {
        geo::format_position(self.lat, self.lng)
    }
}
