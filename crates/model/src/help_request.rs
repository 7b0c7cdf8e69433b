use std::{fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{Coordinates, WithDistance};

/// The kind of assistance a passenger asks for. Values the client does not
/// know are kept as `Other` instead of failing the whole feed.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HelpType {
    #[default]
    Mobility,
    Visual,
    Hearing,
    Companion,
    #[serde(other)]
    Other,
}

impl HelpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobility => "mobility",
            Self::Visual => "visual",
            Self::Hearing => "hearing",
            Self::Companion => "companion",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for HelpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HelpType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "mobility" => Self::Mobility,
            "visual" => Self::Visual,
            "hearing" => Self::Hearing,
            "companion" => Self::Companion,
            _ => Self::Other,
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Open,
    Accepted,
    Completed,
    Cancelled,
}

/// A passenger's request for assistance as stored by the gateway. The
/// client only ever holds short-lived copies of it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    #[serde(default)]
    pub id: Option<Id<HelpRequest>>,
    #[serde(default, rename = "email")]
    pub requester: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub help_type: HelpType,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub status: RequestStatus,
}

impl HasId for HelpRequest {
    type IdType = String;
}

impl HelpRequest {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }

    pub fn with_distance_to(self, from: &Coordinates) -> WithDistance<Self> {
        let distance = from.distance_km(&self.coordinates);
        WithDistance::new(distance, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sparse_feed_entries() {
        let json = r#"{"destination":"Central Station","helpType":"visual","lat":51.5,"lng":-0.12}"#;
        let request: HelpRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.destination, "Central Station");
        assert_eq!(request.help_type, HelpType::Visual);
        assert_eq!(request.coordinates, Coordinates::new(51.5, -0.12));
        assert_eq!(request.status, RequestStatus::Open);
        assert!(request.id.is_none());
        assert!(request.requester.is_none());
    }

    #[test]
    fn unknown_help_types_become_other() {
        let json = r#"{"id":"r1","email":"ann@example.org","destination":"Pier","helpType":"guide dog","lat":1.0,"lng":2.0,"status":"accepted"}"#;
        let request: HelpRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.help_type, HelpType::Other);
        assert_eq!(request.status, RequestStatus::Accepted);
        assert_eq!(request.requester.as_deref(), Some("ann@example.org"));
        assert_eq!(request.id.map(|id| id.into_raw()), Some("r1".to_owned()));
    }
}
