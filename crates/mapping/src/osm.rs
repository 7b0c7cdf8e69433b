use std::time::Duration;

use async_trait::async_trait;
use model::{Coordinates, Place, Route, RouteQuery, RouteResult, TravelMode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{MappingError, MappingProvider, Result};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const OSRM_FOOT_URL: &str = "https://routing.openstreetmap.de/routed-foot";

/// Shorter input is not worth a search request.
pub const MIN_SUGGEST_CHARS: usize = 3;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsmConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    pub walking_profile: String,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            nominatim_url: NOMINATIM_URL.to_owned(),
            osrm_url: OSRM_FOOT_URL.to_owned(),
            walking_profile: "foot".to_owned(),
            user_agent: concat!("assist/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Clone, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    summary: String,
}

/// Geocoding through Nominatim and routing through an OSRM instance.
///
/// OSRM has no public transport profile, so transit queries always come back
/// empty and callers fall back to walking.
pub struct OsmProvider {
    pub config: OsmConfig,
    client: reqwest::Client,
}

impl OsmProvider {
    pub fn new(config: &OsmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    async fn fetch(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(reqwest::StatusCode, String)> {
        log::debug!("Requesting '{url}'.");
        let response = self.client.get(url).query(query).send().await?;
        let status_code = response.status();
        Ok((status_code, response.text().await?))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let (status_code, text) = self.fetch(url, query).await?;
        if status_code.is_success() {
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(MappingError::InvalidResponse {
                status_code,
                url: url.to_owned(),
                response: Some(text),
            })
        }
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.nominatim_url);
        self.get(
            &url,
            &[
                ("format", "jsonv2".to_owned()),
                ("limit", limit.to_string()),
                ("q", text.to_owned()),
            ],
        )
        .await
    }

    async fn locate_address(&self, address: &str) -> Result<Option<Coordinates>> {
        let hits = self.search(address, 1).await?;
        Ok(hits.into_iter().next().and_then(|hit| {
            match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
                (Ok(lat), Ok(lng)) => Some(Coordinates::new(lat, lng)),
                _ => None,
            }
        }))
    }

    async fn osrm_route(
        &self,
        from: Coordinates,
        to: Coordinates,
        alternatives: bool,
    ) -> Result<Vec<Route>> {
        let url = format!(
            "{}/route/v1/{}/{},{};{},{}",
            self.config.osrm_url,
            self.config.walking_profile,
            from.lng,
            from.lat,
            to.lng,
            to.lat,
        );
        let (status_code, text) = self
            .fetch(
                &url,
                &[
                    ("alternatives", alternatives.to_string()),
                    ("overview", "false".to_owned()),
                ],
            )
            .await?;

        // OSRM reports "no route" as a 400 with a json body
        let response: OsrmResponse = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(_) if !status_code.is_success() => {
                return Err(MappingError::InvalidResponse {
                    status_code,
                    url,
                    response: Some(text),
                })
            }
            Err(why) => return Err(why.into()),
        };

        match response.code.as_str() {
            "Ok" => Ok(response
                .routes
                .into_iter()
                .enumerate()
                .map(|(index, route)| Route {
                    summary: summarize(index, &route.legs),
                    distance_m: route.distance,
                    duration_s: route.duration,
                })
                .collect()),
            "NoRoute" | "NoSegment" => Ok(Vec::new()),
            other => Err(MappingError::Provider(
                response.message.unwrap_or_else(|| other.to_owned()),
            )),
        }
    }
}

fn summarize(index: usize, legs: &[OsrmLeg]) -> String {
    let summary = legs
        .iter()
        .map(|leg| leg.summary.trim())
        .filter(|summary| !summary.is_empty())
        .collect::<Vec<_>>()
        .join(" / ");
    if summary.is_empty() {
        format!("Route {}", index + 1)
    } else {
        summary
    }
}

#[async_trait]
impl MappingProvider for OsmProvider {
    async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<String>> {
        let url = format!("{}/reverse", self.config.nominatim_url);
        let response: ReverseResponse = self
            .get(
                &url,
                &[
                    ("format", "jsonv2".to_owned()),
                    ("lat", at.lat.to_string()),
                    ("lon", at.lng.to_string()),
                ],
            )
            .await?;
        Ok(response.display_name)
    }

    async fn route(&self, query: &RouteQuery) -> Result<RouteResult> {
        if query.mode == TravelMode::Transit {
            log::debug!("No transit routing available, answering with no routes.");
            return Ok(RouteResult::empty(TravelMode::Transit));
        }

        let destination = match &query.destination {
            Place::Point(point) => *point,
            Place::Address(address) => match self.locate_address(address).await? {
                Some(point) => point,
                None => {
                    log::info!("Could not find a place named '{address}'.");
                    return Ok(RouteResult::empty(query.mode));
                }
            },
        };

        let routes = self
            .osrm_route(query.origin, destination, query.alternatives)
            .await?;
        Ok(RouteResult::new(query.mode, routes))
    }

    async fn suggest(&self, partial: &str) -> Result<Vec<String>> {
        let partial = partial.trim();
        if partial.chars().count() < MIN_SUGGEST_CHARS {
            return Ok(Vec::new());
        }
        let hits = self.search(partial, MAX_SUGGESTIONS).await?;
        let mut names: Vec<String> = Vec::with_capacity(hits.len());
        for name in hits.into_iter().filter_map(|hit| hit.display_name) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    async fn reverse(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        if query.get("lat").map(String::as_str) == Some("51.5007") {
            Json(json!({ "display_name": "Westminster Bridge, London" }))
        } else {
            Json(json!({ "error": "Unable to geocode" }))
        }
    }

    async fn search(Query(query): Query<HashMap<String, String>>) -> impl IntoResponse {
        match query.get("q").map(String::as_str) {
            Some("Central Station") => {
                Json(json!([{ "lat": "51.5308", "lon": "-0.1238", "display_name": "Central Station" }]))
            }
            Some("Cent") => {
                assert_eq!(query.get("limit").map(String::as_str), Some("5"));
                Json(json!([
                    { "lat": "51.5308", "lon": "-0.1238", "display_name": "Central Station" },
                    { "lat": "51.5308", "lon": "-0.1238", "display_name": "Central Station" },
                    { "lat": "51.5155", "lon": "-0.0922", "display_name": "Central Criminal Court" },
                    { "lat": "51.5100", "lon": "-0.1300" }
                ]))
            }
            _ => Json(json!([])),
        }
    }

    async fn route(Path((profile, coordinates)): Path<(String, String)>) -> impl IntoResponse {
        assert_eq!(profile, "foot");
        if coordinates.ends_with("0,0") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "code": "NoRoute", "message": "Impossible route" })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "code": "Ok",
                "routes": [
                    { "distance": 3400.0, "duration": 2500.0, "legs": [{ "summary": "Whitehall, Charing Cross Road" }] },
                    { "distance": 3900.0, "duration": 2800.0, "legs": [{ "summary": "" }] }
                ]
            })),
        )
    }

    async fn provider() -> OsmProvider {
        let routes = Router::new()
            .route("/reverse", get(reverse))
            .route("/search", get(search))
            .route("/route/v1/:profile/:coordinates", get(route));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes.into_make_service())
                .await
                .unwrap();
        });

        OsmProvider::new(&OsmConfig {
            nominatim_url: format!("http://{address}"),
            osrm_url: format!("http://{address}"),
            ..Default::default()
        })
        .unwrap()
    }

    fn westminster() -> Coordinates {
        Coordinates::new(51.5007, -0.1246)
    }

    #[tokio::test]
    async fn reverse_geocodes_known_positions() {
        let provider = provider().await;

        let address = provider.reverse_geocode(westminster()).await.unwrap();
        assert_eq!(address.as_deref(), Some("Westminster Bridge, London"));

        let nowhere = provider
            .reverse_geocode(Coordinates::new(0.0, 0.0))
            .await
            .unwrap();
        assert_eq!(nowhere, None);
    }

    #[tokio::test]
    async fn walking_route_to_an_address() {
        let provider = provider().await;
        let query = RouteQuery::new(
            westminster(),
            Place::Address("Central Station".to_owned()),
            TravelMode::Walking,
        )
        .with_alternatives(true);

        let result = provider.route(&query).await.unwrap();
        assert_eq!(result.mode, TravelMode::Walking);
        assert_eq!(result.routes.len(), 2);
        assert_eq!(result.routes[0].summary, "Whitehall, Charing Cross Road");
        assert_eq!(result.routes[1].summary, "Route 2");
        assert_eq!(result.routes[0].distance_m, 3400.0);
    }

    #[tokio::test]
    async fn unknown_address_and_no_route_are_empty() {
        let provider = provider().await;

        let unknown = RouteQuery::new(
            westminster(),
            Place::Address("Atlantis".to_owned()),
            TravelMode::Walking,
        );
        assert!(provider.route(&unknown).await.unwrap().is_empty());

        let unreachable = RouteQuery::new(
            westminster(),
            Place::Point(Coordinates::new(0.0, 0.0)),
            TravelMode::Walking,
        );
        assert!(provider.route(&unreachable).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggests_distinct_place_names() {
        let provider = provider().await;

        let names = provider.suggest(" Cent ").await.unwrap();
        assert_eq!(names, vec!["Central Station", "Central Criminal Court"]);
        assert!(provider.suggest("Atlantis").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transit_is_answered_without_a_request() {
        // nothing listens on port 9, any request would fail
        let provider = OsmProvider::new(&OsmConfig {
            nominatim_url: "http://127.0.0.1:9".to_owned(),
            osrm_url: "http://127.0.0.1:9".to_owned(),
            ..Default::default()
        })
        .unwrap();
        let query = RouteQuery::new(
            westminster(),
            Place::Address("Central Station".to_owned()),
            TravelMode::Transit,
        );

        let result = provider.route(&query).await.unwrap();
        assert_eq!(result, RouteResult::empty(TravelMode::Transit));
        assert!(provider.suggest("Ce").await.unwrap().is_empty());
    }
}
