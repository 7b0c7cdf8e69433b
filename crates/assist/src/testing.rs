//! Hand-written stand-ins for the gateway, the mapping provider and the
//! position source.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use gateway::{Gateway, GatewayError, GatewayRequest, GatewayResponse};
use mapping::{MappingError, MappingProvider};
use model::{Coordinates, HelpRequest, HelpType, RouteQuery, RouteResult, TravelMode};

use crate::location::{PositionError, PositionSource};

/// Answers every call with `{"success": true}` unless a response was
/// scripted for its action. Records every request it receives.
#[derive(Default)]
pub struct FakeGateway {
    scripted: Mutex<HashMap<&'static str, VecDeque<gateway::Result<GatewayResponse>>>>,
    requests: Mutex<Vec<GatewayRequest>>,
    unreachable: bool,
    panics: bool,
    delay: Option<Duration>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues `response` for the next call of `action`.
    pub fn respond(self, action: &'static str, response: gateway::Result<GatewayResponse>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(action)
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_feed(self, requests: Vec<HelpRequest>) -> Self {
        self.respond("get_requests", Ok(GatewayResponse::with_requests(requests)))
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn sent(&self, action: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.action() == action)
            .count()
    }
}

pub fn gateway_down() -> GatewayError {
    GatewayError::Timeout {
        url: "http://gateway.test/".to_owned(),
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn send(&self, request: GatewayRequest) -> gateway::Result<GatewayResponse> {
        let action = request.action();
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("gateway exploded on {action}");
        }
        if self.unreachable {
            return Err(gateway_down());
        }
        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(action)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(GatewayResponse::ok()))
    }
}

/// Routes from a fixed table keyed by travel mode, empty for anything else.
#[derive(Default)]
pub struct FakeMapping {
    address: Option<String>,
    geocoder_fails: bool,
    routes: HashMap<TravelMode, RouteResult>,
    router_fails: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<RouteQuery>>,
    places: Vec<String>,
}

impl FakeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn failing_geocoder(mut self) -> Self {
        self.geocoder_fails = true;
        self
    }

    pub fn with_route(mut self, mode: TravelMode, route: RouteResult) -> Self {
        self.routes.insert(mode, route);
        self
    }

    /// Routing and place search both fail.
    pub fn failing_router(mut self) -> Self {
        self.router_fails = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Places offered as completions of any case-insensitive prefix.
    pub fn with_places<I, S>(mut self, places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.places = places.into_iter().map(Into::into).collect();
        self
    }

    pub fn queries(&self) -> Vec<RouteQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MappingProvider for FakeMapping {
    async fn reverse_geocode(&self, _at: Coordinates) -> mapping::Result<Option<String>> {
        if self.geocoder_fails {
            return Err(MappingError::Provider("geocoder offline".to_owned()));
        }
        Ok(self.address.clone())
    }

    async fn route(&self, query: &RouteQuery) -> mapping::Result<RouteResult> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.router_fails {
            return Err(MappingError::Provider("router offline".to_owned()));
        }
        Ok(self
            .routes
            .get(&query.mode)
            .cloned()
            .unwrap_or_else(|| RouteResult::empty(query.mode)))
    }

    async fn suggest(&self, partial: &str) -> mapping::Result<Vec<String>> {
        if self.router_fails {
            return Err(MappingError::Provider("search offline".to_owned()));
        }
        let partial = partial.trim().to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|place| place.to_lowercase().starts_with(&partial))
            .cloned()
            .collect())
    }
}

pub struct ScriptedPosition(pub Result<Coordinates, PositionError>);

impl ScriptedPosition {
    pub fn denied() -> Self {
        Self(Err(PositionError::Denied))
    }
}

#[async_trait]
impl PositionSource for ScriptedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        self.0
    }
}

/// Gives the scripted answers in order. `None`, or running out of answers,
/// means the device never answers.
pub struct SteppedPosition(Mutex<VecDeque<Option<Result<Coordinates, PositionError>>>>);

impl SteppedPosition {
    pub fn new<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = Option<Result<Coordinates, PositionError>>>,
    {
        Self(Mutex::new(steps.into_iter().collect()))
    }
}

#[async_trait]
impl PositionSource for SteppedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        let step = self.0.lock().unwrap().pop_front().flatten();
        match step {
            Some(answer) => answer,
            None => std::future::pending().await,
        }
    }
}

/// Never answers.
pub struct HangingPosition;

#[async_trait]
impl PositionSource for HangingPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        std::future::pending().await
    }
}

pub fn open_request(destination: &str, at: Coordinates) -> HelpRequest {
    HelpRequest {
        id: Some(utility::id::Id::new(format!("req-{destination}"))),
        requester: Some("pat@example.org".to_owned()),
        destination: destination.to_owned(),
        help_type: HelpType::Visual,
        coordinates: at,
        status: Default::default(),
    }
}
