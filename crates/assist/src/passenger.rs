use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use gateway::{Gateway, GatewayRequest, GatewayResponse};
use mapping::MappingProvider;
use model::{Coordinates, Place, RouteQuery, RouteResult, TravelMode};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    effect::{Effect, Ticket},
    location::{FixSource, LocationError, LocationProvider},
    AppError, Result,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocationStatus {
    #[default]
    Unknown,
    Located {
        coordinates: Coordinates,
        label: String,
        source: FixSource,
    },
    Failed {
        reason: String,
    },
}

impl LocationStatus {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            LocationStatus::Located { coordinates, .. } => Some(*coordinates),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePreview {
    pub destination: String,
    pub origin: Coordinates,
    pub route: RouteResult,
}

/// Outcome of handing a help request to the gateway. A failed submission is
/// a result, not an error: the passenger keeps the preview and may retry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub ok: bool,
    pub error: Option<String>,
    pub submitted_at: DateTime<Local>,
}

impl SubmissionResult {
    pub fn from_response(response: &gateway::Result<GatewayResponse>) -> Self {
        let error = match response {
            Ok(response) => response.rejection(),
            Err(why) => Some(why.to_string()),
        };
        Self {
            ok: error.is_none(),
            error,
            submitted_at: Local::now(),
        }
    }
}

/// Everything the passenger side shows between locating and submitting.
#[derive(Debug, Clone, Default)]
pub struct PassengerFlow {
    pub location: LocationStatus,
    pub preview: Option<RoutePreview>,
    pub submission: Option<SubmissionResult>,
    /// Completions for the destination typed last.
    pub suggestions: Vec<String>,
}

impl PassengerFlow {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.coordinates()
    }

    /// Drops the route and submission, keeps the location.
    pub fn discard_preview(&mut self) {
        self.preview = None;
        self.submission = None;
    }
}

/// Asks for a transit route first. When the provider has none, tries once
/// more on foot, without alternatives.
pub async fn plan_route(
    mapping: &dyn MappingProvider,
    origin: Coordinates,
    destination: &str,
    alternatives: bool,
) -> Result<RouteResult> {
    let place = Place::Address(destination.to_owned());

    let transit = RouteQuery::new(origin, place.clone(), TravelMode::Transit)
        .with_alternatives(alternatives);
    let result = mapping.route(&transit).await?;
    if !result.is_empty() {
        return Ok(result);
    }

    log::info!("No transit route to '{destination}', trying walking directions.");
    let walking = RouteQuery::new(origin, place, TravelMode::Walking);
    let result = mapping.route(&walking).await?;
    if result.is_empty() {
        return Err(AppError::RouteNotFound);
    }
    Ok(result)
}

pub struct LocateTask {
    pub(crate) ticket: Ticket,
    pub(crate) location: Arc<LocationProvider>,
    pub(crate) cancel: CancellationToken,
}

pub type LocateOutput = std::result::Result<LocationStatus, LocationError>;

#[async_trait]
impl Effect for LocateTask {
    type Output = LocateOutput;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> LocateOutput {
        let fix = self.location.current_location(&self.cancel).await?;
        let label = match fix.source {
            FixSource::Device => self.location.describe(fix.coordinates).await,
            FixSource::Fallback => format!(
                "GPS unavailable, using default location ({})",
                fix.coordinates.label()
            ),
        };
        Ok(LocationStatus::Located {
            coordinates: fix.coordinates,
            label,
            source: fix.source,
        })
    }
}

pub struct SuggestTask {
    pub(crate) ticket: Ticket,
    pub(crate) mapping: Arc<dyn MappingProvider>,
    pub(crate) partial: String,
}

#[async_trait]
impl Effect for SuggestTask {
    type Output = Result<Vec<String>>;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> Result<Vec<String>> {
        Ok(self.mapping.suggest(&self.partial).await?)
    }
}

pub struct RouteTask {
    pub(crate) ticket: Ticket,
    pub(crate) mapping: Arc<dyn MappingProvider>,
    pub(crate) origin: Coordinates,
    pub(crate) destination: String,
    pub(crate) alternatives: bool,
}

#[async_trait]
impl Effect for RouteTask {
    type Output = Result<RoutePreview>;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> Result<RoutePreview> {
        let route = plan_route(
            self.mapping.as_ref(),
            self.origin,
            &self.destination,
            self.alternatives,
        )
        .await?;
        Ok(RoutePreview {
            destination: self.destination,
            origin: self.origin,
            route,
        })
    }
}

pub struct SubmitTask {
    pub(crate) ticket: Ticket,
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) request: GatewayRequest,
}

#[async_trait]
impl Effect for SubmitTask {
    type Output = SubmissionResult;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> SubmissionResult {
        let response = self.gateway.send(self.request).await;
        let result = SubmissionResult::from_response(&response);
        if let Some(why) = &result.error {
            log::warn!("Help request was not stored: {why}");
        }
        result
    }
}
