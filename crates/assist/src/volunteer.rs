use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use gateway::{Gateway, GatewayRequest, GatewayResponse};
use mapping::MappingProvider;
use model::{Coordinates, HelpRequest, Place, RouteQuery, RouteResult, TravelMode, WithDistance};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    effect::{Effect, Ticket},
    error::Denial,
    location::{FixSource, LocationError, LocationProvider},
    AppError, Result,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum FeedView {
    /// Not fetched yet.
    #[default]
    Idle,
    Empty,
    Requests(Vec<HelpRequest>),
    Unavailable(String),
}

impl FeedView {
    /// Keeps the open requests of a `get_requests` answer.
    pub fn from_requests(requests: Vec<HelpRequest>) -> Self {
        let open: Vec<_> = requests.into_iter().filter(HelpRequest::is_open).collect();
        if open.is_empty() {
            FeedView::Empty
        } else {
            FeedView::Requests(open)
        }
    }

    pub fn requests(&self) -> &[HelpRequest] {
        match self {
            FeedView::Requests(requests) => requests,
            _ => &[],
        }
    }
}

/// A volunteer on the way to an accepted passenger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSession {
    pub request: WithDistance<HelpRequest>,
    pub volunteer_at: Coordinates,
    /// Walking directions, if the mapping provider found any.
    pub route: Option<RouteResult>,
    pub started_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub request: HelpRequest,
    /// Whether the gateway took note of the completion, `None` when it was
    /// not told.
    pub notified: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct VolunteerFeed {
    pub view: FeedView,
    pub navigation: Option<NavigationSession>,
}

pub struct RefreshTask {
    pub(crate) ticket: Ticket,
    pub(crate) gateway: Arc<dyn Gateway>,
}

#[async_trait]
impl Effect for RefreshTask {
    type Output = gateway::Result<GatewayResponse>;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> gateway::Result<GatewayResponse> {
        self.gateway.send(GatewayRequest::GetRequests).await
    }
}

pub struct AcceptTask {
    pub(crate) ticket: Ticket,
    pub(crate) location: Arc<LocationProvider>,
    pub(crate) mapping: Arc<dyn MappingProvider>,
    pub(crate) cancel: CancellationToken,
    pub(crate) request: HelpRequest,
}

impl AcceptTask {
    async fn volunteer_position(&self) -> Result<Coordinates> {
        match self.location.current_location(&self.cancel).await {
            Ok(fix) if fix.source == FixSource::Device => Ok(fix.coordinates),
            Ok(_) => {
                log::warn!("Only a fallback position is known for the volunteer.");
                Err(AppError::AccessDenied(Denial::NoVolunteerLocation))
            }
            Err(LocationError::Busy) => Err(AppError::Location(LocationError::Busy)),
            Err(LocationError::Cancelled) => Err(AppError::Cancelled),
            Err(LocationError::Unavailable) => {
                Err(AppError::AccessDenied(Denial::NoVolunteerLocation))
            }
        }
    }
}

#[async_trait]
impl Effect for AcceptTask {
    type Output = Result<NavigationSession>;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> Result<NavigationSession> {
        let volunteer_at = self.volunteer_position().await?;

        let query = RouteQuery::new(
            volunteer_at,
            Place::Point(self.request.coordinates),
            TravelMode::Walking,
        );
        let route = match self.mapping.route(&query).await {
            Ok(route) if !route.is_empty() => Some(route),
            Ok(_) => {
                log::info!("No walking route to {}.", self.request.coordinates.label());
                None
            }
            Err(why) => {
                log::warn!("Navigating without a route: {why}");
                None
            }
        };

        Ok(NavigationSession {
            request: self.request.with_distance_to(&volunteer_at),
            volunteer_at,
            route,
            started_at: Local::now(),
        })
    }
}

pub struct CompleteTask {
    pub(crate) ticket: Ticket,
    /// Only set when completions are reported to the gateway.
    pub(crate) gateway: Option<Arc<dyn Gateway>>,
    pub(crate) volunteer: Option<String>,
    pub(crate) request: HelpRequest,
}

#[async_trait]
impl Effect for CompleteTask {
    type Output = Completion;

    fn ticket(&self) -> Ticket {
        self.ticket
    }

    async fn run(self) -> Completion {
        let notified = match &self.gateway {
            None => None,
            Some(gateway) => {
                let request = GatewayRequest::complete(&self.request, self.volunteer.clone());
                match gateway.send(request).await {
                    Ok(response) => match response.rejection() {
                        None => Some(true),
                        Some(why) => {
                            log::warn!("Gateway refused the completion: {why}");
                            Some(false)
                        }
                    },
                    Err(why) => {
                        log::warn!("Could not report the completion: {why}");
                        Some(false)
                    }
                }
            }
        };
        Completion {
            request: self.request,
            notified,
        }
    }
}

#[cfg(test)]
mod tests {
    use model::RequestStatus;

    use super::*;

    fn request(destination: &str, status: RequestStatus) -> HelpRequest {
        HelpRequest {
            id: None,
            requester: None,
            destination: destination.to_owned(),
            help_type: Default::default(),
            coordinates: Coordinates::new(51.5, -0.12),
            status,
        }
    }

    #[test]
    fn feed_keeps_only_open_requests() {
        let view = FeedView::from_requests(vec![
            request("Pier", RequestStatus::Accepted),
            request("Central Station", RequestStatus::Open),
            request("Museum", RequestStatus::Completed),
        ]);

        let destinations: Vec<_> = view
            .requests()
            .iter()
            .map(|request| request.destination.as_str())
            .collect();
        assert_eq!(destinations, ["Central Station"]);
    }

    #[test]
    fn nothing_open_is_an_empty_feed() {
        assert_eq!(FeedView::from_requests(Vec::new()), FeedView::Empty);
        assert_eq!(
            FeedView::from_requests(vec![request("Pier", RequestStatus::Cancelled)]),
            FeedView::Empty
        );
    }
}
