use std::error;
use std::fmt;

use gateway::GatewayError;
use mapping::MappingError;
use model::{Role, Screen};
use serde::Serialize;

use crate::{effect::Operation, location::LocationError, navigator::Transition};

/// Why a role gate refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    NotLoggedIn,
    RoleLocked { active: Role, requested: Role },
    NoVolunteerLocation,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Denial::NotLoggedIn => write!(f, "Please log in first."),
            Denial::RoleLocked { active, requested } => write!(
                f,
                "You are logged in as a {active}. Please log out if you want to sign in as a {requested}."
            ),
            Denial::NoVolunteerLocation => {
                write!(f, "Cannot navigate without the volunteer's location.")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppError {
    MissingLocation,
    EmptyDestination,
    AccessDenied(Denial),
    RoleMismatch { active: Role, requested: Role },
    InvalidTransition { from: Screen, transition: Transition },
    NotOnScreen { operation: Operation, screen: Screen },
    GatewayUnavailable(GatewayError),
    Rejected(String),
    RouteNotFound,
    MappingUnavailable(MappingError),
    Location(LocationError),
    NoSuchRequest(usize),
    Busy(Operation),
    Cancelled,
    Interrupted,
    Stopped,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl error::Error for AppError {}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::MissingLocation => {
                write!(f, "Please get your location first.")
            }
            AppError::EmptyDestination => write!(f, "Please enter a destination."),
            AppError::AccessDenied(denial) => write!(f, "Access denied. {denial}"),
            AppError::RoleMismatch { active, requested } => write!(
                f,
                "Already logged in as a {active}, log out before signing in as a {requested}."
            ),
            AppError::InvalidTransition { from, transition } => {
                write!(f, "Can not {transition} from the {from} screen.")
            }
            AppError::NotOnScreen { operation, screen } => {
                write!(f, "Can not {operation} on the {screen} screen.")
            }
            AppError::GatewayUnavailable(why) => write!(f, "Could not connect to cloud: {why}"),
            AppError::Rejected(why) => write!(f, "Error: {why}"),
            AppError::RouteNotFound => write!(f, "No route found to this destination."),
            AppError::MappingUnavailable(why) => write!(f, "Route failed: {why}"),
            AppError::Location(why) => write!(f, "Location error: {why}"),
            AppError::NoSuchRequest(index) => write!(f, "There is no request #{index}."),
            AppError::Busy(operation) => write!(f, "Still busy: {operation}."),
            AppError::Cancelled => write!(f, "Cancelled."),
            AppError::Interrupted => write!(f, "The operation was interrupted."),
            AppError::Stopped => write!(f, "The app is no longer running."),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(why: GatewayError) -> Self {
        AppError::GatewayUnavailable(why)
    }
}

impl From<MappingError> for AppError {
    fn from(why: MappingError) -> Self {
        AppError::MappingUnavailable(why)
    }
}

impl From<LocationError> for AppError {
    fn from(why: LocationError) -> Self {
        AppError::Location(why)
    }
}
