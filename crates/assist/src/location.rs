use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use mapping::MappingProvider;
use model::Coordinates;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    Denied,
    Unavailable,
}

/// The platform's geolocation, e.g. a GPS receiver or the browser API.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// A device that always reports the same position.
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// A device without any geolocation support.
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Err(PositionError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixSource {
    Device,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    pub source: FixSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    /// Another lookup is still running.
    Busy,
    Cancelled,
    /// No position and no fallback configured.
    Unavailable,
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocationError::Busy => write!(f, "already locating"),
            LocationError::Cancelled => write!(f, "location lookup cancelled"),
            LocationError::Unavailable => write!(f, "GPS not available"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocationSettings {
    pub timeout: Duration,
    pub fallback: Option<Coordinates>,
    pub reverse_geocoding: bool,
}

/// The lookup allowed to run. A cancelled lookup gives up the slot as soon
/// as its token fires, even if its task has not noticed yet.
#[derive(Default)]
struct Lookups {
    serial: u64,
    active: Option<(u64, CancellationToken)>,
}

struct LookupGuard<'a> {
    provider: &'a LocationProvider,
    serial: u64,
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        let mut lookups = self.provider.lookups();
        if matches!(lookups.active, Some((serial, _)) if serial == self.serial) {
            lookups.active = None;
        }
    }
}

/// Wraps the position source with a timeout, cancellation and a fallback
/// position, and turns positions into something readable.
pub struct LocationProvider {
    source: Arc<dyn PositionSource>,
    mapping: Arc<dyn MappingProvider>,
    settings: LocationSettings,
    in_flight: Mutex<Lookups>,
}

impl LocationProvider {
    pub fn new(
        source: Arc<dyn PositionSource>,
        mapping: Arc<dyn MappingProvider>,
        settings: LocationSettings,
    ) -> Self {
        Self {
            source,
            mapping,
            settings,
            in_flight: Mutex::new(Lookups::default()),
        }
    }

    fn lookups(&self) -> MutexGuard<'_, Lookups> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, cancel: &CancellationToken) -> Result<LookupGuard<'_>, LocationError> {
        let mut lookups = self.lookups();
        if matches!(&lookups.active, Some((_, running)) if !running.is_cancelled()) {
            return Err(LocationError::Busy);
        }
        lookups.serial += 1;
        let serial = lookups.serial;
        lookups.active = Some((serial, cancel.clone()));
        Ok(LookupGuard {
            provider: self,
            serial,
        })
    }

    pub fn settings(&self) -> &LocationSettings {
        &self.settings
    }

    /// The device position, or the fallback position when the device denies
    /// access, has none, or does not answer in time.
    pub async fn current_location(
        &self,
        cancel: &CancellationToken,
    ) -> Result<LocationFix, LocationError> {
        let _guard = self.claim(cancel)?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LocationError::Cancelled),
            outcome = tokio::time::timeout(self.settings.timeout, self.source.current_position()) => outcome,
        };

        let failure = match outcome {
            Ok(Ok(coordinates)) if coordinates.is_valid() => {
                return Ok(LocationFix {
                    coordinates,
                    source: FixSource::Device,
                })
            }
            Ok(Ok(coordinates)) => format!("reported an invalid position ({})", coordinates.label()),
            Ok(Err(PositionError::Denied)) => "denied access".to_owned(),
            Ok(Err(PositionError::Unavailable)) => "has no position".to_owned(),
            Err(_) => format!("did not answer within {:?}", self.settings.timeout),
        };

        match self.settings.fallback {
            Some(coordinates) => {
                log::warn!(
                    "Position source {failure}, using fallback {}.",
                    coordinates.label()
                );
                Ok(LocationFix {
                    coordinates,
                    source: FixSource::Fallback,
                })
            }
            None => {
                log::warn!("Position source {failure}.");
                Err(LocationError::Unavailable)
            }
        }
    }

    /// Street address of `at` when the mapping provider knows one, the
    /// numeric position otherwise.
    pub async fn describe(&self, at: Coordinates) -> String {
        if !self.settings.reverse_geocoding {
            return at.label();
        }
        match self.mapping.reverse_geocode(at).await {
            Ok(Some(address)) => address,
            Ok(None) => at.label(),
            Err(why) => {
                log::warn!("Geocoder failed: {why}");
                at.label()
            }
        }
    }
}
