use std::{env, fmt, str::FromStr, time::Duration};

use gateway::GatewayConfig;
use mapping::OsmConfig;
use model::Coordinates;

use crate::location::LocationSettings;

/// Central London, where the app falls back to when no position is known.
pub const DEFAULT_FALLBACK: Coordinates = Coordinates {
    lat: 51.505,
    lng: -0.09,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Expected '{key}' to be set."),
            ConfigError::Invalid { key, value } => {
                write!(f, "Invalid value '{value}' for '{key}'.")
            }
        }
    }
}

/// Behaviour that differed between the old client variants. Each one is an
/// explicit decision here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    pub role_lock: bool,
    pub reverse_geocoding: bool,
    pub route_alternatives: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            role_lock: true,
            reverse_geocoding: true,
            route_alternatives: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistConfig {
    pub gateway: GatewayConfig,
    pub osm: OsmConfig,
    pub location_timeout_secs: u64,
    pub fallback_location: Option<Coordinates>,
    /// Sign in anyway when the gateway can not be reached.
    pub offline_login: bool,
    pub features: Features,
    pub rollback_on_submit_failure: bool,
    pub notify_completion: bool,
    pub feed_poll_secs: Option<u64>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::new("http://localhost:8080/"),
            osm: OsmConfig::default(),
            location_timeout_secs: 10,
            fallback_location: Some(DEFAULT_FALLBACK),
            offline_login: false,
            features: Features::default(),
            rollback_on_submit_failure: false,
            notify_completion: false,
            feed_poll_secs: None,
        }
    }
}

impl AssistConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source, starting from the
    /// defaults for every key that is not set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let mut config = Self::default();

        config.gateway.url = vars
            .string("ASSIST_GATEWAY_URL")
            .ok_or(ConfigError::Missing("ASSIST_GATEWAY_URL"))?;
        config.gateway.timeout_secs = vars
            .parse("ASSIST_GATEWAY_TIMEOUT_SECS")?
            .unwrap_or(config.gateway.timeout_secs);
        config.gateway.proxy = vars.string("ASSIST_GATEWAY_PROXY");

        if let Some(url) = vars.string("ASSIST_NOMINATIM_URL") {
            config.osm.nominatim_url = url;
        }
        if let Some(url) = vars.string("ASSIST_OSRM_URL") {
            config.osm.osrm_url = url;
        }

        config.location_timeout_secs = vars
            .parse("ASSIST_LOCATION_TIMEOUT_SECS")?
            .unwrap_or(config.location_timeout_secs);
        config.fallback_location = if vars.string("ASSIST_FALLBACK").as_deref() == Some("off")
        {
            None
        } else {
            vars.coordinates("ASSIST_FALLBACK_LAT", "ASSIST_FALLBACK_LNG")?
                .or(config.fallback_location)
        };

        config.offline_login = vars.flag("ASSIST_OFFLINE_LOGIN", config.offline_login)?;
        config.features.role_lock =
            vars.flag("ASSIST_ROLE_LOCK", config.features.role_lock)?;
        config.features.reverse_geocoding = vars.flag(
            "ASSIST_REVERSE_GEOCODING",
            config.features.reverse_geocoding,
        )?;
        config.features.route_alternatives = vars.flag(
            "ASSIST_ROUTE_ALTERNATIVES",
            config.features.route_alternatives,
        )?;
        config.rollback_on_submit_failure = vars.flag(
            "ASSIST_ROLLBACK_ON_SUBMIT_FAILURE",
            config.rollback_on_submit_failure,
        )?;
        config.notify_completion =
            vars.flag("ASSIST_NOTIFY_COMPLETION", config.notify_completion)?;
        config.feed_poll_secs = vars.parse("ASSIST_FEED_POLL_SECS")?;

        Ok(config)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }

    pub fn location_settings(&self) -> LocationSettings {
        LocationSettings {
            timeout: self.location_timeout(),
            fallback: self.fallback_location,
            reverse_geocoding: self.features.reverse_geocoding,
        }
    }

    pub fn feed_poll_interval(&self) -> Option<Duration> {
        self.feed_poll_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &'static str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> Result<Option<T>, ConfigError> {
        self.string(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::Invalid { key, value })
            })
            .transpose()
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.string(key) {
            None => Ok(default),
            Some(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { key, value }),
            },
        }
    }

    fn coordinates(
        &self,
        lat_key: &'static str,
        lng_key: &'static str,
    ) -> Result<Option<Coordinates>, ConfigError> {
        match (self.parse::<f64>(lat_key)?, self.parse::<f64>(lng_key)?) {
            (Some(lat), Some(lng)) => {
                let coordinates = Coordinates::new(lat, lng);
                if coordinates.is_valid() {
                    Ok(Some(coordinates))
                } else {
                    Err(ConfigError::Invalid {
                        key: lat_key,
                        value: coordinates.label(),
                    })
                }
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::Missing(lng_key)),
            (None, Some(_)) => Err(ConfigError::Missing(lat_key)),
        }
    }
}
