//! # Configuration
//!
//! Process configuration, loaded once at startup from the environment and
//! optionally overridden by command-line flags. Every error here is fatal.
//!
//! | Variable                        | Default                  |
//! |---------------------------------|--------------------------|
//! | `GEOWATCH_HOME_LAT`             | required                 |
//! | `GEOWATCH_HOME_LON`             | required                 |
//! | `GEOWATCH_RADIUS_M`             | `50`                     |
//! | `GEOWATCH_AUTHORIZED`           | empty (comma-separated)  |
//! | `GEOWATCH_DEFAULT_TAG`          | `unknown`                |
//! | `GEOWATCH_PORT`                 | `5000`                   |
//! | `GEOWATCH_NOTIFY_TIMEOUT_SECS`  | `10`                     |
//! | `TWILIO_SID`, `TWILIO_AUTH`, `TWILIO_FROM`, `TO_NUMBER` | all or none |
//! | `TWILIO_API_BASE`               | `https://api.twilio.com` |

use geowatch_core::{AuthorizationSet, Coordinate, GeoError, ReferencePoint};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// VARIABLE NAMES AND DEFAULTS
// =============================================================================

pub const ENV_HOME_LAT: &str = "GEOWATCH_HOME_LAT";
pub const ENV_HOME_LON: &str = "GEOWATCH_HOME_LON";
pub const ENV_RADIUS_M: &str = "GEOWATCH_RADIUS_M";
pub const ENV_AUTHORIZED: &str = "GEOWATCH_AUTHORIZED";
pub const ENV_DEFAULT_TAG: &str = "GEOWATCH_DEFAULT_TAG";
pub const ENV_PORT: &str = "GEOWATCH_PORT";
pub const ENV_NOTIFY_TIMEOUT: &str = "GEOWATCH_NOTIFY_TIMEOUT_SECS";
pub const ENV_TWILIO_SID: &str = "TWILIO_SID";
pub const ENV_TWILIO_AUTH: &str = "TWILIO_AUTH";
pub const ENV_TWILIO_FROM: &str = "TWILIO_FROM";
pub const ENV_TO_NUMBER: &str = "TO_NUMBER";
pub const ENV_TWILIO_API_BASE: &str = "TWILIO_API_BASE";

pub const DEFAULT_RADIUS_M: f64 = 50.0;
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TAG: &str = "unknown";
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

// =============================================================================
// ERRORS
// =============================================================================

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("incomplete messaging credentials: {0} is set but {1} is not")]
    PartialCredentials(&'static str, &'static str),

    #[error(transparent)]
    Fence(#[from] GeoError),
}

// =============================================================================
// CONFIG
// =============================================================================

/// Twilio messaging credentials and routing.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, e.g. `whatsapp:+14155238886`.
    pub from: String,
    /// Alert recipient.
    pub to: String,
    pub api_base: String,
}

// Keep the auth token out of logs.
impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Values supplied on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home_lat: Option<f64>,
    pub home_lon: Option<f64>,
    pub radius_m: Option<f64>,
    pub authorized: Option<String>,
    pub default_tag: Option<String>,
    pub port: Option<u16>,
}

/// The full process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub reference: ReferencePoint,
    pub authorized: AuthorizationSet,
    /// Tag used when a report omits one.
    pub default_tag: String,
    pub port: u16,
    pub notify_timeout: Duration,
    /// `None` means alerts are only logged.
    pub twilio: Option<TwilioConfig>,
}

impl Config {
    /// A configuration with defaults for everything but the fence.
    #[must_use]
    pub fn new(reference: ReferencePoint, authorized: AuthorizationSet) -> Self {
        Self {
            reference,
            authorized,
            default_tag: DEFAULT_TAG.to_string(),
            port: DEFAULT_PORT,
            notify_timeout: Duration::from_secs(DEFAULT_NOTIFY_TIMEOUT_SECS),
            twilio: None,
        }
    }

    /// Load from the process environment.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load(overrides, |key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn load<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let lat = match overrides.home_lat {
            Some(v) => v,
            None => parse_var(ENV_HOME_LAT, var(ENV_HOME_LAT))?
                .ok_or(ConfigError::Missing(ENV_HOME_LAT))?,
        };
        let lon = match overrides.home_lon {
            Some(v) => v,
            None => parse_var(ENV_HOME_LON, var(ENV_HOME_LON))?
                .ok_or(ConfigError::Missing(ENV_HOME_LON))?,
        };
        let radius_m = match overrides.radius_m {
            Some(v) => v,
            None => parse_var(ENV_RADIUS_M, var(ENV_RADIUS_M))?.unwrap_or(DEFAULT_RADIUS_M),
        };
        let reference = ReferencePoint::new(Coordinate::new(lat, lon)?, radius_m)?;

        let authorized = match overrides.authorized.clone().or_else(|| var(ENV_AUTHORIZED)) {
            Some(csv) => AuthorizationSet::parse(&csv)?,
            None => AuthorizationSet::empty(),
        };

        let default_tag = overrides
            .default_tag
            .clone()
            .or_else(|| var(ENV_DEFAULT_TAG))
            .unwrap_or_else(|| DEFAULT_TAG.to_string());
        if default_tag.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: ENV_DEFAULT_TAG,
                reason: "must not be empty".to_string(),
            });
        }

        let port = match overrides.port {
            Some(p) => p,
            None => parse_var(ENV_PORT, var(ENV_PORT))?.unwrap_or(DEFAULT_PORT),
        };

        let timeout_secs: u64 = parse_var(ENV_NOTIFY_TIMEOUT, var(ENV_NOTIFY_TIMEOUT))?
            .unwrap_or(DEFAULT_NOTIFY_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: ENV_NOTIFY_TIMEOUT,
                reason: "must be at least 1 second".to_string(),
            });
        }

        let twilio = load_twilio(&var)?;

        Ok(Self {
            reference,
            authorized,
            default_tag,
            port,
            notify_timeout: Duration::from_secs(timeout_secs),
            twilio,
        })
    }
}

fn parse_var<T>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var: name,
            reason: format!("{:?}: {}", v, e),
        })
    })
    .transpose()
}

/// Credentials are all-or-none.
fn load_twilio<F>(var: &F) -> Result<Option<TwilioConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let names = [ENV_TWILIO_SID, ENV_TWILIO_AUTH, ENV_TWILIO_FROM, ENV_TO_NUMBER];
    let values: Vec<Option<String>> = names.iter().map(|&n| var(n)).collect();

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    let present = names
        .iter()
        .zip(&values)
        .find(|(_, v)| v.is_some())
        .map(|(n, _)| *n)
        .unwrap_or(ENV_TWILIO_SID);
    if let Some((missing, _)) = names.iter().zip(&values).find(|(_, v)| v.is_none()) {
        return Err(ConfigError::PartialCredentials(present, missing));
    }

    let mut values = values.into_iter().flatten();
    let mut next = || values.next().unwrap_or_default();
    Ok(Some(TwilioConfig {
        account_sid: next(),
        auth_token: next(),
        from: next(),
        to: next(),
        api_base: var(ENV_TWILIO_API_BASE)
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
    }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const HOME: [(&str, &str); 2] = [(ENV_HOME_LAT, "-23.4175"), (ENV_HOME_LON, "29.474083")];

    #[test]
    fn defaults_apply() {
        let config = Config::load(&ConfigOverrides::default(), lookup(&HOME)).unwrap();
        assert_eq!(config.reference.radius_m, DEFAULT_RADIUS_M);
        assert_eq!(config.reference.location.lat, -23.4175);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.default_tag, DEFAULT_TAG);
        assert!(config.authorized.is_empty());
        assert!(config.twilio.is_none());
        assert_eq!(config.notify_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_home_is_fatal() {
        let result = Config::load(&ConfigOverrides::default(), lookup(&[(ENV_HOME_LAT, "1.0")]));
        assert!(matches!(result, Err(ConfigError::Missing(ENV_HOME_LON))));
    }

    #[test]
    fn non_numeric_radius_is_fatal() {
        let mut pairs = HOME.to_vec();
        pairs.push((ENV_RADIUS_M, "fifty"));
        let result = Config::load(&ConfigOverrides::default(), lookup(&pairs));
        assert!(matches!(result, Err(ConfigError::Invalid { var: ENV_RADIUS_M, .. })));
    }

    #[test]
    fn out_of_range_home_is_fatal() {
        let result = Config::load(
            &ConfigOverrides::default(),
            lookup(&[(ENV_HOME_LAT, "95"), (ENV_HOME_LON, "0")]),
        );
        assert!(matches!(result, Err(ConfigError::Fence(_))));
    }

    #[test]
    fn malformed_authorization_set_is_fatal() {
        let mut pairs = HOME.to_vec();
        pairs.push((ENV_AUTHORIZED, "alice,,bob"));
        let result = Config::load(&ConfigOverrides::default(), lookup(&pairs));
        assert!(matches!(result, Err(ConfigError::Fence(GeoError::InvalidConfig(_)))));
    }

    #[test]
    fn overrides_win_over_environment() {
        let mut pairs = HOME.to_vec();
        pairs.push((ENV_PORT, "8080"));
        pairs.push((ENV_AUTHORIZED, "alice"));
        let overrides = ConfigOverrides {
            home_lat: Some(0.0),
            radius_m: Some(100.0),
            authorized: Some("bob".to_string()),
            port: Some(9000),
            ..ConfigOverrides::default()
        };
        let config = Config::load(&overrides, lookup(&pairs)).unwrap();
        assert_eq!(config.reference.location.lat, 0.0);
        assert_eq!(config.reference.location.lon, 29.474083);
        assert_eq!(config.reference.radius_m, 100.0);
        assert_eq!(config.port, 9000);
        assert!(config.authorized.contains("bob"));
        assert!(!config.authorized.contains("alice"));
    }

    #[test]
    fn full_twilio_credentials_load() {
        let mut pairs = HOME.to_vec();
        pairs.extend([
            (ENV_TWILIO_SID, "AC123"),
            (ENV_TWILIO_AUTH, "secret"),
            (ENV_TWILIO_FROM, "whatsapp:+1415"),
            (ENV_TO_NUMBER, "whatsapp:+2782"),
            (ENV_TWILIO_API_BASE, "http://localhost:9999/"),
        ]);
        let config = Config::load(&ConfigOverrides::default(), lookup(&pairs)).unwrap();
        let twilio = config.twilio.unwrap();
        assert_eq!(twilio.account_sid, "AC123");
        assert_eq!(twilio.auth_token, "secret");
        assert_eq!(twilio.from, "whatsapp:+1415");
        assert_eq!(twilio.to, "whatsapp:+2782");
        assert_eq!(twilio.api_base, "http://localhost:9999");
        assert!(!format!("{:?}", twilio).contains("secret"));
    }

    #[test]
    fn partial_twilio_credentials_are_fatal() {
        let mut pairs = HOME.to_vec();
        pairs.extend([(ENV_TWILIO_SID, "AC123"), (ENV_TWILIO_AUTH, "secret")]);
        let result = Config::load(&ConfigOverrides::default(), lookup(&pairs));
        assert!(matches!(
            result,
            Err(ConfigError::PartialCredentials(ENV_TWILIO_SID, ENV_TWILIO_FROM))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut pairs = HOME.to_vec();
        pairs.push((ENV_NOTIFY_TIMEOUT, "0"));
        let result = Config::load(&ConfigOverrides::default(), lookup(&pairs));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
