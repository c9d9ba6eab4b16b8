//! # Configuration module
//!
//! This module provide utilities and helpers to interact with the configuration

use std::{convert::TryFrom, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_ENVIRONMENT: &str = "api";
pub const DEFAULT_ENDPOINT: &str = "https://{environment}-{zone}.exoscale.com/v2";
pub const DEFAULT_TIMEOUT: &str = "40m";
pub const DEFAULT_POLL_INTERVAL: &str = "3s";
pub const DEFAULT_SETTLING_DELAY: &str = "5s";

// -----------------------------------------------------------------------------
// Duration (de)serialization helpers

pub mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// -----------------------------------------------------------------------------
// Api structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Api {
    #[serde(rename = "environment")]
    pub environment: String,
    #[serde(rename = "endpoint")]
    pub endpoint: String,
    #[serde(rename = "key", default)]
    pub key: Option<String>,
    #[serde(rename = "secret", default)]
    pub secret: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            key: None,
            secret: None,
        }
    }
}

// -----------------------------------------------------------------------------
// Dbaas structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Dbaas {
    #[serde(rename = "zones", default)]
    pub zones: Vec<String>,
    #[serde(rename = "default-timeout", with = "duration")]
    pub default_timeout: Duration,
    #[serde(rename = "poll-interval", with = "duration")]
    pub poll_interval: Duration,
    #[serde(rename = "settling-delay", with = "duration")]
    pub settling_delay: Duration,
}

impl Default for Dbaas {
    fn default() -> Self {
        Self {
            zones: vec![],
            default_timeout: Duration::from_secs(40 * 60),
            poll_interval: Duration::from_secs(3),
            settling_delay: Duration::from_secs(5),
        }
    }
}

impl Dbaas {
    /// returns if the zone belongs to the closed set of zones, an empty set
    /// accepts any zone
    pub fn accepts(&self, zone: &str) -> bool {
        self.zones.is_empty() || self.zones.iter().any(|z| z == zone)
    }
}

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to load file '{0:?}', {1}")]
    File(PathBuf, ConfigError),
    #[error("failed to load configuration, {0}")]
    Cast(ConfigError),
    #[error("failed to set default for key '{0}', {1}")]
    Default(String, ConfigError),
    #[error("failed to build configuration, {0}")]
    Build(ConfigError),
}

// -----------------------------------------------------------------------------
// Configuration structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Configuration {
    #[serde(rename = "api")]
    pub api: Api,
    #[serde(rename = "dbaas")]
    pub dbaas: Dbaas,
}

impl TryFrom<PathBuf> for Configuration {
    type Error = Error;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        let builder = defaults()?.add_source(File::from(path.to_owned()).required(true));

        builder
            .build()
            .map_err(|err| Error::File(path, err))?
            .try_deserialize()
            .map_err(Error::Cast)
    }
}

impl Configuration {
    pub fn try_default() -> Result<Self, Error> {
        let mut builder = defaults()?;
        let mut paths = vec![
            PathBuf::from(format!("/usr/share/{}/config", env!("CARGO_PKG_NAME"))),
            PathBuf::from(format!("/etc/{}/config", env!("CARGO_PKG_NAME"))),
        ];

        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(format!(
                "{}/.config/{}/config",
                home,
                env!("CARGO_PKG_NAME")
            )));
            paths.push(PathBuf::from(format!(
                "{}/.local/share/{}/config",
                home,
                env!("CARGO_PKG_NAME")
            )));
        }

        paths.push(PathBuf::from("config"));
        for path in paths {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .build()
            .map_err(Error::Build)?
            .try_deserialize()
            .map_err(Error::Cast)
    }

    #[tracing::instrument(skip_all)]
    pub fn help(&self) {
        tracing::info!(
            environment = &self.api.environment,
            endpoint = &self.api.endpoint,
            zones = self.dbaas.zones.join(","),
            "Configuration loaded"
        );

        if self.api.key.is_none() || self.api.secret.is_none() {
            tracing::warn!("No api credentials configured, requests will not be signed");
        }
    }
}

// -----------------------------------------------------------------------------
// helpers

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, Error> {
    let defaults = [
        ("api.environment", DEFAULT_ENVIRONMENT),
        ("api.endpoint", DEFAULT_ENDPOINT),
        ("dbaas.default-timeout", DEFAULT_TIMEOUT),
        ("dbaas.poll-interval", DEFAULT_POLL_INTERVAL),
        ("dbaas.settling-delay", DEFAULT_SETTLING_DELAY),
    ];

    let mut builder = Config::builder();
    for (key, value) in defaults {
        builder = builder
            .set_default(key, value)
            .map_err(|err| Error::Default(key.into(), err))?;
    }

    Ok(builder.add_source(
        Environment::with_prefix(&env!("CARGO_PKG_NAME").replace('-', "_"))
            .separator("__")
            .try_parsing(true),
    ))
}
