//! Store application configuration that gets read from disk
use crate::options::MatchOptions;
use crate::services::{new_matching_handler, MapMatchingService};
use crate::Error;
use log::LevelFilter;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::collections::HashMap;
use std::io::prelude::*;
use std::iter::Iterator;
use std::str::FromStr;

/// Default number of points sent in a single match request, OSRM's stock limit
pub const DEFAULT_MAX_MATCHING_SIZE: usize = 100;

/// Defines the allowed keys under the services map
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Matching,
}

/// Type alias for clarity
pub type ServiceParameters = HashMap<String, Value>;

/// Configuration options for a single service of any type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    handler: String,
    #[serde(default)]
    configuration: ServiceParameters,
}

/// Services that can be built from their entry in the configuration file
pub trait FromServiceConfig {
    fn from_config(config: &ServiceConfig) -> Result<Self, Error>
    where
        Self: Sized;
}

impl ServiceConfig {
    pub fn new(handler: &str) -> Self {
        ServiceConfig {
            handler: handler.to_string(),
            configuration: HashMap::new(),
        }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn parameters(&self) -> impl Iterator<Item = &String> + '_ {
        self.configuration.keys()
    }

    pub fn get_parameter(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    pub fn get_parameter_as_string(&self, key: &str) -> Option<Result<String, Error>> {
        if let Some(value) = self.configuration.get(key) {
            let value = value
                .as_str()
                .ok_or_else(|| {
                    Error::InvalidConfigurationValue(format!(
                        "invalid value for {}.{}, expected a string: {:?}",
                        &self.handler, key, value
                    ))
                })
                .map(|v| v.to_string());
            Some(value)
        } else {
            None
        }
    }

    pub fn get_parameter_as_u64(&self, key: &str) -> Option<Result<u64, Error>> {
        if let Some(value) = self.configuration.get(key) {
            let value = value.as_u64().ok_or_else(|| {
                Error::InvalidConfigurationValue(format!(
                    "invalid value for {}.{}, expected a non-negative integer: {:?}",
                    &self.handler, key, value
                ))
            });
            Some(value)
        } else {
            None
        }
    }
}

/// Set a string parameter on the service instance from a ServiceConfig instance
#[macro_export]
macro_rules! set_string_param_from_config {
    ($b:expr, $k:ident, $c:expr) => {
        if let Some(val) = $c.get_parameter_as_string(stringify!($k)) {
            $b.$k = val?
        }
    };
}

/// Configuration struct that we can create from the config file used
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(
        deserialize_with = "deserialize_level_filter",
        serialize_with = "serialize_level_filter",
        default = "default_level_filter"
    )]
    log_level: LevelFilter,
    #[serde(default = "default_max_matching_size")]
    max_matching_size: usize,
    #[serde(default)]
    services: HashMap<ServiceType, ServiceConfig>,
    #[serde(default)]
    options: MatchOptions,
}

impl Config {
    pub fn load<T: Read>(source: &mut T) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(source)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn max_matching_size(&self) -> usize {
        self.max_matching_size
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn get_matching_handler(&self) -> Result<Box<dyn MapMatchingService>, Error> {
        match self.services.get(&ServiceType::Matching) {
            Some(cfg) => new_matching_handler(cfg),
            None => {
                // a local OSRM instance on its default port
                new_matching_handler(&ServiceConfig::new("osrm"))
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_level_filter(),
            max_matching_size: default_max_matching_size(),
            services: HashMap::new(),
            options: MatchOptions::default(),
        }
    }
}

fn deserialize_level_filter<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    LevelFilter::from_str(&buf)
        .map_err(|_| serde::de::Error::custom(format!("invalid level value: {}", buf)))
}

fn serialize_level_filter<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&level.to_string())
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

fn default_max_matching_size() -> usize {
    DEFAULT_MAX_MATCHING_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Geometries;

    #[test]
    fn load_full_config() {
        let yaml = "
log_level: debug
max_matching_size: 50
services:
  matching:
    handler: osrm
    configuration:
      base_url: http://127.0.0.1:5000
      timeout_secs: 10
options:
  steps: true
  geometries: geojson
";
        let config = Config::load(&mut yaml.as_bytes()).unwrap();
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.max_matching_size(), 50);
        assert!(config.options().steps);
        assert_eq!(config.options().geometries, Geometries::GeoJson);
        let handler = config.get_matching_handler().unwrap();
        assert!(handler
            .describe_request(
                &crate::Trajectory::from_parts(&[1.0], &[2.0], &[]).unwrap().batches(1).unwrap()[0],
                config.options()
            )
            .starts_with("http://127.0.0.1:5000/match/v1/driving/2,1?"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::load(&mut "{}".as_bytes()).unwrap();
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert_eq!(config.max_matching_size(), DEFAULT_MAX_MATCHING_SIZE);
        assert_eq!(config.options(), &MatchOptions::default());
        assert!(config.get_matching_handler().is_ok());
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        assert!(Config::load(&mut "log_level: loud".as_bytes()).is_err());
    }

    #[test]
    fn parameter_type_errors_name_the_handler() {
        let config: ServiceConfig =
            serde_yaml::from_str("handler: osrm\nconfiguration:\n  base_url: 5\n").unwrap();
        let err = config.get_parameter_as_string("base_url").unwrap().unwrap_err();
        assert!(err.to_string().starts_with("invalid value for osrm.base_url"));
        assert!(config.get_parameter_as_string("missing").is_none());
    }
}
