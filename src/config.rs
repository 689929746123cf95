use std::path::PathBuf;

use chrono::Duration;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::orbit::{PropagatorKind, SceneScale};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog file to read element sets from; the built-in set is used when absent
    pub tle_file: Option<PathBuf>,
    /// Catalog number to select from `tle_file`, first entry otherwise
    pub norad_id: Option<u32>,
    pub propagator: PropagatorKind,
    pub scene: SceneScale,
    pub track: TrackConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    #[serde(default = "default_ground_points")]
    pub ground_points: usize,
    #[serde(default = "default_ground_step", deserialize_with = "deserialize_duration")]
    pub ground_step: Duration,
    #[serde(default = "default_future_duration", deserialize_with = "deserialize_duration")]
    pub future_duration: Duration,
    #[serde(default = "default_future_step", deserialize_with = "deserialize_duration")]
    pub future_step: Duration,
}

fn default_ground_points() -> usize {
    480
}

fn default_ground_step() -> Duration {
    Duration::seconds(10)
}

fn default_future_duration() -> Duration {
    Duration::minutes(30)
}

fn default_future_step() -> Duration {
    Duration::seconds(30)
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            ground_points: default_ground_points(),
            ground_step: default_ground_step(),
            future_duration: default_future_duration(),
            future_step: default_future_step(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval", deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    #[serde(default = "default_max_staleness", deserialize_with = "deserialize_duration")]
    pub max_staleness: Duration,
    #[serde(default = "default_retry_schedule", deserialize_with = "deserialize_durations")]
    pub retry_schedule: Vec<Duration>,
}

fn default_interval() -> Duration {
    Duration::hours(1)
}

fn default_max_staleness() -> Duration {
    Duration::hours(6)
}

fn default_retry_schedule() -> Vec<Duration> {
    [2, 5, 15, 60, 180, 600]
        .into_iter()
        .map(Duration::seconds)
        .collect()
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_staleness: default_max_staleness(),
            retry_schedule: default_retry_schedule(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

fn deserialize_durations<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|s| parse_duration(s).map_err(serde::de::Error::custom))
        .collect()
}
