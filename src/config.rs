//! Application-level configuration loading: lobby limits and client polling cadence.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "EMPATIFY_CONFIG_PATH";

const DEFAULT_MAX_ROUNDS_LIMIT: u32 = 10;
const DEFAULT_MAX_ROUNDS: u32 = 5;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3_000);
const DEFAULT_SSE_CAPACITY: usize = 16;
/// Shortest accepted poll interval; smaller values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Upper bound applied when clamping a lobby's round count.
    pub max_rounds_limit: u32,
    /// Round count used when a lobby is created without one.
    pub default_max_rounds: u32,
    /// Interval between two lobby polls of the [`crate::client::LobbyWatcher`].
    pub poll_interval: Duration,
    /// Buffer size of each per-lobby SSE broadcast channel.
    pub sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        max_rounds_limit = app_config.max_rounds_limit,
                        poll_interval_ms = app_config.poll_interval.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys take their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    lobby: RawLobbyConfig,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "poll_interval_ms")]
    poll_interval: Duration,
    sse_capacity: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            lobby: RawLobbyConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLobbyConfig {
    max_rounds_limit: u32,
    default_max_rounds: u32,
}

impl Default for RawLobbyConfig {
    fn default() -> Self {
        Self {
            max_rounds_limit: DEFAULT_MAX_ROUNDS_LIMIT,
            default_max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let max_rounds_limit = value.lobby.max_rounds_limit.max(1);
        Self {
            max_rounds_limit,
            default_max_rounds: value.lobby.default_max_rounds.clamp(1, max_rounds_limit),
            poll_interval: value.poll_interval.max(MIN_POLL_INTERVAL),
            sse_capacity: value.sse_capacity.max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_game_rules() {
        let config = AppConfig::default();
        assert_eq!(config.max_rounds_limit, 10);
        assert_eq!(config.default_max_rounds, 5);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_json(r#"{"poll_interval_ms": 1500}"#).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.max_rounds_limit, 10);
        assert_eq!(config.sse_capacity, 16);
    }

    #[test]
    fn default_rounds_never_exceed_the_limit() {
        let config = AppConfig::from_json(
            r#"{"lobby": {"max_rounds_limit": 4, "default_max_rounds": 9}}"#,
        )
        .unwrap();
        assert_eq!(config.max_rounds_limit, 4);
        assert_eq!(config.default_max_rounds, 4);
    }

    #[test]
    fn zero_poll_interval_is_raised_to_the_minimum() {
        let config = AppConfig::from_json(r#"{"poll_interval_ms": 0}"#).unwrap();
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(AppConfig::from_json("{not json").is_err());
    }
}
