//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZMASTER_CONFIG_PATH";

const DEFAULT_LEADERBOARD_TOP_N: usize = 5;
const DEFAULT_JOIN_CODE_LENGTH: usize = 6;
const DEFAULT_IDENT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    leaderboard_top_n: usize,
    join_code_length: usize,
    ident_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            leaderboard_top_n: DEFAULT_LEADERBOARD_TOP_N,
            join_code_length: DEFAULT_JOIN_CODE_LENGTH,
            ident_timeout: Duration::from_secs(DEFAULT_IDENT_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
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

    /// Number of leaderboard entries included in question-results broadcasts.
    pub fn leaderboard_top_n(&self) -> usize {
        self.leaderboard_top_n
    }

    /// Length of generated join codes.
    pub fn join_code_length(&self) -> usize {
        self.join_code_length
    }

    /// How long a fresh WebSocket connection may stay silent before it is dropped.
    pub fn ident_timeout(&self) -> Duration {
        self.ident_timeout
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    leaderboard_top_n: Option<usize>,
    #[serde(default)]
    join_code_length: Option<usize>,
    #[serde(default)]
    ident_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            leaderboard_top_n: raw.leaderboard_top_n.unwrap_or(defaults.leaderboard_top_n),
            join_code_length: raw.join_code_length.unwrap_or(defaults.join_code_length),
            ident_timeout: raw
                .ident_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ident_timeout),
        }
    }
}
