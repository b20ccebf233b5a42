//! Application-level configuration loading, including session timing knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVEQUIZ_BACK_CONFIG_PATH";

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_GRACE_PERIOD_SECS: u64 = 3;
const DEFAULT_AUTO_CLOSE_DELAY_MS: u64 = 1_000;
const DEFAULT_DISCONNECT_SETTLE_MS: u64 = 500;
const DEFAULT_BROADCAST_CAPACITY: usize = 32;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    public_base_url: String,
    grace_period: Duration,
    auto_close_delay: Duration,
    disconnect_settle: Duration,
    broadcast_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
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

    /// Public URL prefix baked into participant join links.
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Join URL handed out when a team is created; the client renders it as
    /// a QR code.
    pub fn join_url(&self, access_code: &str) -> String {
        format!(
            "{}/participant.html?code={access_code}",
            self.public_base_url.trim_end_matches('/')
        )
    }

    /// Extra time after the nominal deadline during which a late submission
    /// is still scored (absorbs network latency).
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// UX pause between "everyone answered" and the statistics broadcast.
    pub fn auto_close_delay(&self) -> Duration {
        self.auto_close_delay
    }

    /// Settle delay before re-running the close check after a participant
    /// disconnect (avoids undercounting in-flight leaves).
    pub fn disconnect_settle(&self) -> Duration {
        self.disconnect_settle
    }

    /// Capacity of each audience broadcast channel.
    pub fn broadcast_capacity(&self) -> usize {
        self.broadcast_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_owned(),
            grace_period: Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS),
            auto_close_delay: Duration::from_millis(DEFAULT_AUTO_CLOSE_DELAY_MS),
            disconnect_settle: Duration::from_millis(DEFAULT_DISCONNECT_SETTLE_MS),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`]. Every field is optional.
#[derive(Debug, Deserialize)]
struct RawConfig {
    public_base_url: Option<String>,
    grace_period_secs: Option<u64>,
    auto_close_delay_ms: Option<u64>,
    disconnect_settle_ms: Option<u64>,
    broadcast_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            public_base_url: raw.public_base_url.unwrap_or(defaults.public_base_url),
            grace_period: raw
                .grace_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.grace_period),
            auto_close_delay: raw
                .auto_close_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.auto_close_delay),
            disconnect_settle: raw
                .disconnect_settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.disconnect_settle),
            broadcast_capacity: raw
                .broadcast_capacity
                .unwrap_or(defaults.broadcast_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into
/// account.
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
    fn join_url_strips_trailing_slash() {
        let config = AppConfig {
            public_base_url: "https://quiz.example.org/".into(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.join_url("A1B2C3D4"),
            "https://quiz.example.org/participant.html?code=A1B2C3D4"
        );
    }

    #[test]
    fn raw_config_fields_are_optional() {
        let raw: RawConfig = serde_json::from_str("{\"grace_period_secs\": 5}").unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.grace_period(), Duration::from_secs(5));
        assert_eq!(config.public_base_url(), DEFAULT_PUBLIC_BASE_URL);
    }
}
