use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 10_000;
pub const DEFAULT_UNREACHABLE_AFTER: u32 = 3;
pub const DEFAULT_NOTIFICATION_TTL_MS: u64 = 4_000;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PollConfig {
    pub status_interval_ms: u64,
    pub health_interval_ms: u64,
    /// Consecutive failed polls before the poller reports itself unreachable.
    pub unreachable_after: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            health_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            unreachable_after: DEFAULT_UNREACHABLE_AFTER,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct UiConfig {
    pub notification_ttl_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL_MS,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!(
                "api.base_url must start with http:// or https:// (got {base:?})"
            ));
        }
        if self.api.timeout_ms == 0 {
            return Err("api.timeout_ms must be > 0".to_string());
        }
        if self.poll.status_interval_ms == 0 {
            return Err("poll.status_interval_ms must be > 0".to_string());
        }
        if self.poll.health_interval_ms == 0 {
            return Err("poll.health_interval_ms must be > 0".to_string());
        }
        if self.poll.unreachable_after == 0 {
            return Err("poll.unreachable_after must be > 0".to_string());
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.poll.status_interval_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.poll.health_interval_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.ui.notification_ttl_ms)
    }
}

/// Reads and parses a config file. Callers validate after applying overrides.
pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}
