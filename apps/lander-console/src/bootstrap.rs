use lander_application::config::{load_config, Config};
use lander_infrastructure::training_api::HttpTrainingClient;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "LANDER_CONFIG";
pub const API_BASE_ENV: &str = "LANDER_API_BASE";

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// `--config` first, then `LANDER_CONFIG`.
pub fn config_path_from(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    cli_path.or_else(|| non_empty_env(CONFIG_ENV).map(PathBuf::from))
}

/// `--api-base` first, then `LANDER_API_BASE`.
pub fn api_base_from(cli_value: Option<String>) -> Option<String> {
    cli_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| non_empty_env(API_BASE_ENV))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config, String> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(base) = overrides.api_base.as_deref() {
        config.api.base_url = base.trim().to_string();
    }
    if let Some(timeout_ms) = overrides.timeout_ms {
        config.api.timeout_ms = timeout_ms;
    }
    config.validate().map_err(|err| match path {
        Some(path) => format!("invalid config {}: {err}", path.display()),
        None => format!("invalid config: {err}"),
    })?;
    Ok(config)
}

pub fn build_client(config: &Config) -> Result<HttpTrainingClient, String> {
    HttpTrainingClient::new(&config.api.base_url, config.api.timeout_ms)
        .map_err(|err| format!("failed to init training api client: {err}"))
}
