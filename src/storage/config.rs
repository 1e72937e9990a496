//! JSON Configuration Loading
//!
//! Reads the configuration file, layers environment overrides on top, and
//! validates the result.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Load configuration from `path` (or defaults when `None`), then apply
/// environment overrides and validate.
pub fn load_config(path: Option<&Path>) -> AppResult<AppConfig> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with_env<F>(path: Option<&Path>, lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env(lookup);
    config.validate().map_err(AppError::config)?;
    debug!(
        provider = %config.provider,
        model = %config.model,
        bind = %config.bind,
        "config: loaded"
    );
    Ok(config)
}

/// Load configuration from a file
fn load_from_file(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        return Err(AppError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}
