//! Settings Models
//!
//! Runtime configuration for the orchestration engine and its server.

use codeplan_llm::{ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};

/// Default budget for the file snapshot embedded in planning/execution prompts.
pub const DEFAULT_MAX_SNAPSHOT_CHARS: usize = 24_000;

/// Application configuration, usually read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model gateway backend
    pub provider: ProviderType,
    /// Model name passed to the gateway
    pub model: String,
    /// API key; falls back to the provider's environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Output token cap per model call
    pub max_tokens: u32,
    /// Whole-request timeout for model calls, in seconds
    pub request_timeout_secs: u64,
    /// HTTP listen address
    pub bind: String,
    /// Default tracing filter (overridden by RUST_LOG)
    pub log_level: String,
    /// Character budget for file snapshots embedded in prompts
    pub max_snapshot_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Gemini,
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 8192,
            request_timeout_secs: 120,
            bind: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            max_snapshot_chars: DEFAULT_MAX_SNAPSHOT_CHARS,
        }
    }
}

impl AppConfig {
    /// Fill gaps and apply overrides from the environment.
    ///
    /// - `api_key` is taken from `GEMINI_API_KEY` / `OPENAI_API_KEY` when unset
    /// - `PORT` replaces the port of `bind`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            if let Some(key) = lookup(self.provider.api_key_env()).filter(|k| !k.trim().is_empty())
            {
                self.api_key = Some(key);
            }
        }

        if let Some(port) = lookup("PORT").filter(|p| !p.trim().is_empty()) {
            let host = match self.bind.rsplit_once(':') {
                Some((host, _)) => host.to_string(),
                None => self.bind.clone(),
            };
            self.bind = format!("{}:{}", host, port.trim());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.temperature
            ));
        }

        if self.max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }

        if self.max_snapshot_chars < 256 {
            return Err("max_snapshot_chars must be at least 256".to_string());
        }

        if self.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.bind));
        }

        Ok(())
    }

    /// Gateway configuration derived from these settings.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}
