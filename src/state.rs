//! Application State
//!
//! Shared, read-only state handed to every HTTP handler.

use std::sync::Arc;

use codeplan_llm::{build_provider, LlmProvider};

use crate::models::settings::AppConfig;
use crate::utils::error::AppResult;

/// State shared across requests. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Model gateway used by every request
    pub provider: Arc<dyn LlmProvider>,
    /// Validated configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AppConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
        }
    }

    /// Build the provider described by `config`.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let provider = build_provider(config.provider_config())?;
        Ok(Self::new(provider, config))
    }

    /// Snapshot budget applied to prompts built for this state.
    pub fn max_snapshot_chars(&self) -> usize {
        self.config.max_snapshot_chars
    }
}
