//! LLM Provider Trait
//!
//! Defines the interface that all model gateways implement.

use std::sync::Arc;

use async_trait::async_trait;

use super::gemini::GeminiProvider;
use super::openai::OpenAIProvider;
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ProviderType,
};

/// Trait for LLM providers.
///
/// Implementations are stateless per request: every call carries the full
/// conversation, so a single provider can be shared across sessions.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "gemini", "openai")
    fn name(&self) -> &'static str;

    /// Get the current model being used
    fn model(&self) -> &str;

    /// Send a message and wait for the complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history, ending with the new user message
    /// * `system` - Optional system instruction
    /// * `request_options` - Per-call overrides
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable and the API key is accepted.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Build the provider named by the configuration.
pub fn build_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    if config
        .api_key
        .as_deref()
        .map_or(true, |key| key.trim().is_empty())
    {
        return Err(missing_api_key_error(&config.provider.to_string()));
    }
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Gemini => Arc::new(GeminiProvider::new(config)?),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
    };
    tracing::debug!(
        provider = provider.name(),
        model = provider.model(),
        "llm: provider built"
    );
    Ok(provider)
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a transport failure onto the gateway error taxonomy.
pub(crate) fn network_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::NetworkError {
            message: format!("request timed out: {}", err),
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}
