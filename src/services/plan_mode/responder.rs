//! General Responder
//!
//! Answers informational queries with a single model call.

use codeplan_llm::{LlmProvider, LlmRequestOptions};
use tracing::debug;

use crate::utils::error::{AppError, AppResult};

use super::gateway::complete;
use super::prompts::RESPOND_SYSTEM_INSTRUCTION;
use super::types::ConversationTurn;

/// Answer `query` in the context of `history`.
///
/// An empty model reply is returned as an empty string.
pub async fn respond(
    provider: &dyn LlmProvider,
    query: &str,
    history: &[ConversationTurn],
) -> AppResult<String> {
    if query.trim().is_empty() {
        return Err(AppError::validation("query is required"));
    }

    let text = complete(
        provider,
        Some(RESPOND_SYSTEM_INSTRUCTION),
        history,
        query.to_string(),
        LlmRequestOptions::default(),
    )
    .await?;
    debug!(len = text.len(), "responder: reply generated");
    Ok(text)
}
