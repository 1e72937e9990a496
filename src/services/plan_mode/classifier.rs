//! Query Classifier
//!
//! Routes a user message to either a plain answer (`general`) or a
//! plan-and-execute round (`plan`).

use codeplan_llm::{LlmProvider, LlmRequestOptions};
use tracing::debug;

use crate::utils::error::{AppError, AppResult};

use super::gateway::complete;
use super::prompts::{classify_prompt, CLASSIFY_SYSTEM_INSTRUCTION};
use super::types::QueryKind;

/// Classify a user query.
///
/// Only an empty query is an error. Any reply containing "plan" routes to
/// [`QueryKind::Plan`]; everything else, including empty or rambling
/// replies, is [`QueryKind::General`].
pub async fn classify_query(provider: &dyn LlmProvider, query: &str) -> AppResult<QueryKind> {
    if query.trim().is_empty() {
        return Err(AppError::validation("query is required"));
    }

    let options = LlmRequestOptions {
        temperature_override: Some(0.0),
        ..Default::default()
    };
    let reply = complete(
        provider,
        Some(CLASSIFY_SYSTEM_INSTRUCTION),
        &[],
        classify_prompt(query),
        options,
    )
    .await?;

    let kind = interpret_reply(&reply);
    debug!(%kind, reply = %reply.trim(), "classifier: query classified");
    Ok(kind)
}

/// Map a raw classifier reply onto a route.
pub fn interpret_reply(reply: &str) -> QueryKind {
    if reply.trim().to_lowercase().contains("plan") {
        QueryKind::Plan
    } else {
        QueryKind::General
    }
}
