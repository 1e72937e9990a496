//! Model Gateway Calls
//!
//! Thin helper around [`LlmProvider::send_message`]: replays the turn
//! history, appends the new user message, and returns the response text.

use codeplan_llm::{LlmProvider, LlmRequestOptions, Message};
use tracing::debug;

use crate::utils::error::AppResult;

use super::types::ConversationTurn;

/// Send `message` after `history` and return the model's text.
///
/// A response without text yields an empty string; upstream failures are
/// returned as [`AppError::Llm`](crate::utils::error::AppError::Llm).
pub async fn complete(
    provider: &dyn LlmProvider,
    system: Option<&str>,
    history: &[ConversationTurn],
    message: String,
    options: LlmRequestOptions,
) -> AppResult<String> {
    let mut messages: Vec<Message> = history.iter().map(ConversationTurn::to_message).collect();
    messages.push(Message::user(message));

    let response = provider
        .send_message(messages, system.map(str::to_string), options)
        .await?;

    let text = response.text().unwrap_or_default().to_string();
    debug!(
        provider = provider.name(),
        history = history.len(),
        len = text.len(),
        output_tokens = response.usage.output_tokens,
        "gateway: completion received"
    );
    Ok(text)
}
