//! Task Executor
//!
//! Runs one planned task against the model and normalizes whatever came
//! back into an [`ExecutionResult`]. Malformed output never fails the task:
//! it degrades to an empty file map with the raw text attached.

use std::collections::BTreeMap;

use codeplan_core::{recover, JsonShape, Recovered};
use codeplan_llm::{LlmProvider, LlmRequestOptions};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::utils::error::{AppError, AppResult};

use super::gateway::complete;
use super::prompts::{execute_prompt, PromptContext, EXECUTE_SYSTEM_INSTRUCTION};
use super::types::{ExecutionResult, FilePayload};

/// Explanation used when the model returned JSON without one.
pub const DEFAULT_EXPLANATION: &str = "Task executed successfully";

/// Explanation used when no JSON object could be recovered.
pub const DEGRADED_EXPLANATION: &str = "Model did not return JSON. Raw output returned.";

/// Execute a single task.
///
/// `query` is the user request the task was planned from, if known.
pub async fn execute_task(
    provider: &dyn LlmProvider,
    task: &str,
    query: Option<&str>,
    ctx: PromptContext<'_>,
) -> AppResult<ExecutionResult> {
    if task.trim().is_empty() {
        return Err(AppError::validation("task is required"));
    }

    let prompt = execute_prompt(
        task,
        query.unwrap_or(""),
        &ctx.rendered_code(),
        &ctx.rendered_history(),
    );
    let text = complete(
        provider,
        Some(EXECUTE_SYSTEM_INSTRUCTION),
        ctx.history,
        prompt,
        LlmRequestOptions::default(),
    )
    .await?;

    Ok(normalize_execution(&text))
}

/// Recover an object from raw model text and normalize its file map.
pub fn normalize_execution(text: &str) -> ExecutionResult {
    match recover(text, JsonShape::Object) {
        Recovered::Parsed(Value::Object(object)) => {
            let result = normalize_object(&object);
            debug!(
                files = result.files.len(),
                "executor: execution output normalized"
            );
            result
        }
        Recovered::Parsed(_) | Recovered::Unrecovered(_) => {
            warn!(len = text.len(), "executor: no JSON object in model output");
            ExecutionResult {
                explanation: DEGRADED_EXPLANATION.to_string(),
                files: BTreeMap::new(),
                raw: Some(text.to_string()),
            }
        }
    }
}

/// Accepts `files: {path: {code}}`, `files: {path: code}` and
/// `commands: [{file_path, content}]`. Command entries are applied after
/// `files`, so they win on a shared path.
fn normalize_object(object: &Map<String, Value>) -> ExecutionResult {
    let mut files = BTreeMap::new();

    if let Some(Value::Object(entries)) = object.get("files") {
        for (path, value) in entries {
            if let Some(code) = file_code(value) {
                files.insert(path.clone(), FilePayload { code });
            }
        }
    }

    if let Some(Value::Array(commands)) = object.get("commands") {
        for command in commands {
            let path = command.get("file_path").and_then(Value::as_str);
            let content = command.get("content").and_then(Value::as_str);
            if let (Some(path), Some(content)) = (path, content) {
                files.insert(
                    path.to_string(),
                    FilePayload {
                        code: content.to_string(),
                    },
                );
            }
        }
    }

    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string();

    ExecutionResult {
        explanation,
        files,
        raw: None,
    }
}

/// Code for one `files` entry: `{code: "..."}` with non-empty code, or a
/// bare string.
fn file_code(value: &Value) -> Option<String> {
    match value {
        Value::String(code) => Some(code.clone()),
        Value::Object(payload) => payload
            .get("code")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
