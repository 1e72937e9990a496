//! Task Planner
//!
//! Turns a user request into an ordered list of atomic tasks. The model is
//! told to answer with a raw JSON array of `{task}` objects; when it does
//! not, the response goes through structured output recovery and finally a
//! line-based fallback, so planning never fails on malformed text.

use std::sync::LazyLock;

use codeplan_core::{recover, JsonShape, Recovered};
use codeplan_llm::{LlmProvider, LlmRequestOptions};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::utils::error::{AppError, AppResult};

use super::gateway::complete;
use super::prompts::{plan_prompt, PromptContext, PLAN_SYSTEM_INSTRUCTION};
use super::types::TaskItem;

/// Leading list decoration: bullets, quote markers, headings, `1.` / `2)` / `(3)`.
static LINE_DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+•>#]+\s*|\d+\s*[.):]\s*|\(\d+\)\s*|\[\s*[ xX]?\s*\]\s*)+")
        .expect("line decoration pattern is valid")
});

/// A `"task": "..."` fragment left over from a broken JSON object.
static TASK_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{?\s*"(?:task|title)"\s*:\s*"(.*)"\s*\}?\s*,?$"#)
        .expect("task fragment pattern is valid")
});

/// Keys checked, in order, when an array element is an object.
const TITLE_KEYS: [&str; 3] = ["task", "title", "description"];

/// Plan the tasks for `query`.
///
/// Returns at least one task. Only an empty query or an upstream failure
/// is an error.
pub async fn plan_tasks(
    provider: &dyn LlmProvider,
    query: &str,
    ctx: PromptContext<'_>,
) -> AppResult<Vec<TaskItem>> {
    if query.trim().is_empty() {
        return Err(AppError::validation("query is required"));
    }

    let prompt = plan_prompt(query, &ctx.rendered_code(), &ctx.rendered_history());
    let text = complete(
        provider,
        Some(PLAN_SYSTEM_INSTRUCTION),
        ctx.history,
        prompt,
        LlmRequestOptions::default(),
    )
    .await?;

    let tasks = parse_tasks(&text, query);
    debug!(count = tasks.len(), len = text.len(), "planner: tasks planned");
    Ok(tasks)
}

/// Interpret raw planner output. Never returns an empty list.
///
/// The JSON stages (direct, fenced, balanced span) come from
/// [`recover`]; an array with no usable element falls through to the line
/// fallback. `query` is the last resort when the text has no content.
pub fn parse_tasks(text: &str, query: &str) -> Vec<TaskItem> {
    if let Recovered::Parsed(Value::Array(items)) = recover(text, JsonShape::Array) {
        if let Some(tasks) = tasks_from_array(&items) {
            return tasks;
        }
        debug!(
            elements = items.len(),
            "planner: recovered array has no usable tasks"
        );
    }

    let tasks = tasks_from_lines(text);
    if !tasks.is_empty() {
        warn!(count = tasks.len(), "planner: fell back to line splitting");
        return tasks;
    }

    let raw = text.trim();
    let single = if raw.chars().any(char::is_alphanumeric) {
        raw.to_string()
    } else {
        query.trim().to_string()
    };
    warn!("planner: no task lines, using a single task");
    vec![TaskItem::new(single)]
}

/// Map a parsed array 1:1 onto tasks. `None` when no element is usable.
fn tasks_from_array(items: &[Value]) -> Option<Vec<TaskItem>> {
    let titles: Vec<Option<String>> = items.iter().map(element_title).collect();
    if titles.iter().all(Option::is_none) {
        return None;
    }
    Some(
        titles
            .into_iter()
            .enumerate()
            .map(|(i, title)| TaskItem::new(title.unwrap_or_else(|| format!("Task {}", i + 1))))
            .collect(),
    )
}

fn element_title(item: &Value) -> Option<String> {
    let text = match item {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => TITLE_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str)),
        _ => None,
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// One task per meaningful line, with list decoration removed.
fn tasks_from_lines(text: &str) -> Vec<TaskItem> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```") && !is_punctuation_only(line))
        .enumerate()
        .map(|(i, line)| {
            let cleaned = clean_line(line);
            if cleaned.is_empty() {
                TaskItem::new(format!("Task {}", i + 1))
            } else {
                TaskItem::new(cleaned)
            }
        })
        .collect()
}

fn is_punctuation_only(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '[' | ']' | '{' | '}' | ',' | ';') || c.is_whitespace())
}

/// Strip list decoration, unwrap `"task": "..."` fragments, then drop
/// trailing commas and wrapping quotes.
fn clean_line(line: &str) -> String {
    let stripped = LINE_DECORATION.replace(line, "");
    let stripped = stripped.trim();

    let body = match TASK_FRAGMENT.captures(stripped) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).to_string(),
        None => stripped.to_string(),
    };

    let body = body.trim().trim_end_matches(',').trim();
    let body = strip_wrapping(body, '"');
    let body = strip_wrapping(body, '\'');
    let body = strip_wrapping(body, '`');
    body.trim().to_string()
}

fn strip_wrapping(text: &str, quote: char) -> &str {
    text.strip_prefix(quote)
        .and_then(|rest| rest.strip_suffix(quote))
        .unwrap_or(text)
}
