//! Prompt Templates
//!
//! Fixed instructions for classification, planning, execution and general
//! responses, plus helpers that embed the project snapshot and recent
//! history into a prompt under a character budget.

use serde_json::Value;

use crate::models::settings::DEFAULT_MAX_SNAPSHOT_CHARS;

use super::types::{ConversationTurn, TurnRole};

/// System instruction for classification calls.
pub const CLASSIFY_SYSTEM_INSTRUCTION: &str = "Return only one word.";

/// Number of trailing turns rendered into the "Recent history" prompt block.
pub const RECENT_HISTORY_TURNS: usize = 10;

pub const PLAN_SYSTEM_INSTRUCTION: &str = "\
You are a senior AI code planner. Produce a concise, actionable breakdown of tasks to modify a JavaScript/TypeScript full-stack project. Keep tasks atomic and implementation-ready, but do not write code yet.
- Keep outputs as a JSON-friendly list of task objects: [{ \"task\": \"...\" }].
- Avoid preambles or explanations; only the tasks.
- Prefer 1-4 tasks (maximum 5) depending on scope.
- OUTPUT FORMAT IS STRICT: Return ONLY a raw JSON array (no markdown fences, no prose, no explanation).
- Do NOT wrap the output in ``` or include a language label like json.
- Example valid output: [{ \"task\": \"Task 1\" }, { \"task\": \"Task 2\" }]";

pub const EXECUTE_SYSTEM_INSTRUCTION: &str = "\
You are an AI code generation agent. You must produce changes to files only in structured JSON form.
Always follow this schema:
{
  \"explanation\": string,
  \"files\": {
    \"<path>\": { \"code\": string }
  }
}
Notes:
- Include only changed/created files that are necessary.
- Ensure the code is complete and directly runnable with proper imports.
- Keep explanation short, describing what changed and why.";

pub const RESPOND_SYSTEM_INSTRUCTION: &str = "\
You are a helpful assistant inside a coding workspace. Answer the user's question directly and concisely.
Do not propose file changes or output code edits unless the user explicitly asks for an example.";

/// Project snapshot and history shared by planning and execution prompts.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Current code; a string is embedded verbatim, anything else as JSON
    pub code: Option<&'a Value>,
    /// Prior turns, replayed to the model and summarized in the prompt
    pub history: &'a [ConversationTurn],
    /// Budget for the embedded code
    pub max_snapshot_chars: usize,
}

impl<'a> PromptContext<'a> {
    pub fn new(history: &'a [ConversationTurn]) -> Self {
        Self {
            code: None,
            history,
            max_snapshot_chars: DEFAULT_MAX_SNAPSHOT_CHARS,
        }
    }

    pub fn with_code(mut self, code: Option<&'a Value>) -> Self {
        self.code = code;
        self
    }

    pub fn with_max_snapshot_chars(mut self, max_chars: usize) -> Self {
        self.max_snapshot_chars = max_chars;
        self
    }

    pub fn rendered_code(&self) -> String {
        render_code(self.code, self.max_snapshot_chars)
    }

    pub fn rendered_history(&self) -> String {
        render_history(self.history)
    }
}

/// Classification prompt for one user query.
pub fn classify_prompt(query: &str) -> String {
    format!(
        "You are a routing classifier for a coding assistant.
Return ONLY one word: general or plan.

Rules:
- general: greetings (hi, hello), chit-chat, \"what is\", explanations, or any question/answer that does not require editing code or changing the project.
- plan: when the user requests to implement, modify, refactor, add, remove, or otherwise change files, code, config, dependencies, or run steps.

User query: \"{query}\"

Respond with exactly one of: general or plan."
    )
}

/// Planning prompt.
pub fn plan_prompt(query: &str, code: &str, history: &str) -> String {
    format!(
        "Project planning request.

Context:
Query:
{query}

Existing code (may be partial):
{code}

Recent history:
{history}

Output strictly as an array of objects like:
[
  {{ \"task\": \"Task 1\" }},
  {{ \"task\": \"Task 2\" }}
]
Return ONLY the JSON array. Do not include code fences or any extra text."
    )
}

/// Execution prompt for a single task.
pub fn execute_prompt(task: &str, query: &str, code: &str, history: &str) -> String {
    format!(
        "Implement the following task in the given project.

Task:
{task}

User query:
{query}

Existing code (may be partial):
{code}

Recent history:
{history}

Return ONLY the JSON per the schema (no triple backticks, no prose)."
    )
}

/// Render the project snapshot for a prompt: strings verbatim, anything
/// else as compact JSON, cut to `max_chars`.
pub fn render_code(code: Option<&Value>, max_chars: usize) -> String {
    let text = match code {
        None | Some(Value::Null) => return "(none)".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    truncate_chars(&text, max_chars)
}

/// Render the trailing turns of a history as `role: text` lines.
pub fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }
    let start = history.len().saturating_sub(RECENT_HISTORY_TURNS);
    history[start..]
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            };
            format!("{}: {}", role, turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max_chars` characters and append a marker with
/// the original length. Never splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    format!("{}...\n[Truncated — {} chars total]", &text[..cut], total)
}
