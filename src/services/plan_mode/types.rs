//! Plan Mode Core Types
//!
//! Data structures shared by the classifier, planner, executor and the
//! session orchestrator. Everything here is serde-friendly so the same
//! values travel over HTTP and through the session event channel.

use std::collections::BTreeMap;

use codeplan_llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Project-relative path -> source text.
pub type FileMap = BTreeMap<String, String>;

// ============================================================================
// Conversation
// ============================================================================

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

/// One entry of the append-only dialogue history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }

    /// Gateway message for this turn.
    pub fn to_message(&self) -> Message {
        let role = match self.role {
            TurnRole::User => MessageRole::User,
            TurnRole::Model => MessageRole::Assistant,
        };
        Message::text(role, self.text.clone())
    }
}

/// History item as sent by clients: either `{role, text}` or the
/// Gemini-style `{role, parts: [{text}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub role: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub parts: Vec<HistoryPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl HistoryItem {
    /// Convert to a turn; unknown roles and empty items yield `None`.
    pub fn into_turn(self) -> Option<ConversationTurn> {
        let role = match self.role.trim().to_ascii_lowercase().as_str() {
            "user" => TurnRole::User,
            "model" | "assistant" => TurnRole::Model,
            _ => return None,
        };
        let text = match self.text {
            Some(text) => text,
            None => self
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        if text.trim().is_empty() {
            return None;
        }
        Some(ConversationTurn { role, text })
    }
}

/// Convert a client-supplied history into turns, dropping unusable items.
pub fn history_from_items(items: Vec<HistoryItem>) -> Vec<ConversationTurn> {
    items.into_iter().filter_map(HistoryItem::into_turn).collect()
}

// ============================================================================
// Classification
// ============================================================================

/// Routing decision for a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    General,
    Plan,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::General => write!(f, "general"),
            QueryKind::Plan => write!(f, "plan"),
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Planner output item, wire shape `{ "task": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub task: String,
}

impl TaskItem {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }
}

/// Execution status of a planned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A task tracked by the session during one planning round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl PlannedTask {
    /// New pending task with a fresh id.
    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: TaskStatus::Pending,
            explanation: None,
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Generated content for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub code: String,
}

/// Normalized output of one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub explanation: String,
    pub files: BTreeMap<String, FilePayload>,
    /// Raw model text, kept only when structured recovery failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ExecutionResult {
    /// Whether the model output could not be interpreted.
    pub fn is_degraded(&self) -> bool {
        self.raw.is_some()
    }

    /// Flatten `{path: {code}}` into `path -> code`.
    pub fn file_map(&self) -> FileMap {
        self.files
            .iter()
            .map(|(path, payload)| (path.clone(), payload.code.clone()))
            .collect()
    }
}

/// Render a file map as a JSON object for prompt embedding.
pub fn file_map_to_value(files: &FileMap) -> Value {
    Value::Object(
        files
            .iter()
            .map(|(path, code)| (path.clone(), Value::String(code.clone())))
            .collect(),
    )
}

// ============================================================================
// Session state & events
// ============================================================================

/// Where the session is within a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Classifying,
    Responding,
    Planning,
    Executing,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Classifying => write!(f, "Classifying"),
            SessionPhase::Responding => write!(f, "Responding"),
            SessionPhase::Planning => write!(f, "Planning"),
            SessionPhase::Executing => write!(f, "Executing"),
        }
    }
}

/// Files written by one task, plus the full live file set after the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSetDelta {
    pub project_id: String,
    pub changed: FileMap,
    pub snapshot: FileMap,
}

/// Notifications published by a session. Payloads are owned snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged { phase: SessionPhase },
    TurnAppended { turn: ConversationTurn },
    PlanUpdated { tasks: Vec<PlannedTask> },
    FilesChanged(FileSetDelta),
}

/// Why the execution loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStop {
    /// Every task completed.
    Finished,
    /// Task `index` failed; later tasks were not attempted.
    Failed { index: usize, reason: String },
    /// Cancelled before task `next_index` started.
    Cancelled { next_index: usize },
    /// No project is materialized, so nothing was executed.
    NoProject,
}

/// Final state of a planning round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRunReport {
    pub tasks: Vec<PlannedTask>,
    pub stop: RunStop,
}

impl PlanRunReport {
    pub fn completed_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }
}

/// Result of submitting one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnOutcome {
    Responded { text: String },
    Planned(PlanRunReport),
}
