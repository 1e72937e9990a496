//! Plan Mode Service
//!
//! The plan-execute pipeline:
//! - Query classification into general questions and change requests
//! - Task planning with tolerant parsing of model output
//! - Per-task execution with file map normalization
//! - General responses
//! - The session orchestrator that sequences all of the above

pub mod classifier;
pub mod executor;
pub mod gateway;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod responder;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::classify_query;
pub use executor::{execute_task, normalize_execution};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use planner::{parse_tasks, plan_tasks};
pub use prompts::PromptContext;
pub use responder::respond;
pub use types::{
    history_from_items, ConversationTurn, ExecutionResult, FileMap, FilePayload, FileSetDelta,
    HistoryItem, PlanRunReport, PlannedTask, QueryKind, RunStop, SessionEvent, SessionPhase,
    TaskItem, TaskStatus, TurnOutcome,
};
