//! Codeplan - plan-execute orchestration for model-driven code changes
//!
//! This library provides:
//! - Query classification, task planning and task execution services
//! - The session orchestrator and its event stream
//! - Project stores backed by memory or a directory
//! - The HTTP surface and configuration loading

pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::AppConfig;
pub use services::plan_mode::{Orchestrator, OrchestratorConfig, SessionEvent, TurnOutcome};
pub use services::project::{DirectoryProjectStore, InMemoryProjectStore, ProjectStore};
pub use state::AppState;
pub use storage::config::load_config;
pub use utils::error::{AppError, AppResult};
