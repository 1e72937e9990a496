//! Session Orchestrator
//!
//! Drives one conversation: classify each user message, then either answer
//! it or plan tasks and execute them strictly in order against the live
//! file set. State is owned by the session and mutated only inside
//! [`Orchestrator::submit_with_cancel`]; observers get owned snapshots over
//! a broadcast channel.

use std::sync::Arc;

use codeplan_llm::LlmProvider;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::settings::{AppConfig, DEFAULT_MAX_SNAPSHOT_CHARS};
use crate::services::project::{canonical_file_map, ProjectStore};
use crate::utils::error::{AppError, AppResult};

use super::classifier::classify_query;
use super::executor::execute_task;
use super::planner::plan_tasks;
use super::prompts::PromptContext;
use super::responder::respond;
use super::types::{
    file_map_to_value, ConversationTurn, FileMap, FileSetDelta, PlanRunReport, PlannedTask,
    QueryKind, RunStop, SessionEvent, SessionPhase, TaskStatus, TurnOutcome,
};

/// Capacity of the session event channel.
pub const SESSION_EVENT_CAPACITY: usize = 256;

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Budget for the file snapshot embedded in prompts
    pub max_snapshot_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_snapshot_chars: DEFAULT_MAX_SNAPSHOT_CHARS,
        }
    }
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_snapshot_chars: config.max_snapshot_chars,
        }
    }
}

/// One conversation session.
///
/// `submit*` take `&mut self`, so a session runs at most one turn, and
/// therefore at most one model call, at a time.
pub struct Orchestrator {
    session_id: String,
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn ProjectStore>,
    config: OrchestratorConfig,
    history: Vec<ConversationTurn>,
    plan: Vec<PlannedTask>,
    files: FileMap,
    phase: SessionPhase,
    events: broadcast::Sender<SessionEvent>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn ProjectStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            provider,
            store,
            config,
            history: Vec::new(),
            plan: Vec::new(),
            files: FileMap::new(),
            phase: SessionPhase::Idle,
            events,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Dialogue so far, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Tasks of the current planning round.
    pub fn plan(&self) -> &[PlannedTask] {
        &self.plan
    }

    /// Live file set as of the last execution.
    pub fn files(&self) -> &FileMap {
        &self.files
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_planning(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Classifying | SessionPhase::Planning
        )
    }

    pub fn is_executing(&self) -> bool {
        self.phase == SessionPhase::Executing
    }

    pub fn has_project(&self) -> bool {
        self.store.load_current_project().is_some()
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Drop the current task list.
    pub fn reset_plan(&mut self) {
        self.plan.clear();
        self.publish_plan();
    }

    /// Submit a user message with no external cancellation.
    pub async fn submit(&mut self, text: &str) -> AppResult<TurnOutcome> {
        self.submit_with_cancel(text, CancellationToken::new()).await
    }

    /// Submit a user message.
    ///
    /// The user turn is recorded before any model call and stays recorded
    /// if the turn fails. `cancel` is checked before each task starts; a
    /// task already in flight runs to completion.
    pub async fn submit_with_cancel(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> AppResult<TurnOutcome> {
        let query = text.trim();
        if query.is_empty() {
            return Err(AppError::validation("query is required"));
        }

        let prior_len = self.history.len();
        self.append_turn(ConversationTurn::user(query));

        let outcome = self.run_turn(query, prior_len, &cancel).await;
        self.set_phase(SessionPhase::Idle);
        if let Err(err) = &outcome {
            warn!(session_id = %self.session_id, error = %err, "orchestrator: turn failed");
        }
        outcome
    }

    async fn run_turn(
        &mut self,
        query: &str,
        prior_len: usize,
        cancel: &CancellationToken,
    ) -> AppResult<TurnOutcome> {
        self.set_phase(SessionPhase::Classifying);
        let kind = classify_query(self.provider.as_ref(), query).await?;
        debug!(session_id = %self.session_id, %kind, "orchestrator: classified");

        match kind {
            QueryKind::General => {
                self.set_phase(SessionPhase::Responding);
                let prior = self.history[..prior_len].to_vec();
                let text = respond(self.provider.as_ref(), query, &prior).await?;
                self.append_turn(ConversationTurn::model(text.clone()));
                Ok(TurnOutcome::Responded { text })
            }
            QueryKind::Plan => {
                let report = self.plan_and_execute(query, prior_len, cancel).await?;
                Ok(TurnOutcome::Planned(report))
            }
        }
    }

    async fn plan_and_execute(
        &mut self,
        query: &str,
        prior_len: usize,
        cancel: &CancellationToken,
    ) -> AppResult<PlanRunReport> {
        self.set_phase(SessionPhase::Planning);

        let project = self.store.load_current_project().map(|mut project| {
            project.files = canonical_file_map(project.files);
            project
        });
        let snapshot = project.as_ref().map(|p| file_map_to_value(&p.files));
        let prior = self.history[..prior_len].to_vec();
        let ctx = PromptContext::new(&prior)
            .with_code(snapshot.as_ref())
            .with_max_snapshot_chars(self.config.max_snapshot_chars);

        let items = plan_tasks(self.provider.as_ref(), query, ctx).await?;
        self.plan = items
            .into_iter()
            .map(|item| PlannedTask::pending(item.task))
            .collect();
        self.publish_plan();
        self.append_turn(ConversationTurn::model(format!(
            "Planned {} task(s). I will execute them one by one.",
            self.plan.len()
        )));
        info!(
            session_id = %self.session_id,
            tasks = self.plan.len(),
            "orchestrator: plan created"
        );

        let Some(project) = project else {
            debug!(session_id = %self.session_id, "orchestrator: no project, skipping execution");
            return Ok(self.report(RunStop::NoProject));
        };

        self.set_phase(SessionPhase::Executing);
        self.files = project.files;
        let stop = self
            .execute_plan(query, &prior, &project.id, cancel)
            .await;
        Ok(self.report(stop))
    }

    /// Run the planned tasks in order; stop at the first failure.
    async fn execute_plan(
        &mut self,
        query: &str,
        prior: &[ConversationTurn],
        project_id: &str,
        cancel: &CancellationToken,
    ) -> RunStop {
        for index in 0..self.plan.len() {
            if cancel.is_cancelled() {
                info!(session_id = %self.session_id, next_index = index, "orchestrator: cancelled");
                return RunStop::Cancelled { next_index: index };
            }

            self.plan[index].status = TaskStatus::Running;
            self.publish_plan();

            let title = self.plan[index].title.clone();
            let code = file_map_to_value(&self.files);
            let ctx = PromptContext::new(prior)
                .with_code(Some(&code))
                .with_max_snapshot_chars(self.config.max_snapshot_chars);

            match execute_task(self.provider.as_ref(), &title, Some(query), ctx).await {
                Ok(result) => {
                    let changed = canonical_file_map(result.file_map());
                    if !changed.is_empty() {
                        self.files
                            .extend(changed.iter().map(|(k, v)| (k.clone(), v.clone())));
                        let _ = self.events.send(SessionEvent::FilesChanged(FileSetDelta {
                            project_id: project_id.to_string(),
                            changed,
                            snapshot: self.files.clone(),
                        }));
                    }
                    let task = &mut self.plan[index];
                    task.status = TaskStatus::Completed;
                    task.explanation = Some(result.explanation);
                    debug!(
                        session_id = %self.session_id,
                        task_index = index,
                        degraded = result.raw.is_some(),
                        "orchestrator: task completed"
                    );
                    self.publish_plan();
                }
                Err(err) => {
                    warn!(
                        session_id = %self.session_id,
                        task_index = index,
                        error = %err,
                        "orchestrator: task failed, halting queue"
                    );
                    self.plan[index].status = TaskStatus::Failed;
                    self.publish_plan();
                    return RunStop::Failed {
                        index,
                        reason: err.to_string(),
                    };
                }
            }
        }

        RunStop::Finished
    }

    fn report(&self, stop: RunStop) -> PlanRunReport {
        PlanRunReport {
            tasks: self.plan.clone(),
            stop,
        }
    }

    fn append_turn(&mut self, turn: ConversationTurn) {
        self.history.push(turn.clone());
        let _ = self.events.send(SessionEvent::TurnAppended { turn });
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            self.phase = phase;
            let _ = self.events.send(SessionEvent::PhaseChanged { phase });
        }
    }

    fn publish_plan(&self) {
        let _ = self.events.send(SessionEvent::PlanUpdated {
            tasks: self.plan.clone(),
        });
    }
}
