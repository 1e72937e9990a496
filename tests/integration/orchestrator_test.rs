//! Orchestrator Integration Tests
//!
//! Full sessions against a scripted provider and an in-memory project:
//! - General questions answered without a plan
//! - Plans executed in order with file merges visible to later tasks
//! - Failure halts the queue, cancellation stops at task boundaries
//! - No project means no execution

use std::sync::Arc;

use codeplan::services::plan_mode::{
    ConversationTurn, FileMap, Orchestrator, OrchestratorConfig, RunStop, SessionEvent,
    SessionPhase, TaskStatus, TurnOutcome,
};
use codeplan::services::project::{DirectoryProjectStore, InMemoryProjectStore};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use crate::support::{quota_error, ScriptedProvider};

fn project(files: &[(&str, &str)]) -> Arc<InMemoryProjectStore> {
    let files: FileMap = files
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(InMemoryProjectStore::with_project("demo", files))
}

fn session(provider: &Arc<ScriptedProvider>, store: Arc<InMemoryProjectStore>) -> Orchestrator {
    Orchestrator::new(provider.clone(), store, OrchestratorConfig::default())
}

fn statuses(outcome: &TurnOutcome) -> Vec<TaskStatus> {
    match outcome {
        TurnOutcome::Planned(report) => report.tasks.iter().map(|t| t.status).collect(),
        TurnOutcome::Responded { .. } => Vec::new(),
    }
}

fn stop(outcome: &TurnOutcome) -> Option<&RunStop> {
    match outcome {
        TurnOutcome::Planned(report) => Some(&report.stop),
        TurnOutcome::Responded { .. } => None,
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_greeting_gets_a_reply_and_no_plan() {
    let provider = Arc::new(ScriptedProvider::texts(&["general", "Hello! What are we building?"]));
    let mut session = session(&provider, project(&[("/App.js", "app")]));

    let outcome = session.submit("hi").await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Responded { .. }));
    assert_eq!(session.history().len(), 2);
    assert!(session.plan().is_empty());
    assert_eq!(provider.calls()[0].system.as_deref(), Some("Return only one word."));
}

#[tokio::test]
async fn test_login_button_round() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"[{"task": "Create Login button component"}]"#,
        r#"{"explanation": "Added button", "files": {"src/Login.js": {"code": "..."}}}"#,
    ]));
    let mut session = session(&provider, project(&[("/App.js", "app")]));

    let outcome = session.submit("add a login button").await.unwrap();

    assert_eq!(stop(&outcome), Some(&RunStop::Finished));
    assert_eq!(statuses(&outcome), vec![TaskStatus::Completed]);
    assert_eq!(session.files()["src/Login.js"], "...");
    assert_eq!(session.plan()[0].explanation.as_deref(), Some("Added button"));
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_malformed_execution_output_completes_task() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"["Create component"]"#,
        "Sure! Here's the code: {not valid json",
    ]));
    let mut session = session(&provider, project(&[("/App.js", "app")]));

    let outcome = session.submit("make a component").await.unwrap();

    assert_eq!(statuses(&outcome), vec![TaskStatus::Completed]);
    assert_eq!(session.files().len(), 1);
}

// ============================================================================
// Ordering and file visibility
// ============================================================================

#[tokio::test]
async fn test_tasks_run_in_order_and_see_earlier_writes() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"[{"task": "Create store"}, {"task": "Create hook"}, {"task": "Use hook in App"}]"#,
        r#"{"explanation": "store", "files": {"src/store.js": "export const store = {};"}}"#,
        r#"{"explanation": "hook", "files": {"src/useStore.js": {"code": "import { store } from './store';"}}}"#,
        r#"{"explanation": "app", "commands": [{"file_path": "/App.js", "content": "useStore();"}]}"#,
    ]));
    let mut session = session(&provider, project(&[("/App.js", "app")]));

    let outcome = session.submit("add a store").await.unwrap();
    assert_eq!(
        statuses(&outcome),
        vec![TaskStatus::Completed, TaskStatus::Completed, TaskStatus::Completed]
    );

    let calls = provider.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls[2].prompt().contains("Task:\nCreate store"));
    assert!(calls[3].prompt().contains("Task:\nCreate hook"));
    assert!(calls[4].prompt().contains("Task:\nUse hook in App"));

    // Each execution prompt carries what earlier tasks wrote
    assert!(calls[3].prompt().contains("src/store.js"));
    assert!(calls[4].prompt().contains("src/useStore.js"));

    assert_eq!(session.files()["App.js"], "useStore();");
    assert_eq!(session.files().len(), 3);
    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_file_events_carry_project_id_and_snapshot() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"[{"task": "A"}, {"task": "B"}]"#,
        r#"{"files": {"a.js": "a"}}"#,
        r#"{"files": {"b.js": "b"}}"#,
    ]));
    let mut session = session(&provider, project(&[]));
    let mut rx = session.subscribe();

    session.submit("two files").await.unwrap();

    let mut deltas = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::FilesChanged(delta) = event {
            deltas.push(delta);
        }
    }
    assert_eq!(deltas.len(), 2);
    assert!(deltas.iter().all(|d| d.project_id == "demo"));
    assert_eq!(deltas[1].snapshot.len(), 2);
    assert_eq!(deltas[1].changed.keys().collect::<Vec<_>>(), vec!["b.js"]);
}

// ============================================================================
// Failure, cancellation, no project
// ============================================================================

#[tokio::test]
async fn test_failure_mid_queue_leaves_rest_pending() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok("plan".to_string()),
        Ok(r#"[{"task": "A"}, {"task": "B"}, {"task": "C"}, {"task": "D"}]"#.to_string()),
        Ok(r#"{"files": {"a.js": "a"}}"#.to_string()),
        Err(quota_error()),
    ]));
    let mut session = session(&provider, project(&[]));

    let outcome = session.submit("four things").await.unwrap();

    assert_eq!(
        statuses(&outcome),
        vec![
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Pending,
            TaskStatus::Pending
        ]
    );
    match stop(&outcome) {
        Some(RunStop::Failed { index, reason }) => {
            assert_eq!(*index, 1);
            assert!(reason.contains("quota exceeded"));
        }
        other => panic!("unexpected stop: {:?}", other),
    }
    assert_eq!(provider.calls().len(), 4);
    assert!(session.files().contains_key("a.js"));
}

#[tokio::test]
async fn test_cancel_takes_effect_at_next_task_boundary() {
    let cancel = CancellationToken::new();
    // classify, plan, task 1 -> cancel after the third call completes
    let provider = Arc::new(
        ScriptedProvider::texts(&[
            "plan",
            r#"[{"task": "A"}, {"task": "B"}, {"task": "C"}]"#,
            r#"{"files": {"a.js": "a"}}"#,
        ])
        .cancel_after(3, cancel.clone()),
    );
    let mut session = session(&provider, project(&[]));

    let outcome = session
        .submit_with_cancel("three things", cancel)
        .await
        .unwrap();

    assert_eq!(stop(&outcome), Some(&RunStop::Cancelled { next_index: 1 }));
    assert_eq!(
        statuses(&outcome),
        vec![TaskStatus::Completed, TaskStatus::Pending, TaskStatus::Pending]
    );
    assert_eq!(provider.calls().len(), 3);
}

#[tokio::test]
async fn test_no_project_plans_but_does_not_execute() {
    let provider = Arc::new(ScriptedProvider::texts(&["plan", "- Create page\n- Add route"]));
    let mut session = session(&provider, Arc::new(InMemoryProjectStore::empty()));

    let outcome = session.submit("add a page").await.unwrap();

    assert_eq!(stop(&outcome), Some(&RunStop::NoProject));
    assert_eq!(
        statuses(&outcome),
        vec![TaskStatus::Pending, TaskStatus::Pending]
    );
    assert_eq!(provider.calls().len(), 2);
    assert_eq!(
        session.history().last(),
        Some(&ConversationTurn::model(
            "Planned 2 task(s). I will execute them one by one."
        ))
    );
}

#[tokio::test]
async fn test_failed_classification_keeps_user_turn() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(quota_error())]));
    let mut session = session(&provider, project(&[]));

    assert!(session.submit("hello?").await.is_err());
    assert_eq!(session.history(), &[ConversationTurn::user("hello?")]);
    assert!(!session.is_planning());
    assert!(!session.is_executing());
}

#[tokio::test]
async fn test_directory_project_feeds_the_session() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/App.js"), "export default 1;").unwrap();

    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"[{"task": "Add footer"}]"#,
        r#"{"files": {"src/Footer.js": "footer"}}"#,
    ]));
    let store = Arc::new(DirectoryProjectStore::new(dir.path()));
    let mut session = Orchestrator::new(provider.clone(), store, OrchestratorConfig::default());

    session.submit("add a footer").await.unwrap();

    assert!(provider.calls()[1].prompt().contains("src/App.js"));
    assert!(session.files().contains_key("src/App.js"));
    assert!(session.files().contains_key("src/Footer.js"));
}

#[tokio::test]
async fn test_sandbox_paths_overwrite_directory_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/App.js"), "old").unwrap();

    let provider = Arc::new(ScriptedProvider::texts(&[
        "plan",
        r#"[{"task": "Rewrite App"}, {"task": "Add styles"}]"#,
        r#"{"files": {"/src/App.js": "new"}}"#,
        r#"{"files": {"src/App.css": "body {}"}}"#,
    ]));
    let store = Arc::new(DirectoryProjectStore::new(dir.path()));
    let mut session = Orchestrator::new(provider.clone(), store, OrchestratorConfig::default());

    session.submit("restyle the app").await.unwrap();

    let keys: Vec<&str> = session.files().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["src/App.css", "src/App.js"]);
    assert_eq!(session.files()["src/App.js"], "new");

    // The second task sees only the rewritten file
    let prompt = provider.calls()[3].prompt().to_string();
    assert!(prompt.contains(r#""src/App.js":"new""#));
    assert!(!prompt.contains(r#""src/App.js":"old""#));
}
