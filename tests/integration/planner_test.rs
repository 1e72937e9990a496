//! Planner Integration Tests
//!
//! Tolerant plan parsing as seen through the public API:
//! - Well-formed, fenced and prose-wrapped arrays
//! - Bullet text fallback
//! - Recovery idempotence on normalized output

use std::sync::Arc;

use codeplan::services::plan_mode::{parse_tasks, plan_tasks, PromptContext, TaskItem};
use codeplan_core::{recover, JsonShape, Recovered};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::support::{quota_error, ScriptedProvider};

fn titles(tasks: &[TaskItem]) -> Vec<String> {
    tasks.iter().map(|t| t.task.clone()).collect()
}

#[test]
fn test_well_formed_arrays_map_one_to_one() {
    let cases: [&[&str]; 3] = [
        &["Only task"],
        &["First", "Second"],
        &["One", "Two", "Three", "Four", "Five"],
    ];
    for expected in cases {
        let array: Vec<_> = expected.iter().map(|t| json!({ "task": t })).collect();
        let text = serde_json::to_string(&array).unwrap();
        assert_eq!(titles(&parse_tasks(&text, "q")), expected.to_vec());
    }
}

#[test]
fn test_fenced_and_unfenced_agree() {
    let plain = r#"[{"task": "Create Login button component"}, {"task": "Add to header"}]"#;
    for wrapped in [
        format!("```json\n{plain}\n```"),
        format!("```\n{plain}\n```"),
        format!("Here is the plan:\n```json\n{plain}\n```\nDone."),
    ] {
        assert_eq!(parse_tasks(&wrapped, "q"), parse_tasks(plain, "q"));
    }
}

#[test]
fn test_bullet_text_one_task_per_line() {
    let text = "1. Create the Navbar component\n2. Add links for Home and About\n\n- Style the active link";
    assert_eq!(
        titles(&parse_tasks(text, "q")),
        vec![
            "Create the Navbar component",
            "Add links for Home and About",
            "Style the active link"
        ]
    );
}

#[test]
fn test_recovery_is_idempotent_on_normalized_values() {
    let inputs = [
        "```json\n[{\"task\": \"A\"}]\n```",
        "prefix [1, 2, 3] suffix",
        "{\"explanation\": \"x\", \"files\": {}}",
    ];
    for input in inputs {
        let shape = if input.contains("explanation") {
            JsonShape::Object
        } else {
            JsonShape::Array
        };
        let Recovered::Parsed(first) = recover(input, shape) else {
            panic!("expected {input:?} to recover");
        };
        let again = recover(&first.to_string(), shape);
        assert_eq!(again, Recovered::Parsed(first));
    }
}

#[tokio::test]
async fn test_plan_tasks_against_scripted_provider() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "Sure! ```json\n[{\"task\": \"Set up router\"}, {\"task\": \"Add pages\"}]\n```",
    ]));
    let tasks = plan_tasks(provider.as_ref(), "add routing", PromptContext::new(&[]))
        .await
        .unwrap();

    assert_eq!(titles(&tasks), vec!["Set up router", "Add pages"]);
    let calls = provider.calls();
    assert!(calls[0]
        .system
        .as_deref()
        .is_some_and(|s| s.contains("raw JSON array")));
}

#[tokio::test]
async fn test_plan_tasks_surfaces_upstream_failure() {
    let provider = ScriptedProvider::new(vec![Err(quota_error())]);
    let result = plan_tasks(&provider, "add routing", PromptContext::new(&[])).await;
    assert!(result.is_err());
}
