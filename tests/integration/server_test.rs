//! HTTP Server Integration Tests
//!
//! Serves the router on an ephemeral port and talks to it with reqwest.

use std::net::SocketAddr;
use std::sync::Arc;

use codeplan::models::settings::AppConfig;
use codeplan::server::router;
use codeplan::state::AppState;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::support::{quota_error, ScriptedProvider};

async fn spawn_server(provider: Arc<ScriptedProvider>) -> SocketAddr {
    let state = AppState::new(provider, AppConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

async fn post(addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_root_and_health() {
    let addr = spawn_server(Arc::new(ScriptedProvider::texts(&[]))).await;

    let root: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root, json!({"message": "v1 Server"}));

    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["provider"], "scripted");
}

#[tokio::test]
async fn test_full_round_over_http() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "PLAN",
        r#"[{"task": "Create Login button component"}]"#,
        r#"{"explanation": "Added button", "files": {"src/Login.js": {"code": "..."}}}"#,
    ]));
    let addr = spawn_server(provider.clone()).await;

    let (status, body) = post(addr, "/classify-query", json!({"query": "add a login button"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"type": "plan"}));

    let (status, body) = post(
        addr,
        "/plan-tasks",
        json!({
            "query": "add a login button",
            "code": {"/App.js": "app"},
            "history": [{"role": "user", "parts": [{"text": "add a login button"}]}]
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"tasks": [{"task": "Create Login button component"}]}));

    let (status, body) = post(
        addr,
        "/execute-tasks",
        json!({"task": "Create Login button component", "query": "add a login button"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["explanation"], "Added button");
    assert_eq!(body["files"]["src/Login.js"]["code"], "...");
    assert!(body.get("raw").is_none());
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let provider = Arc::new(ScriptedProvider::texts(&[]));
    let addr = spawn_server(provider.clone()).await;

    for path in ["/classify-query", "/plan-tasks", "/respond"] {
        let (status, body) = post(addr, path, json!({})).await;
        assert_eq!(status, 400, "{path}");
        assert_eq!(body, json!({"error": "query is required"}));
    }

    let (status, body) = post(addr, "/execute-tasks", json!({"query": "x"})).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "task is required"}));

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(quota_error())]));
    let addr = spawn_server(provider).await;

    let (status, body) = post(addr, "/respond", json!({"query": "hi"})).await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_respond_returns_text() {
    let provider = Arc::new(ScriptedProvider::texts(&["A closure captures its environment."]));
    let addr = spawn_server(provider.clone()).await;

    let (status, body) = post(
        addr,
        "/respond",
        json!({"query": "what is a closure?", "history": [{"role": "model", "text": "Hi!"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"text": "A closure captures its environment."}));
    assert_eq!(provider.calls()[0].messages.len(), 2);
}

#[tokio::test]
async fn test_malformed_history_does_not_hide_the_query() {
    let provider = Arc::new(ScriptedProvider::texts(&["first reply", "second reply"]));
    let addr = spawn_server(provider.clone()).await;

    let (status, body) = post(
        addr,
        "/respond",
        json!({"query": "hi", "history": [{"text": "no role"}, {"role": "user", "text": "earlier"}]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"text": "first reply"}));

    let (status, body) = post(addr, "/respond", json!({"query": "hi", "history": "a string"})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"text": "second reply"}));

    let calls = provider.calls();
    // Only the usable item is replayed ahead of the query
    assert_eq!(calls[0].messages.len(), 2);
    assert_eq!(calls[1].messages.len(), 1);
}
