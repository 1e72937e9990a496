//! HTTP handlers. Each request is stateless: history and code come from
//! the body, nothing is kept between calls.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::services::plan_mode::{
    classify_query, execute_task, history_from_items, plan_tasks, respond, ExecutionResult,
    PromptContext,
};
use crate::state::AppState;
use crate::utils::error::AppError;

use super::dto::{
    required, ClassifyRequest, ClassifyResponse, ErrorBody, ExecuteRequest, PlanRequest,
    PlanResponse, RespondRequest, RespondResponse,
};

type ApiError = (StatusCode, Json<ErrorBody>);

pub async fn root() -> Json<Value> {
    Json(json!({"message": "v1 Server"}))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "provider": state.provider.name(),
        "model": state.provider.model(),
    }))
}

pub async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let body = body_or_default(payload);
    let query = required(&body.query).ok_or_else(|| missing("query"))?;

    let kind = classify_query(state.provider.as_ref(), query)
        .await
        .map_err(|err| map_app_error("classify-query", err))?;
    Ok(Json(ClassifyResponse { kind }))
}

pub async fn plan(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, ApiError> {
    let body = body_or_default(payload);
    let query = required(&body.query).ok_or_else(|| missing("query"))?;

    let history = history_from_items(body.history);
    let ctx = PromptContext::new(&history)
        .with_code(body.code.as_ref())
        .with_max_snapshot_chars(state.max_snapshot_chars());
    let tasks = plan_tasks(state.provider.as_ref(), query, ctx)
        .await
        .map_err(|err| map_app_error("plan-tasks", err))?;
    Ok(Json(PlanResponse { tasks }))
}

pub async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let body = body_or_default(payload);
    let task = required(&body.task).ok_or_else(|| missing("task"))?;

    let history = history_from_items(body.history);
    let ctx = PromptContext::new(&history)
        .with_code(body.code.as_ref())
        .with_max_snapshot_chars(state.max_snapshot_chars());
    let result = execute_task(state.provider.as_ref(), task, required(&body.query), ctx)
        .await
        .map_err(|err| map_app_error("execute-tasks", err))?;
    Ok(Json(result))
}

pub async fn respond_query(
    State(state): State<AppState>,
    payload: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<RespondResponse>, ApiError> {
    let body = body_or_default(payload);
    let query = required(&body.query).ok_or_else(|| missing("query"))?;

    let history = history_from_items(body.history);
    let text = respond(state.provider.as_ref(), query, &history)
        .await
        .map_err(|err| map_app_error("respond", err))?;
    Ok(Json(RespondResponse { text }))
}

/// An unreadable body is treated as an empty one, so the caller gets the
/// usual "<field> is required" message.
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "server: unreadable request body");
            T::default()
        }
    }
}

fn missing(field: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: format!("{} is required", field),
        }),
    )
}

/// Input validation maps to 400 with the bare message; everything else is
/// an upstream or internal failure and maps to 500.
fn map_app_error(route: &str, err: AppError) -> ApiError {
    if err.is_user_error() {
        let message = match err {
            AppError::Validation(message) => message,
            other => other.to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message }));
    }

    error!(route, error = %err, "server: request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}
