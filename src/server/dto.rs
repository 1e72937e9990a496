//! Request and response bodies for the HTTP surface.
//!
//! Every request field is optional at the serde level so that a missing
//! `query` or `task` reaches the handler and gets a 400 with a readable
//! message instead of a deserialization rejection.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::services::plan_mode::types::HistoryItem;
use crate::services::plan_mode::{QueryKind, TaskItem};

#[derive(Debug, Default, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "lenient_history")]
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    #[serde(rename = "type")]
    pub kind: QueryKind,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub tasks: Vec<TaskItem>,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Accept any `history` value: items that do not parse are dropped and a
/// non-array becomes an empty history.
fn lenient_history<'de, D>(deserializer: D) -> Result<Vec<HistoryItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(items)
}

/// Non-blank value of a required field.
pub fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
