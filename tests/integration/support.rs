//! Scripted model provider that records calls and in-flight concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use codeplan_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Call {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl Call {
    pub fn prompt(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

pub struct ScriptedProvider {
    script: Mutex<Vec<LlmResult<String>>>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
    config: ProviderConfig,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LlmResult<String>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Duration::from_millis(5),
            cancel_after: None,
            config: ProviderConfig::default(),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Cancel `token` once `calls` calls have completed.
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn quota_error() -> LlmError {
    LlmError::RateLimited {
        message: "quota exceeded".to_string(),
        retry_after: None,
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        let completed = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call { system, messages });
            calls.len()
        };
        let next = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Err(LlmError::Other {
                    message: "script exhausted".to_string(),
                })
            } else {
                script.remove(0)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some((after, token)) = &self.cancel_after {
            if completed >= *after {
                token.cancel();
            }
        }
        next.map(|text| LlmResponse::from_text(text, "scripted-model"))
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
