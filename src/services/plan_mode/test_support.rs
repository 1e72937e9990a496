//! Scripted provider shared by the plan mode unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use codeplan_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
};

/// One recorded `send_message` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub options: LlmRequestOptions,
}

impl RecordedCall {
    /// Content of the final (new) user message.
    pub fn last_message(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// A mock LLM provider that returns predefined responses for testing.
pub struct MockLlmProvider {
    /// Responses to return in sequence; each call pops the first response.
    responses: Mutex<Vec<LlmResult<LlmResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
    config: ProviderConfig,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<LlmResult<LlmResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
            config: ProviderConfig::default(),
        }
    }

    pub fn with_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse::from_text(text, "mock-model")
}

pub fn upstream_error(message: &str) -> LlmError {
    LlmError::ServerError {
        message: message.to_string(),
        status: Some(503),
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            system,
            options: request_options,
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(LlmError::Other {
                message: "No more mock responses available".to_string(),
            })
        } else {
            responses.remove(0)
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
