//! Codeplan LLM
//!
//! The model gateway boundary. Everything above this crate talks to a
//! chat-capable completion service through [`LlmProvider`]:
//! a system instruction, a conversation history, and a user message in;
//! raw text out.
//!
//! Concrete providers:
//! - Google Gemini (`generateContent`)
//! - OpenAI and OpenAI-compatible chat completions

pub mod gemini;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{build_provider, LlmProvider};
pub use types::*;
