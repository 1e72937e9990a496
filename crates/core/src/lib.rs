//! Codeplan Core
//!
//! Foundational types for the codeplan workspace. This crate has zero
//! dependencies on provider or server code.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `paths` - Safe project-relative path handling for model-named files
//! - `structured_output` - Staged recovery of JSON values from free-form model text

pub mod error;
pub mod paths;
pub mod structured_output;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Paths ──────────────────────────────────────────────────────────────
pub use paths::{canonical_file_key, sanitize_relative_path, to_slash_path};

// ── Structured Output Recovery ─────────────────────────────────────────
pub use structured_output::{recover, JsonShape, Recovered};
