//! Storage Layer
//!
//! Configuration file loading.

pub mod config;

pub use config::*;
