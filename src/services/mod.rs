//! Services
//!
//! Business logic: the plan-execute pipeline and the project store it
//! reads from.

pub mod plan_mode;
pub mod project;
