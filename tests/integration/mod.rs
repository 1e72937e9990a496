//! Integration Tests Module
//!
//! End-to-end tests for the plan-execute pipeline: orchestrator sessions,
//! tolerant planning, and the HTTP surface.

// Scripted provider shared by the tests below
mod support;

// Session state machine scenarios
mod orchestrator_test;

// Planner parsing and recovery through the public API
mod planner_test;

// HTTP surface over a real listener
mod server_test;
