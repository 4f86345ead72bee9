//! Agentic job-application automation: matching, safety gating, decision
//! synthesis, and form-submission orchestration behind swappable ports.

pub mod config;
pub mod error;
pub mod scheduler;
pub mod telemetry;
pub mod workflows;
