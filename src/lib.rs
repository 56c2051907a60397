//! reconchain - Chained Security Assessment Workflows
//!
//! Runs phased reconnaissance templates against a target, one tool at a time,
//! feeding what each tool discovers into the inputs of later tools.
//!
//! # Architecture
//!
//! - **Workflow**: immutable templates of phases and tools
//! - **Engine**: per-assessment state machine with pause/resume/stop and
//!   bounded retry passes
//! - **Intelligence**: extraction, per-tool records and handoff resolution
//! - **Activity**: bounded, shared, observable event log
//! - **Tools**: invoker seam plus a process-backed implementation

pub mod errors;
pub mod target;
pub mod workflow;
pub mod tools;
pub mod intel;
pub mod activity;
pub mod engine;

// Re-export commonly used types
pub use errors::{ReconError, Result};
pub use engine::{ExecutionEngine, ExecutionState};

// Interface layer
pub mod cli;
pub mod config;
pub mod display;
pub mod report;
