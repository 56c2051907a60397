//! Assessment execution
//!
//! State machine per assessment, driven by one tokio task:
//! - `start` spawns the run loop; `wait` joins it
//! - pause/resume/stop are observed between steps
//! - failed steps are retried only as a whole new pass

pub mod control;
pub mod retry;
pub mod runner;
pub mod state;

pub use retry::RetryPolicy;
pub use runner::{EngineBuilder, EngineConfig, ExecutionEngine};
pub use state::{ExecutionState, FailedStep, DEFAULT_MAX_RETRIES};
