//! Execution state
//!
//! One `ExecutionState` per assessment, owned by its engine. `step_index` is
//! the only progress cursor:
//! - `0 <= step_index <= total_steps`
//! - `completed_steps <= step_index`
//! - advances by exactly one per step, success or failure

use crate::tools::FailureKind;
use crate::workflow::PhaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of retry passes per assessment
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// A step that failed and was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedStep {
    pub phase: PhaseId,
    pub tool: String,
    pub reason: String,
    pub kind: FailureKind,
    /// Target the tool was invoked against
    pub target: String,
    pub at: DateTime<Utc>,
}

/// Snapshot-able state of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub assessment: Uuid,
    pub target: String,
    pub template_name: String,
    pub step_index: usize,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub is_running: bool,
    pub is_paused: bool,
    pub failed_steps: Vec<FailedStep>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// Idle state before any run
    pub fn idle(max_retries: u32) -> Self {
        Self {
            assessment: Uuid::nil(),
            target: String::new(),
            template_name: String::new(),
            step_index: 0,
            total_steps: 0,
            completed_steps: 0,
            is_running: false,
            is_paused: false,
            failed_steps: Vec::new(),
            retry_count: 0,
            max_retries,
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh state for a new run
    pub(crate) fn begin(
        target: &str,
        template_name: &str,
        total_steps: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            assessment: Uuid::new_v4(),
            target: target.to_string(),
            template_name: template_name.to_string(),
            total_steps,
            is_running: true,
            started_at: Some(Utc::now()),
            ..Self::idle(max_retries)
        }
    }

    /// Reset counters for a retry pass over `steps` steps
    pub(crate) fn begin_retry_pass(&mut self, steps: usize) {
        self.retry_count += 1;
        self.step_index = 0;
        self.completed_steps = 0;
        self.total_steps = steps;
        self.failed_steps.clear();
        self.is_running = true;
        self.is_paused = false;
        self.finished_at = None;
    }

    /// Fraction of steps processed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.step_index as f64 / self.total_steps as f64
        }
    }

    /// Successful steps as a percentage; an empty run counts as 100%
    pub fn success_rate(&self) -> f64 {
        if self.total_steps == 0 {
            100.0
        } else {
            self.completed_steps as f64 / self.total_steps as f64 * 100.0
        }
    }

    pub fn can_retry(&self) -> bool {
        !self.is_running && !self.failed_steps.is_empty() && self.retry_count < self.max_retries
    }
}
