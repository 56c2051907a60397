//! Tool invocation types
//!
//! `Invocation` is the only thing that crosses the invoker boundary: every
//! failure mode is a value with `success == false` and a reason string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Result of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    /// Tool that was invoked
    pub tool: String,

    /// Raw output (opaque to the engine)
    pub payload: String,

    /// Whether the tool succeeded
    pub success: bool,

    /// Reason when `success` is false
    pub error: Option<String>,

    /// Wall time in milliseconds
    pub duration_ms: u64,

    /// Exit code (for processes)
    pub exit_code: Option<i32>,

    /// The ceiling was exceeded
    pub timed_out: bool,
}

impl Invocation {
    /// Create successful invocation
    pub fn success(
        tool: impl Into<String>,
        payload: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool: tool.into(),
            payload: payload.into(),
            success: true,
            error: None,
            duration_ms: duration.as_millis() as u64,
            exit_code: Some(0),
            timed_out: false,
        }
    }

    /// Create failed invocation
    pub fn failure(tool: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            tool: tool.into(),
            payload: String::new(),
            success: false,
            error: Some(error.into()),
            duration_ms: duration.as_millis() as u64,
            exit_code: None,
            timed_out: false,
        }
    }

    /// Create invocation that exceeded its ceiling
    pub fn timeout(tool: impl Into<String>, ceiling: Duration, duration: Duration) -> Self {
        Self {
            timed_out: true,
            ..Self::failure(
                tool,
                format!("timed out after {}s", ceiling.as_secs_f64()),
                duration,
            )
        }
    }

    /// Create invocation from a process exit code
    pub fn with_exit_code(
        tool: impl Into<String>,
        payload: impl Into<String>,
        exit_code: i32,
        duration: Duration,
    ) -> Self {
        Self {
            tool: tool.into(),
            payload: payload.into(),
            success: exit_code == 0,
            error: if exit_code != 0 {
                Some(format!("exited with code {}", exit_code))
            } else {
                None
            },
            duration_ms: duration.as_millis() as u64,
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.success {
            None
        } else if self.timed_out {
            Some(FailureKind::Timeout)
        } else {
            Some(FailureKind::Invocation)
        }
    }

    /// Reason string for a failed invocation
    pub fn reason(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "tool reported failure".to_string())
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Tool ran and reported an error
    Invocation,
    /// Tool exceeded its ceiling
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Invocation => f.write_str("invocation failure"),
            FailureKind::Timeout => f.write_str("timeout"),
        }
    }
}
