//! Error types for reconchain
//!
//! Step failures (tool errors, timeouts) are not errors here: they are
//! recorded in the execution state and the activity log. This enum covers
//! control misuse and template problems; configuration and file I/O use
//! `anyhow` at the edges.

use thiserror::Error;

/// Main error type for the orchestration engine
#[derive(Error, Debug)]
pub enum ReconError {
    /// Template lookup failed
    #[error("Unknown workflow template: {0}")]
    UnknownTemplate(String),

    /// Template failed validation at registration
    #[error("Invalid workflow template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    /// Empty or whitespace-only target
    #[error("Assessment target must not be empty")]
    EmptyTarget,

    /// start() while a run is in progress
    #[error("Assessment already running against {target}")]
    AlreadyRunning { target: String },

    /// retry_failed_steps() with nothing recorded
    #[error("No failed steps to retry")]
    NoFailedSteps,

    /// retry_failed_steps() at the retry ceiling
    #[error("Retry limit reached: {attempts} of {max} retry passes used")]
    RetryLimitReached { attempts: u32, max: u32 },

    /// retry_failed_steps() while a run is in progress
    #[error("Cannot retry failed steps while the assessment is running")]
    RetryWhileRunning,

    /// Engine operations that spawn work need a tokio runtime
    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

impl ReconError {
    /// Rejected control-surface operation (caller error, not a crash)
    pub fn is_control_misuse(&self) -> bool {
        matches!(
            self,
            ReconError::AlreadyRunning { .. }
                | ReconError::NoFailedSteps
                | ReconError::RetryLimitReached { .. }
                | ReconError::RetryWhileRunning
        )
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReconError::RetryLimitReached { attempts: 2, max: 2 };
        assert!(err.to_string().contains("2 of 2"));

        let err = ReconError::UnknownTemplate("web-deep".to_string());
        assert!(err.to_string().contains("web-deep"));
    }

    #[test]
    fn test_control_misuse_classification() {
        assert!(ReconError::NoFailedSteps.is_control_misuse());
        assert!(ReconError::RetryWhileRunning.is_control_misuse());
        assert!(ReconError::AlreadyRunning {
            target: "example.com".to_string()
        }
        .is_control_misuse());
        assert!(!ReconError::EmptyTarget.is_control_misuse());
        assert!(!ReconError::UnknownTemplate("x".to_string()).is_control_misuse());
    }
}
