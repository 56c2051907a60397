//! Control surface
//!
//! Pause, resume and stop flip flags that the run loop polls between steps;
//! the in-flight step always completes. Each returns whether state changed,
//! and only a change is logged. Retry starts a new pass over the recorded
//! failures.

use crate::activity::NewActivity;
use crate::engine::runner::ExecutionEngine;
use crate::errors::{ReconError, Result};
use crate::workflow::Step;
use chrono::Utc;
use serde_json::json;
use tokio::runtime::Handle;
use tracing::{info, warn};

impl ExecutionEngine {
    /// Suspend at the next step boundary. No-op unless running and unpaused.
    pub fn pause(&self) -> bool {
        let mut run = self.lock_run();
        if !run.state.is_running || run.state.is_paused {
            return false;
        }

        run.state.is_paused = true;
        info!(assessment = %run.state.assessment, step = run.state.step_index, "assessment paused");
        self.emit(
            &run,
            NewActivity::progress(format!(
                "Assessment paused at step {}/{}",
                run.state.step_index, run.state.total_steps
            )),
        );
        true
    }

    /// Continue from the current `step_index`
    pub fn resume(&self) -> bool {
        let mut run = self.lock_run();
        if !run.state.is_running || !run.state.is_paused {
            return false;
        }

        run.state.is_paused = false;
        info!(
            assessment = %run.state.assessment,
            step = run.state.step_index,
            "assessment resumed"
        );
        self.emit(
            &run,
            NewActivity::progress(format!(
                "Assessment resumed at step {}/{}",
                run.state.step_index, run.state.total_steps
            )),
        );
        drop(run);

        self.inner.wake.notify_one();
        true
    }

    /// End the run at the next step boundary, keeping counters and failures
    pub fn stop(&self) -> bool {
        let mut run = self.lock_run();
        if !run.state.is_running {
            return false;
        }

        run.state.is_running = false;
        run.state.is_paused = false;
        run.state.finished_at = Some(Utc::now());

        info!(
            assessment = %run.state.assessment,
            step = run.state.step_index,
            "assessment stopped"
        );
        self.emit(
            &run,
            NewActivity::complete(format!(
                "Assessment stopped by user after {}/{} steps",
                run.state.step_index, run.state.total_steps
            ))
            .with_data(json!({
                "stopped": true,
                "step_index": run.state.step_index,
                "completed_steps": run.state.completed_steps,
                "failed_steps": run.state.failed_steps.len(),
                "total_steps": run.state.total_steps,
            })),
        );
        drop(run);

        self.inner.wake.notify_one();
        true
    }

    /// Re-run every recorded failed step as a new pass.
    ///
    /// Rejected while running, with no failures, or once `max_retries`
    /// passes have been used; a rejection leaves state untouched. Returns
    /// the number of steps in the new pass.
    pub fn retry_failed_steps(&self) -> Result<usize> {
        let runtime = Handle::try_current().map_err(|e| ReconError::NoRuntime(e.to_string()))?;

        let (generation, backoff, count) = {
            let mut run = self.lock_run();

            let rejection = if run.state.is_running {
                Some(ReconError::RetryWhileRunning)
            } else if run.state.failed_steps.is_empty() {
                Some(ReconError::NoFailedSteps)
            } else if run.state.retry_count >= run.state.max_retries {
                Some(ReconError::RetryLimitReached {
                    attempts: run.state.retry_count,
                    max: run.state.max_retries,
                })
            } else {
                None
            };

            if let Some(err) = rejection {
                warn!(assessment = %run.state.assessment, error = %err, "retry rejected");
                self.emit(&run, NewActivity::error(format!("Retry rejected: {}", err)));
                return Err(err);
            }

            let steps: Vec<Step> = run
                .state
                .failed_steps
                .iter()
                .map(|failed| Step::new(failed.phase, failed.tool.clone()))
                .collect();
            let count = steps.len();

            run.generation += 1;
            run.steps = steps;
            run.current_phase = None;
            run.state.begin_retry_pass(count);

            let pass = run.state.retry_count;
            let backoff = self.inner.config.retry.delay_for(pass);
            info!(
                assessment = %run.state.assessment,
                pass,
                steps = count,
                backoff_ms = backoff.as_millis() as u64,
                "retry pass started"
            );
            self.emit(
                &run,
                NewActivity::start(format!(
                    "Retry pass {}/{}: retrying {} failed step(s)",
                    pass, run.state.max_retries, count
                ))
                .with_data(json!({
                    "retry_count": pass,
                    "max_retries": run.state.max_retries,
                    "steps": run.steps.iter().map(|s| s.tool.as_str()).collect::<Vec<_>>(),
                    "backoff_ms": backoff.as_millis() as u64,
                })),
            );

            (run.generation, backoff, count)
        };

        self.spawn_loop(&runtime, generation, Some(backoff));
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::activity::ActivityKind;
    use crate::engine::test_support::{engine_with, single_phase_registry, ScriptedInvoker};
    use crate::errors::ReconError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_controls_are_noops_when_idle() {
        let engine = engine_with(single_phase_registry(&["whois"]), ScriptedInvoker::new());

        assert!(!engine.pause());
        assert!(!engine.resume());
        assert!(!engine.stop());
        assert!(engine.activity().is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_first_step() {
        let invoker = ScriptedInvoker::new().succeed("whois", "203.0.113.5");
        let calls = invoker.calls();
        let engine = engine_with(single_phase_registry(&["whois", "dig"]), invoker);

        // The loop task has not been polled yet on this runtime
        engine.start("single", "example.com").unwrap();
        assert!(engine.stop());
        assert!(!engine.stop());
        engine.wait().await;

        assert!(calls.lock().unwrap().is_empty());
        let state = engine.state();
        assert!(!state.is_running);
        assert_eq!(state.step_index, 0);
        assert!(state.finished_at.is_some());
        assert!(engine.activity().filter(|a| a.tool.is_some()).is_empty());

        let stopped = engine
            .activity()
            .filter(|a| a.kind == ActivityKind::Complete && a.message.contains("stopped by user"));
        assert_eq!(stopped.len(), 1);
    }

    #[tokio::test]
    async fn test_pause_before_first_step_holds_dispatch() {
        let invoker = ScriptedInvoker::new();
        let calls = invoker.calls();
        let engine = engine_with(single_phase_registry(&["whois", "dig"]), invoker);

        engine.start("single", "example.com").unwrap();
        assert!(engine.pause());
        let paused = engine.state();
        assert!(!engine.pause());
        assert_eq!(engine.state(), paused);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(engine.state().step_index, 0);

        assert!(engine.resume());
        assert!(!engine.resume());
        engine.wait().await;

        assert_eq!(calls.lock().unwrap().len(), 2);
        let state = engine.state();
        assert_eq!(state.step_index, 2);
        assert!(!state.is_running);
        assert_eq!(engine.activity().of_kind(ActivityKind::Progress).len(), 3);
    }

    #[tokio::test]
    async fn test_retry_rejections_leave_state_untouched() {
        let engine = engine_with(
            single_phase_registry(&["whois"]),
            ScriptedInvoker::new().succeed("whois", "203.0.113.5"),
        );

        engine.start("single", "example.com").unwrap();
        engine.wait().await;

        let before = engine.state();
        let err = engine.retry_failed_steps().unwrap_err();
        assert!(matches!(err, ReconError::NoFailedSteps));
        assert_eq!(engine.state(), before);
        assert_eq!(engine.activity().of_kind(ActivityKind::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_retry_pass_reruns_failures() {
        let invoker = ScriptedInvoker::new()
            .succeed("whois", "203.0.113.5")
            .fail_once("dig", "203.0.113.6");
        let engine = engine_with(single_phase_registry(&["whois", "dig"]), invoker);

        engine.start("single", "example.com").unwrap();
        engine.wait().await;
        assert_eq!(engine.state().failed_steps.len(), 1);

        assert_eq!(engine.retry_failed_steps().unwrap(), 1);
        engine.wait().await;

        let state = engine.state();
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.total_steps, 1);
        assert_eq!(state.completed_steps, 1);
        assert!(state.failed_steps.is_empty());

        // Earlier intelligence survives the retry pass
        let intel = engine.intelligence();
        assert!(intel.contains_key("whois"));
        assert!(intel.contains_key("dig"));
    }
}
