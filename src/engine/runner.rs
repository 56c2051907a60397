//! Execution engine
//!
//! Drives one assessment at a time through a template's flattened step list
//! on a spawned tokio task. Each step resolves its input target from earlier
//! intelligence, invokes the tool under its ceiling, then records either the
//! extracted intelligence or a failure. Failures never stop the sweep.

use crate::activity::{ActivityLog, NewActivity};
use crate::engine::retry::RetryPolicy;
use crate::engine::state::{ExecutionState, FailedStep};
use crate::errors::{ReconError, Result};
use crate::intel::{
    IntelligenceExtractor, IntelligenceRecord, IntelligenceStore, PatternExtractor,
};
use crate::tools::{FailureKind, ToolClass, ToolInvoker};
use crate::workflow::{PhaseId, Step, TemplateRegistry};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine tuning
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    /// Per-tool ceiling overrides
    pub ceilings: HashMap<String, Duration>,
}

impl EngineConfig {
    /// Time budget for one invocation of `tool`
    pub fn ceiling_for(&self, tool: &str) -> Duration {
        self.ceilings
            .get(tool)
            .copied()
            .unwrap_or_else(|| ToolClass::of(tool).default_ceiling())
    }
}

/// Mutable run data, guarded by one mutex
pub(super) struct Run {
    pub(super) state: ExecutionState,
    pub(super) steps: Vec<Step>,
    /// Bumped by every start and retry pass; stale loops compare and bail
    pub(super) generation: u64,
    pub(super) current_phase: Option<PhaseId>,
}

pub(super) struct EngineInner {
    pub(super) registry: Arc<TemplateRegistry>,
    pub(super) invoker: Arc<dyn ToolInvoker>,
    pub(super) extractor: Arc<dyn IntelligenceExtractor>,
    pub(super) config: EngineConfig,
    pub(super) run: Mutex<Run>,
    pub(super) store: IntelligenceStore,
    pub(super) log: ActivityLog,
    pub(super) wake: Notify,
    pub(super) task: Mutex<Option<JoinHandle<()>>>,
}

/// What the loop does after one `run_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Park,
    Halt,
}

/// Builder for [`ExecutionEngine`]
pub struct EngineBuilder {
    registry: Arc<TemplateRegistry>,
    invoker: Arc<dyn ToolInvoker>,
    extractor: Arc<dyn IntelligenceExtractor>,
    config: EngineConfig,
    log: Option<ActivityLog>,
}

impl EngineBuilder {
    pub fn extractor(mut self, extractor: Arc<dyn IntelligenceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing activity log (several assessments, one log)
    pub fn activity_log(mut self, log: ActivityLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> ExecutionEngine {
        let max_retries = self.config.retry.max_retries;
        ExecutionEngine {
            inner: Arc::new(EngineInner {
                registry: self.registry,
                invoker: self.invoker,
                extractor: self.extractor,
                config: self.config,
                run: Mutex::new(Run {
                    state: ExecutionState::idle(max_retries),
                    steps: Vec::new(),
                    generation: 0,
                    current_phase: None,
                }),
                store: IntelligenceStore::new(),
                log: self.log.unwrap_or_default(),
                wake: Notify::new(),
                task: Mutex::new(None),
            }),
        }
    }
}

/// Assessment engine handle. Clones share the same assessment.
#[derive(Clone)]
pub struct ExecutionEngine {
    pub(super) inner: Arc<EngineInner>,
}

impl ExecutionEngine {
    pub fn builder(
        registry: Arc<TemplateRegistry>,
        invoker: Arc<dyn ToolInvoker>,
    ) -> EngineBuilder {
        EngineBuilder {
            registry,
            invoker,
            extractor: Arc::new(PatternExtractor::new()),
            config: EngineConfig::default(),
            log: None,
        }
    }

    /// Engine with the pattern extractor and default config
    pub fn new(registry: Arc<TemplateRegistry>, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self::builder(registry, invoker).build()
    }

    /// Begin an assessment of `target` with `template_name`.
    ///
    /// Returns once the run is spawned; progress is observed through
    /// [`state`](Self::state) and [`activity`](Self::activity).
    pub fn start(&self, template_name: &str, target: &str) -> Result<Uuid> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ReconError::EmptyTarget);
        }
        let template = self.inner.registry.require(template_name)?;
        let runtime = Handle::try_current().map_err(|e| ReconError::NoRuntime(e.to_string()))?;

        let (generation, assessment) = {
            let mut run = self.lock_run();
            if run.state.is_running {
                return Err(ReconError::AlreadyRunning {
                    target: run.state.target.clone(),
                });
            }

            run.generation += 1;
            run.steps = template.steps();
            run.current_phase = None;
            run.state = ExecutionState::begin(
                target,
                &template.name,
                run.steps.len(),
                self.inner.config.retry.max_retries,
            );
            self.inner.store.clear();

            let assessment = run.state.assessment;
            info!(
                %assessment,
                subject = %target,
                template = %template.name,
                steps = run.state.total_steps,
                "assessment started"
            );
            self.emit(
                &run,
                NewActivity::start(format!(
                    "Starting {} assessment of {} ({} steps)",
                    template.name, target, run.state.total_steps
                ))
                .with_data(json!({
                    "target": target,
                    "template": template.name,
                    "total_steps": run.state.total_steps,
                })),
            );

            (run.generation, assessment)
        };

        self.spawn_loop(&runtime, generation, None);
        Ok(assessment)
    }

    /// Wait for the current run task to exit
    pub async fn wait(&self) {
        let handle = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "run task ended abnormally");
            }
        }
    }

    /// Snapshot of the execution state
    pub fn state(&self) -> ExecutionState {
        self.lock_run().state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock_run().state.is_running
    }

    /// Shared activity log handle
    pub fn activity(&self) -> ActivityLog {
        self.inner.log.clone()
    }

    /// Snapshot of gathered intelligence, keyed by tool
    pub fn intelligence(&self) -> HashMap<String, IntelligenceRecord> {
        self.inner.store.snapshot()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(super) fn lock_run(&self) -> MutexGuard<'_, Run> {
        self.inner.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an activity tagged with the current assessment
    pub(super) fn emit(&self, run: &Run, activity: NewActivity) {
        self.inner
            .log
            .append(activity.for_assessment(run.state.assessment));
    }

    pub(super) fn spawn_loop(&self, runtime: &Handle, generation: u64, backoff: Option<Duration>) {
        let engine = self.clone();
        let handle = runtime.spawn(async move { engine.drive(generation, backoff).await });

        let mut task = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        *task = Some(handle);
    }

    async fn drive(self, generation: u64, backoff: Option<Duration>) {
        if let Some(delay) = backoff.filter(|delay| !delay.is_zero()) {
            debug!(generation, delay_ms = delay.as_millis() as u64, "retry backoff");
            if !self.backoff(generation, delay).await {
                return;
            }
        }

        loop {
            match self.run_step(generation).await {
                Flow::Continue => {}
                Flow::Park => self.inner.wake.notified().await,
                Flow::Halt => break,
            }
        }

        debug!(generation, "run loop exited");
    }

    /// Sleep until `delay` elapses; false when the run was stopped meanwhile
    async fn backoff(&self, generation: u64, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            {
                let run = self.lock_run();
                if run.generation != generation || !run.state.is_running {
                    return false;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                _ = self.inner.wake.notified() => {}
            }
        }
    }

    /// Execute the step at `step_index`, or finish the run
    pub(super) async fn run_step(&self, generation: u64) -> Flow {
        // Control checks, resolution and the start announcement share one lock
        let (step, resolution, ceiling) = {
            let mut run = self.lock_run();
            if run.generation != generation || !run.state.is_running {
                return Flow::Halt;
            }
            if run.state.is_paused {
                return Flow::Park;
            }

            let index = run.state.step_index;
            let step = match run.steps.get(index) {
                Some(step) if index < run.state.total_steps => step.clone(),
                _ => {
                    self.finish(&mut run);
                    return Flow::Halt;
                }
            };

            if run.current_phase != Some(step.phase) {
                run.current_phase = Some(step.phase);
                self.emit(
                    &run,
                    NewActivity::progress(format!("Entering {} phase", step.phase.display_name()))
                        .with_phase(step.phase),
                );
            }

            let resolution = self.inner.store.resolve(&step.tool, &run.state.target);
            let ceiling = self.inner.config.ceiling_for(&step.tool);

            debug!(
                assessment = %run.state.assessment,
                step = run.state.step_index,
                tool = %step.tool,
                input = %resolution.target,
                "dispatching step"
            );
            self.emit(
                &run,
                NewActivity::start(format!("Running {} against {}", step.tool, resolution.target))
                    .with_step(step.phase, &step.tool)
                    .with_data(json!({
                        "target": resolution.target,
                        "source_tool": resolution.source_tool,
                        "ceiling_secs": ceiling.as_secs(),
                    })),
            );

            (step, resolution, ceiling)
        };

        let invocation = self
            .inner
            .invoker
            .invoke(&step.tool, &resolution.target, ceiling)
            .await;

        let extracted = if invocation.success {
            Some(self.inner.extractor.extract(&step.tool, &invocation.payload))
        } else {
            None
        };

        let mut run = self.lock_run();
        if run.generation != generation {
            debug!(tool = %step.tool, "discarding result from superseded run");
            return Flow::Halt;
        }

        match (extracted, invocation.failure_kind()) {
            (Some(data), _) => {
                let record = self
                    .inner
                    .store
                    .record_for_target(&step.tool, &resolution.target, data);
                run.state.completed_steps += 1;
                run.state.step_index += 1;

                info!(
                    assessment = %run.state.assessment,
                    tool = %step.tool,
                    duration_ms = invocation.duration_ms,
                    "step complete"
                );
                self.emit(
                    &run,
                    NewActivity::complete(format!(
                        "{} completed in {}ms",
                        step.tool, invocation.duration_ms
                    ))
                    .with_step(step.phase, &step.tool)
                    .with_data(json!({ "duration_ms": invocation.duration_ms })),
                );

                if !record.is_empty() {
                    let summary: serde_json::Map<String, serde_json::Value> = record
                        .summary()
                        .into_iter()
                        .map(|(key, count)| (key, json!(count)))
                        .collect();
                    let described: Vec<String> = record
                        .summary()
                        .into_iter()
                        .map(|(key, count)| format!("{} {}", count, key))
                        .collect();

                    self.emit(
                        &run,
                        NewActivity::handoff(format!(
                            "{} found {}",
                            step.tool,
                            described.join(", ")
                        ))
                            .with_step(step.phase, &step.tool)
                            .with_data(json!({
                                "target": resolution.target,
                                "items": summary,
                            })),
                    );
                }
            }
            (None, kind) => {
                let kind = kind.unwrap_or(FailureKind::Invocation);
                let reason = invocation.reason();

                run.state.failed_steps.push(FailedStep {
                    phase: step.phase,
                    tool: step.tool.clone(),
                    reason: reason.clone(),
                    kind,
                    target: resolution.target.clone(),
                    at: Utc::now(),
                });
                run.state.step_index += 1;

                warn!(
                    assessment = %run.state.assessment,
                    tool = %step.tool,
                    %kind,
                    %reason,
                    "step failed"
                );
                self.emit(
                    &run,
                    NewActivity::error(format!("{} failed: {}", step.tool, reason))
                        .with_step(step.phase, &step.tool)
                        .with_data(json!({
                            "target": resolution.target,
                            "reason": reason,
                            "kind": kind,
                        })),
                );
            }
        }

        Flow::Continue
    }

    fn finish(&self, run: &mut Run) {
        run.state.is_running = false;
        run.state.is_paused = false;
        run.state.finished_at = Some(Utc::now());

        let state = &run.state;
        info!(
            assessment = %state.assessment,
            completed = state.completed_steps,
            failed = state.failed_steps.len(),
            total = state.total_steps,
            "assessment complete"
        );
        self.emit(
            run,
            NewActivity::complete(format!(
                "Assessment complete: {}/{} steps succeeded ({:.1}%)",
                state.completed_steps,
                state.total_steps,
                state.success_rate()
            ))
            .with_data(json!({
                "completed_steps": state.completed_steps,
                "failed_steps": state.failed_steps.len(),
                "total_steps": state.total_steps,
                "success_rate": state.success_rate(),
            })),
        );
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let run = self.lock_run();
        f.debug_struct("ExecutionEngine")
            .field("assessment", &run.state.assessment)
            .field("target", &run.state.target)
            .field("step_index", &run.state.step_index)
            .field("is_running", &run.state.is_running)
            .finish()
    }
}
