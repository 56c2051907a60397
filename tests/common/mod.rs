//! Shared helpers for integration tests: an in-memory invoker and registries

#![allow(dead_code)]

use async_trait::async_trait;
use reconchain::engine::{EngineConfig, ExecutionEngine, RetryPolicy};
use reconchain::tools::{Invocation, ToolInvoker};
use reconchain::workflow::{Phase, PhaseId, TemplateRegistry, WorkflowTemplate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Two-way handshake with a tool that blocks until released
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

enum Script {
    Succeed(String),
    Fail(String),
    Timeout,
    /// Blocks the first call only
    GatedOnce(String, Gate, AtomicBool),
    FailTimes(AtomicUsize, String),
}

/// Invoker driven by per-tool scripts; unscripted tools succeed silently
#[derive(Default)]
pub struct ScriptedInvoker {
    scripts: HashMap<String, Script>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, tool: &str, payload: &str) -> Self {
        self.scripts.insert(tool.into(), Script::Succeed(payload.into()));
        self
    }

    pub fn fail(mut self, tool: &str, reason: &str) -> Self {
        self.scripts.insert(tool.into(), Script::Fail(reason.into()));
        self
    }

    pub fn time_out(mut self, tool: &str) -> Self {
        self.scripts.insert(tool.into(), Script::Timeout);
        self
    }

    pub fn gated_once(mut self, tool: &str, payload: &str) -> Self {
        self.scripts.insert(
            tool.into(),
            Script::GatedOnce(payload.into(), Gate::default(), AtomicBool::new(false)),
        );
        self
    }

    pub fn fail_times(mut self, tool: &str, failures: usize, payload: &str) -> Self {
        self.scripts.insert(
            tool.into(),
            Script::FailTimes(AtomicUsize::new(failures), payload.into()),
        );
        self
    }

    pub fn gate(&self, tool: &str) -> Gate {
        match self.scripts.get(tool) {
            Some(Script::GatedOnce(_, gate, _)) => gate.clone(),
            _ => panic!("{} is not gated", tool),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn invoke(&self, tool: &str, target: &str, budget: Duration) -> Invocation {
        self.calls.lock().unwrap().push((tool.into(), target.into()));
        let elapsed = Duration::from_millis(2);

        match self.scripts.get(tool) {
            None => Invocation::success(tool, "", elapsed),
            Some(Script::Succeed(payload)) => Invocation::success(tool, payload.clone(), elapsed),
            Some(Script::Fail(reason)) => Invocation::failure(tool, reason.clone(), elapsed),
            Some(Script::Timeout) => Invocation::timeout(tool, budget, budget),
            Some(Script::GatedOnce(payload, gate, used)) => {
                if !used.swap(true, Ordering::SeqCst) {
                    gate.entered.notify_one();
                    gate.release.notified().await;
                }
                Invocation::success(tool, payload.clone(), elapsed)
            }
            Some(Script::FailTimes(remaining, payload)) => {
                let left = remaining.load(Ordering::SeqCst);
                if left > 0 {
                    remaining.store(left - 1, Ordering::SeqCst);
                    Invocation::failure(tool, "exited with code 1", elapsed)
                } else {
                    Invocation::success(tool, payload.clone(), elapsed)
                }
            }
        }
    }
}

/// Registry holding one template named `name`
pub fn registry_with(name: &str, phases: Vec<Phase>) -> Arc<TemplateRegistry> {
    let mut registry = TemplateRegistry::empty();
    registry
        .register(WorkflowTemplate::new(name, "", phases))
        .unwrap();
    Arc::new(registry)
}

pub fn recon_phase(tools: &[&str]) -> Phase {
    Phase::new(PhaseId::Reconnaissance, tools.iter().copied())
}

/// Engine without retry backoff
pub fn engine(
    registry: Arc<TemplateRegistry>,
    invoker: ScriptedInvoker,
    max_retries: u32,
) -> ExecutionEngine {
    engine_with_policy(registry, invoker, RetryPolicy::immediate(max_retries))
}

pub fn engine_with_policy(
    registry: Arc<TemplateRegistry>,
    invoker: ScriptedInvoker,
    retry: RetryPolicy,
) -> ExecutionEngine {
    ExecutionEngine::builder(registry, Arc::new(invoker))
        .config(EngineConfig {
            retry,
            ..EngineConfig::default()
        })
        .build()
}
