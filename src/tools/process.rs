//! Process-backed tool invoker
//!
//! Runs catalog commands as child processes:
//! - argv execution, never through a shell
//! - budget enforced with `tokio::time::timeout`; the child is killed on expiry
//! - output capped at `max_output_bytes`

use crate::tools::invoker::ToolInvoker;
use crate::tools::registry::ToolCatalog;
use crate::tools::types::Invocation;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default cap on captured output (2MB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 2_097_152;

/// Invoker that spawns the catalog's command line for each tool
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    catalog: ToolCatalog,
    max_output_bytes: usize,
}

impl ProcessInvoker {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    fn truncate(&self, mut text: String) -> String {
        if text.len() > self.max_output_bytes {
            let mut cut = self.max_output_bytes;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n[output truncated]");
        }
        text
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(&self, tool: &str, target: &str, budget: Duration) -> Invocation {
        let start = Instant::now();

        let argv = match self.catalog.command_for(tool, target) {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                return Invocation::failure(
                    tool,
                    format!("No command configured for tool: {}", tool),
                    start.elapsed(),
                )
            }
        };

        debug!(tool, command = %argv.join(" "), budget_secs = budget.as_secs(), "spawning tool");

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(budget, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();

                let combined = if stderr.trim().is_empty() {
                    stdout
                } else {
                    format!("{}\n\nSTDERR:\n{}", stdout, stderr)
                };

                // Killed by signal has no code
                let exit_code = output.status.code().unwrap_or(-1);

                Invocation::with_exit_code(
                    tool,
                    self.truncate(combined),
                    exit_code,
                    start.elapsed(),
                )
            }
            Ok(Err(e)) => Invocation::failure(
                tool,
                format!("Failed to execute {}: {}", argv[0], e),
                start.elapsed(),
            ),
            Err(_) => {
                warn!(tool, budget_secs = budget.as_secs_f64(), "tool exceeded its ceiling");
                Invocation::timeout(tool, budget, start.elapsed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn invoker_with(tool: &str, argv: &[&str]) -> ProcessInvoker {
        let mut commands = HashMap::new();
        commands.insert(
            tool.to_string(),
            argv.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        );
        ProcessInvoker::new(ToolCatalog::new().with_overrides(&commands))
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_without_spawning() {
        let invoker = ProcessInvoker::new(ToolCatalog::new());
        let result = invoker.invoke("hydra", "example.com", Duration::from_secs(1)).await;

        assert!(!result.success);
        assert!(!result.timed_out);
        assert!(result.reason().contains("No command configured"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_invocation_failure() {
        let invoker = invoker_with("ghost", &["reconchain-definitely-not-installed", "{target}"]);
        let result = invoker.invoke("ghost", "example.com", Duration::from_secs(5)).await;

        assert!(!result.success);
        assert!(!result.timed_out);
        assert!(result.reason().contains("Failed to execute"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_substitutes_target() {
        let invoker = invoker_with("echo", &["echo", "scanning", "{host}"]);
        let result = invoker
            .invoke("echo", "https://example.com:8443/", Duration::from_secs(5))
            .await;

        assert!(result.success);
        assert!(result.payload.contains("scanning example.com"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let invoker = invoker_with("false", &["false"]);
        let result = invoker.invoke("false", "example.com", Duration::from_secs(5)).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_budget_enforced() {
        let invoker = invoker_with("sleeper", &["sleep", "5"]);
        let started = Instant::now();
        let result = invoker
            .invoke("sleeper", "example.com", Duration::from_millis(200))
            .await;

        assert!(!result.success);
        assert!(result.timed_out);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let invoker = ProcessInvoker::new(ToolCatalog::new()).with_max_output_bytes(3);
        let text = invoker.truncate("aé€b".to_string());
        assert!(text.starts_with("aé"));
        assert!(text.ends_with("[output truncated]"));
    }
}
