//! Terminal output for assessments
//!
//! One progress bar per assessment, fed from the activity log's broadcast
//! channel. Listings and summaries print with `colored`.

use crate::activity::{Activity, ActivityKind};
use crate::cli::Verbosity;
use crate::config::Config;
use crate::engine::ExecutionState;
use crate::intel::IntelligenceRecord;
use crate::tools::ToolCatalog;
use crate::workflow::TemplateRegistry;
use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Steady tick for spinners (10 FPS)
const TICK: Duration = Duration::from_millis(100);

/// Progress display for concurrent assessments
pub struct AssessmentDisplay {
    multi: MultiProgress,
    bars: HashMap<Uuid, ProgressBar>,
    verbosity: Verbosity,
}

impl AssessmentDisplay {
    pub fn new(verbosity: Verbosity) -> Self {
        let multi = if verbosity.show_progress() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        Self {
            multi,
            bars: HashMap::new(),
            verbosity,
        }
    }

    /// Add a bar for an assessment of `total` steps
    pub fn track(&mut self, assessment: Uuid, target: &str, total: usize) {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar.set_prefix(target.to_string());
        bar.enable_steady_tick(TICK);
        self.bars.insert(assessment, bar);
    }

    /// Reflect one activity on its assessment's bar
    pub fn handle(&self, activity: &Activity) {
        if self.verbosity.show_events() {
            self.println(format_activity(activity));
        }

        let Some(bar) = activity.assessment.and_then(|id| self.bars.get(&id)) else {
            return;
        };

        match (activity.kind, activity.tool.as_deref()) {
            (ActivityKind::Start, Some(tool)) => bar.set_message(tool.to_string()),
            (ActivityKind::Start, None) => {
                // New run or retry pass
                let total = activity
                    .data
                    .as_ref()
                    .and_then(|data| data.get("total_steps").or_else(|| data.get("steps")))
                    .and_then(|value| {
                        value
                            .as_array()
                            .map(|a| a.len() as u64)
                            .or_else(|| value.as_u64())
                    });
                if let Some(total) = total {
                    bar.set_length(total);
                    bar.set_position(0);
                }
                bar.set_message(activity.message.clone());
            }
            (ActivityKind::Complete, Some(_)) => bar.inc(1),
            (ActivityKind::Error, Some(tool)) => {
                bar.inc(1);
                if !self.verbosity.show_events() {
                    self.println(format!("{} {}", "✗".red(), activity.message));
                }
                bar.set_message(format!("{} failed", tool));
            }
            (ActivityKind::Complete, None) => bar.finish_with_message(activity.message.clone()),
            (ActivityKind::Progress, _) => bar.set_message(activity.message.clone()),
            _ => {}
        }
    }

    fn println(&self, line: String) {
        if self.verbosity.show_progress() {
            // Prints above the bars without tearing them
            let _ = self.multi.println(line);
        }
    }

    pub fn finish(&self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

/// One-line rendering of an activity
pub fn format_activity(activity: &Activity) -> String {
    let time = activity.timestamp.format("%H:%M:%S").to_string();
    let kind = match activity.kind {
        ActivityKind::Start => "start".cyan(),
        ActivityKind::Progress => "progress".blue(),
        ActivityKind::Complete => "complete".green(),
        ActivityKind::Error => "error".red(),
        ActivityKind::DataHandoff => "handoff".magenta(),
    };

    let scope = match (&activity.phase, &activity.tool) {
        (Some(phase), Some(tool)) => format!("[{}/{}] ", phase.as_str(), tool),
        (Some(phase), None) => format!("[{}] ", phase.as_str()),
        (None, Some(tool)) => format!("[{}] ", tool),
        (None, None) => String::new(),
    };

    format!("{} {:>8} {}{}", time.dimmed(), kind, scope, activity.message)
}

/// Final summary for one assessment
pub fn show_summary(state: &ExecutionState, intelligence: &HashMap<String, IntelligenceRecord>) {
    let rate = state.success_rate();
    let headline = format!(
        "{}: {}/{} steps succeeded ({:.1}%)",
        state.target, state.completed_steps, state.total_steps, rate
    );

    println!();
    if state.failed_steps.is_empty() {
        println!("{} {}", "✓".green().bold(), headline.green().bold());
    } else {
        println!("{} {}", "!".yellow().bold(), headline.yellow().bold());
    }
    if state.retry_count > 0 {
        println!(
            "  {}",
            format!("retry passes: {}/{}", state.retry_count, state.max_retries).dimmed()
        );
    }

    for failed in &state.failed_steps {
        println!(
            "  {} {} ({}) against {}: {}",
            "✗".red(),
            failed.tool.bold(),
            failed.phase,
            failed.target,
            failed.reason.red()
        );
    }

    let mut tools: Vec<&String> = intelligence.keys().collect();
    tools.sort();
    for tool in tools {
        let record = &intelligence[tool];
        if record.is_empty() {
            continue;
        }
        let items: Vec<String> = record
            .summary()
            .into_iter()
            .map(|(key, count)| format!("{} {}", count, key))
            .collect();
        println!("  {} {}: {}", "•".cyan(), tool, items.join(", "));
    }
}

pub fn show_templates(registry: &TemplateRegistry) {
    println!("{}", "Workflow templates".bold().cyan());
    for template in registry.templates() {
        println!(
            "\n  {} {}",
            template.name.bold(),
            format!("({} steps)", template.total_steps()).dimmed()
        );
        if !template.description.is_empty() {
            println!("    {}", template.description);
        }
        for phase in &template.phases {
            println!("    {:<26} {}", phase.id.display_name().green(), phase.tools.join(", "));
        }
    }
}

pub fn show_tools(catalog: &ToolCatalog, config: &Config) {
    let engine = config.engine_config();
    println!("{}", "Known tools".bold().cyan());
    println!("  {}\n", format!("wordlist: {}", catalog.wordlist()).dimmed());

    for spec in catalog.specs() {
        let ceiling = engine.ceiling_for(&spec.name).as_secs();
        println!(
            "  {:<14} {:<16} {:>6}s  {}",
            spec.name.bold(),
            spec.class().to_string().dimmed(),
            ceiling,
            spec.argv.join(" ")
        );
    }
}

pub fn show_config(config: &Config, path: &Path) {
    println!("{}", "Configuration".bold().cyan());
    println!("  {:<22} {}", "file", path.display());
    println!("  {:<22} {}", "max_retries", config.engine.max_retries);
    println!(
        "  {:<22} {}ms..{}ms",
        "retry backoff", config.engine.retry_base_delay_ms, config.engine.retry_max_delay_ms
    );
    println!(
        "  {:<22} {}ms",
        "worst-case backoff",
        config.engine_config().retry.max_total_wait().as_millis()
    );
    println!("  {:<22} {}", "auto_retry", config.engine.auto_retry);
    println!("  {:<22} {}", "wordlist", config.tools.wordlist);
    println!("  {:<22} {}", "max_output_bytes", config.tools.max_output_bytes);

    let mut timeouts: Vec<_> = config.tools.timeouts.iter().collect();
    timeouts.sort();
    for (tool, secs) in timeouts {
        println!("  {:<22} {}s", format!("timeout.{}", tool), secs);
    }
    let mut commands: Vec<_> = config.tools.commands.keys().collect();
    commands.sort();
    for tool in commands {
        println!("  {:<22} {}", format!("command.{}", tool), config.tools.commands[tool].join(" "));
    }
    for template in &config.templates {
        println!("  {:<22} {}", "template", template.name);
    }
}

pub fn show_error(error: &str) {
    eprintln!("{} {}", "Error:".red().bold(), error.red());
}

pub fn show_warning(warning: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), warning.yellow());
}
