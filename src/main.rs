//! reconchain - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::future::join_all;
use reconchain::{
    activity::ActivityLog,
    cli::{Args, Commands, Verbosity},
    config::Config,
    display::{self, AssessmentDisplay},
    engine::ExecutionEngine,
    report::{report_path, AssessmentReport},
    tools::{ProcessInvoker, ToolInvoker},
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, oneshot};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;
    debug!(path = %config_path.display(), "configuration loaded");

    match args.command {
        Commands::Run {
            targets,
            template,
            retry,
            output,
        } => {
            let retry = retry || config.engine.auto_retry;
            run_assessments(&config, &targets, &template, retry, output, verbosity).await
        }
        Commands::Templates => {
            display::show_templates(&config.registry()?);
            Ok(())
        }
        Commands::Tools => {
            display::show_tools(&config.catalog(), &config);
            Ok(())
        }
        Commands::Config => {
            display::show_config(&config, &config_path);
            Ok(())
        }
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one assessment per target, concurrently, sharing one activity log
async fn run_assessments(
    config: &Config,
    targets: &[String],
    template: &str,
    retry: bool,
    output: Option<PathBuf>,
    verbosity: Verbosity,
) -> Result<()> {
    let registry = Arc::new(config.registry()?);
    registry
        .require(template)
        .with_context(|| format!("Available templates: {}", registry.names().join(", ")))?;

    let invoker: Arc<dyn ToolInvoker> = Arc::new(
        ProcessInvoker::new(config.catalog()).with_max_output_bytes(config.tools.max_output_bytes),
    );
    let log = ActivityLog::new();
    let mut display = AssessmentDisplay::new(verbosity);
    let mut receiver = log.subscribe();

    let mut engines = Vec::new();
    for target in targets {
        let engine = ExecutionEngine::builder(Arc::clone(&registry), Arc::clone(&invoker))
            .config(config.engine_config())
            .activity_log(log.clone())
            .build();

        match engine.start(template, target) {
            Ok(assessment) => {
                display.track(assessment, target, engine.state().total_steps);
                engines.push(engine);
            }
            Err(e) => display::show_error(&format!("{}: {}", target, e)),
        }
    }

    if engines.is_empty() {
        anyhow::bail!("No assessment could be started");
    }

    // Render activities until every run is done
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
    let renderer = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(activity) => display.handle(&activity),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "display lagged behind activity log")
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut shutdown_rx => {
                    while let Ok(activity) = receiver.try_recv() {
                        display.handle(&activity);
                    }
                    break;
                }
            }
        }
        display.finish();
    });

    // Ctrl-C stops every run at its next step boundary
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_watch = {
        let engines = engines.clone();
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.store(true, Ordering::SeqCst);
                warn!("interrupted, stopping after in-flight steps");
                for engine in &engines {
                    engine.stop();
                }
            }
        })
    };

    join_all(
        engines
            .iter()
            .map(|engine| drive_assessment(engine, retry, &interrupted)),
    )
    .await;

    interrupt_watch.abort();
    let _ = shutdown.send(());
    if let Err(e) = renderer.await {
        warn!(error = %e, "display task failed");
    }

    for engine in &engines {
        display::show_summary(&engine.state(), &engine.intelligence());
    }

    if let Some(base) = output {
        let multiple = engines.len() > 1;
        for engine in &engines {
            let report = AssessmentReport::from_engine(engine);
            let path = report_path(&base, &report.state.target, multiple);
            report.save(&path)?;
            println!("{} {}", "Report written to".dimmed(), path.display());
        }
    }

    Ok(())
}

/// Wait for the run, then retry passes while allowed
async fn drive_assessment(engine: &ExecutionEngine, retry: bool, interrupted: &AtomicBool) {
    engine.wait().await;

    while retry && !interrupted.load(Ordering::SeqCst) && engine.state().can_retry() {
        match engine.retry_failed_steps() {
            Ok(steps) => {
                info!(assessment = %engine.state().assessment, steps, "retrying failed steps");
                engine.wait().await;
            }
            Err(e) => {
                display::show_warning(&e.to_string());
                break;
            }
        }
    }
}
