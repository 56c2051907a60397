//! Command-line argument parsing for reconchain
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reconchain - chained reconnaissance workflows with intelligence handoff
#[derive(Parser, Debug)]
#[command(name = "reconchain")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(
    about = "Run phased security assessment workflows that feed each tool's findings into the next",
    long_about = None
)]
pub struct Args {
    /// Configuration file path (default: ~/.reconchain/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only the final summary)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assess one or more targets; several targets run concurrently
    Run {
        /// Domains, addresses or URLs
        #[arg(value_name = "TARGET", required = true)]
        targets: Vec<String>,

        /// Workflow template
        #[arg(short, long, default_value = "quick-recon")]
        template: String,

        /// Retry failed steps after the run (up to the configured limit)
        #[arg(long)]
        retry: bool,

        /// Write a JSON report; with several targets one file per target
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List workflow templates
    Templates,

    /// List known tools and their command lines
    Tools,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "reconchain=info,warn",
            Verbosity::Verbose => "reconchain=debug,info",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should print each activity as it happens
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
