//! CLI argument parsing
//!
//! Defines the command-line interface of a suite binary using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{RunConfig, RunnerKind};

/// Run a rosespec test suite
#[derive(Parser, Debug)]
#[command(name = "rosespec")]
#[command(version)]
#[command(about = "Run, list and parallelize BDD-style test suites")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the selected tests (default)
    Run(RunArgs),

    /// List the selected tests without running them
    List(ListArgs),

    /// Write the effective configuration to a file
    Init(InitArgs),

    /// Serve a worker assignment read from stdin
    #[command(hide = true)]
    Worker,
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Select tests by title prefix, or by regex written as /expr/
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Runner to use
    #[arg(short, long, value_enum)]
    pub runner: Option<RunnerKind>,

    /// Tests running at once (concurrent runner)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Worker processes (parallel runner)
    #[arg(short = 'j', long)]
    pub parallelism: Option<usize>,

    /// Tests running at once inside each worker
    #[arg(long)]
    pub child_concurrency: Option<usize>,

    /// Default test timeout in milliseconds; 0 disables it
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Kill a worker that stays silent this many seconds
    #[arg(long)]
    pub worker_idle_timeout: Option<u64>,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<String>,
}

impl RunArgs {
    /// Apply command-line overrides
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(runner) = self.runner {
            config.runner = runner;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(parallelism) = self.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(child_concurrency) = self.child_concurrency {
            config.child_concurrency = child_concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.default_timeout_ms = timeout;
        }
        if let Some(idle) = self.worker_idle_timeout {
            config.worker_idle_timeout_secs = Some(idle);
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
    }
}

/// Arguments for list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Select tests by title prefix, or by regex written as /expr/
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Destination (.yaml/.yml writes YAML, anything else JSON)
    #[arg(short, long, default_value = "rosespec.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
