//! Suite binary entry point
//!
//! Parses the command line, loads configuration and dispatches to `run`,
//! `list` or the hidden `worker` mode used by the parallel runner.

use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::runtime::Runtime;
use tracing::{debug, error};

use crate::cli::{Args, Command, InitArgs, ListArgs, RunArgs};
use crate::config::{EnvConfig, RunConfig, RunnerKind};
use crate::dsl::Suite;
use crate::executor::{ConcurrentRunner, ParallelRunner, SequentialRunner, Strategy};
use crate::output::{write_report_to_file, OutputFormat, ResultFormatter};
use crate::report::{run_session, LogReporter};
use crate::resolve::Selection;
use crate::utils::logger::{init_logger, LogLevel};
use crate::worker::{serve, ProcessLauncher, WorkerAssignment};

/// Run `suite` as a command-line program.
///
/// Exits with failure when a test failed, stayed pending or a worker
/// misbehaved.
pub fn run(suite: Suite) -> ExitCode {
    let args = Args::parse();
    match execute(suite, args) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(suite: Suite, args: Args) -> Result<ExitCode> {
    let env = EnvConfig::load();
    let mut config = load_config(args.config.as_deref(), &env)?;
    config.apply_env(&env);

    let command = args.command.unwrap_or(Command::Run(RunArgs::default()));
    if let Command::Run(run) = &command {
        run.apply(&mut config);
    }
    config.validate()?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level()?
    };
    init_logger(level);
    debug!("Configuration: {:?}", config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match command {
        Command::Run(run) => block_on_detached(runtime, run_suite(&suite, &config, run, env.grep)),
        Command::List(list) => list_suite(&suite, &config, list, env.grep),
        Command::Init(init) => init_config(&config, &init),
        Command::Worker => block_on_detached(runtime, serve_stdio(&suite)),
    }
}

/// Drive `future` to completion, then shut the runtime down without waiting
/// for blocking hooks abandoned by a timeout.
fn block_on_detached<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

/// `--config` wins over `ROSESPEC_CONFIG`, which wins over the standard
/// locations
fn load_config(cli_path: Option<&Path>, env: &EnvConfig) -> Result<RunConfig> {
    match (cli_path, &env.config_file) {
        (Some(path), _) => RunConfig::load(path),
        (None, Some(path)) => RunConfig::load(path),
        (None, None) => RunConfig::load_default(),
    }
}

fn selection(grep: Option<String>) -> Result<Selection> {
    let grep = grep.unwrap_or_default();
    Selection::parse(&grep).with_context(|| format!("Invalid test pattern: {grep}"))
}

fn strategy(config: &RunConfig) -> Result<Strategy> {
    Ok(match config.runner {
        RunnerKind::Sequential => Strategy::Sequential(SequentialRunner::new()),
        RunnerKind::Concurrent => Strategy::Concurrent(ConcurrentRunner::new(config.concurrency)),
        RunnerKind::Parallel => {
            let launcher = ProcessLauncher::current_exe()
                .context("Failed to locate the running executable")?;
            Strategy::Parallel(
                ParallelRunner::new(Arc::new(launcher))
                    .with_parallelism(config.parallelism)
                    .with_child_concurrency(config.child_concurrency)
                    .with_default_timeout(config.default_timeout())
                    .with_idle_timeout(config.worker_idle_timeout()),
            )
        }
    })
}

async fn run_suite(
    suite: &Suite,
    config: &RunConfig,
    args: RunArgs,
    env_grep: Option<String>,
) -> Result<ExitCode> {
    let selection = selection(args.grep.or(env_grep))?;
    let tests = suite
        .tests(config.default_timeout())
        .context("Failed to build suite")?;
    let selected = selection.apply(tests);
    let strategy = strategy(config)?;

    let mut reporter = LogReporter::new();
    let report = run_session(&strategy, selected, &mut reporter).await;

    let format = config.output_format()?;
    let mut formatter = ResultFormatter::new(format);
    if !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_report(&report));

    if let Some(path) = &args.output {
        write_report_to_file(path, &report, format)
            .with_context(|| format!("Failed to write report to {path}"))?;
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn list_suite(
    suite: &Suite,
    config: &RunConfig,
    args: ListArgs,
    env_grep: Option<String>,
) -> Result<ExitCode> {
    let selection = selection(args.grep.or(env_grep))?;
    let tests = suite
        .tests(config.default_timeout())
        .context("Failed to build suite")?;
    let selected = selection.apply(tests);

    let format = match &args.format {
        Some(format) => format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
        None => config.output_format()?,
    };
    let listing = ResultFormatter::new(format).format_list(&selected);
    if listing.ends_with('\n') || listing.is_empty() {
        print!("{listing}");
    } else {
        println!("{listing}");
    }
    Ok(ExitCode::SUCCESS)
}

fn init_config(config: &RunConfig, args: &InitArgs) -> Result<ExitCode> {
    let path = &args.output;
    if path.exists() && !args.force {
        anyhow::bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }
    config.save(path)?;
    println!("✓ Configuration file created: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

/// Worker mode: assignment on stdin, one message per stdout line
async fn serve_stdio(suite: &Suite) -> Result<ExitCode> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read worker assignment")?;
    let assignment = WorkerAssignment::from_json(&input).context("Invalid worker assignment")?;

    let stdout = std::io::stdout();
    serve(suite, &assignment, |message| {
        let line = message.to_line()?;
        let mut out = stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    })
    .await?;
    Ok(ExitCode::SUCCESS)
}
