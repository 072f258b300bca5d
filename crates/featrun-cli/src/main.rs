//! featrun - tag-aware parallel runner for declarative API test suites
//!
//! ## Commands
//!
//! - `run-all`: every scenario, one worker
//! - `run-parallel`: everything not tagged `@ignore`, N workers
//! - `run-smoke`: scenarios tagged `@smoke`, one worker
//! - `run-regression`: scenarios tagged `@regression`, N workers
//! - `run`: arbitrary tag expression
//! - `list`: print the selected scenarios without executing them
//!
//! Exit code 0 when every executed scenario passed, 1 when any failed and 2
//! on discovery or configuration errors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{warn, Level};

use featrun_core::{
    render_summary, write_report_json, CancelHandle, ConfigError, DryRunExecutor, FeatrunError,
    ProcessExecutor, RunProfile, RunnerConfig, ScenarioExecutor, SpecLoader, SuiteRunner,
    TagExpression,
};

/// Exit code for errors that stop a run before any scenario executes.
const FATAL_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(name = "featrun")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tag-aware parallel runner for declarative API test suites", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Root directory of the feature files (overrides `features_dir`)
    #[arg(long, global = true)]
    features: Option<PathBuf>,

    /// Config file (default: ./featrun.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target environment (overrides FEATRUN_ENV and the config file)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Per-scenario time budget in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Command run per scenario, split on whitespace; supports {feature}, {line} and {name}
    #[arg(long, global = true, allow_hyphen_values = true)]
    exec: Option<String>,

    /// Pass every selected scenario without executing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Write a JSON run report to this path
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every scenario on a single worker
    RunAll,

    /// Run everything not tagged @ignore in parallel
    RunParallel {
        /// Worker count (default: config default_workers, 5)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run scenarios tagged @smoke on a single worker
    RunSmoke,

    /// Run scenarios tagged @regression in parallel
    RunRegression {
        /// Worker count (default: config default_workers, 5)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run scenarios selected by a tag expression
    Run {
        /// Tag expression, e.g. "@users,@orders ~@slow" (repeatable)
        #[arg(short, long = "tags", required = true, allow_hyphen_values = true)]
        tags: Vec<String>,

        /// Worker count (default: config default_workers, 5)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// List selected scenarios without executing them
    List {
        /// Tag expression (repeatable; default: everything)
        #[arg(short, long = "tags", allow_hyphen_values = true)]
        tags: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    featrun_core::init_tracing(cli.json, level);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut config =
        RunnerConfig::resolve(cli.config.as_deref(), &cwd).map_err(FeatrunError::from)?;
    apply_overrides(&mut config, &cli);
    config.validate().map_err(FeatrunError::from)?;

    let loader = SpecLoader::with_extensions(config.extensions.clone());
    let profile = profile_for(&cli.command, &config)?;
    match cli.command {
        Commands::List { .. } => cmd_list(loader, &config, &profile),
        _ => {
            let executor = build_executor(&config, cli.dry_run)?;
            cmd_run(loader, &config, executor, &profile, cli.report.as_deref()).await
        }
    }
}

/// Apply command-line overrides on top of the resolved config.
fn apply_overrides(config: &mut RunnerConfig, cli: &Cli) {
    if let Some(features) = &cli.features {
        config.features_dir = features.clone();
    }
    if let Some(env) = &cli.env {
        config.env = env.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.scenario_timeout_ms = Some(timeout_ms);
    }
    if let Some(exec) = &cli.exec {
        config.executor.command = exec.split_whitespace().map(str::to_string).collect();
    }
}

fn profile_for(command: &Commands, config: &RunnerConfig) -> Result<RunProfile, FeatrunError> {
    let workers = |w: &Option<usize>| w.unwrap_or(config.default_workers);
    Ok(match command {
        Commands::RunAll => RunProfile::All,
        Commands::RunParallel { workers: w } => RunProfile::Parallel {
            workers: workers(w),
        },
        Commands::RunSmoke => RunProfile::Smoke,
        Commands::RunRegression { workers: w } => RunProfile::Regression {
            workers: workers(w),
        },
        Commands::Run { tags, workers: w } => RunProfile::Custom {
            expression: TagExpression::parse_all(tags)?,
            workers: workers(w),
        },
        Commands::List { tags } => RunProfile::Custom {
            expression: TagExpression::parse_all(tags)?,
            workers: 1,
        },
    })
}

fn build_executor(config: &RunnerConfig, dry_run: bool) -> Result<Arc<dyn ScenarioExecutor>> {
    if dry_run {
        return Ok(Arc::new(DryRunExecutor));
    }
    if config.executor.command.is_empty() {
        return Err(FeatrunError::from(ConfigError::Invalid(
            "no executor command configured; pass --exec, set [executor] command or use --dry-run"
                .to_string(),
        ))
        .into());
    }
    let executor = ProcessExecutor::from_config(config).map_err(FeatrunError::from)?;
    Ok(Arc::new(executor))
}

async fn cmd_run(
    loader: SpecLoader,
    config: &RunnerConfig,
    executor: Arc<dyn ScenarioExecutor>,
    profile: &RunProfile,
    report_path: Option<&std::path::Path>,
) -> Result<u8> {
    let runner = SuiteRunner::new(loader, &config.features_dir, executor)
        .with_timeout(config.scenario_timeout());

    let cancel = CancelHandle::new();
    let mut interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return std::future::pending::<()>().await;
            }
            warn!("Interrupt received, finishing in-flight scenarios (Ctrl-C again to abort)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_err() {
                return std::future::pending::<()>().await;
            }
            warn!("Second interrupt received, aborting in-flight scenarios");
        })
    };
    // A second interrupt drops the run; the runtime shutdown then kills
    // in-flight children.
    let outcome = tokio::select! {
        outcome = runner.run(profile, &cancel) => outcome,
        _ = &mut interrupt => anyhow::bail!("run aborted by a second interrupt"),
    };
    interrupt.abort();
    let report = outcome?;

    print!("{}", render_summary(&report));

    if let Some(path) = report_path {
        write_report_json(path, &report)?;
        println!("Report written to {}", path.display());
    }

    Ok(report.exit_code())
}

fn cmd_list(loader: SpecLoader, config: &RunnerConfig, profile: &RunProfile) -> Result<u8> {
    let expression = profile.tag_expression().map_err(FeatrunError::from)?;
    let runner = SuiteRunner::new(loader, &config.features_dir, Arc::new(DryRunExecutor));
    let plan = runner.plan(&expression)?;

    for selected in &plan.specs {
        for scenario in &selected.scenarios {
            let tags: Vec<String> = scenario.tags.iter().map(|t| t.to_string()).collect();
            if tags.is_empty() {
                println!("{}  {}", scenario.id, scenario.name);
            } else {
                println!("{}  {}  [{}]", scenario.id, scenario.name, tags.join(" "));
            }
        }
    }
    println!(
        "{} scenario(s) in {} of {} spec(s)",
        plan.scenario_count(),
        plan.specs.len(),
        plan.specs_scanned
    );
    Ok(0)
}
