//! # motesim
//!
//! CLI runner for motesim scenarios.

use clap::{Args, Parser, Subcommand};
use motesim_metrics::metric_defs;
use motesim_runner::{NetworkController, ReferenceEngine, RunnerError, Scenario, ScenarioRunner};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// CLI Configuration
// ============================================================================

/// motesim - mote network control plane
#[derive(Parser, Debug)]
#[command(name = "motesim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario against the reference engine
    Run(RunConfig),
    /// Validate a scenario and the files it references without running it
    Check(PathConfig),
    /// List all metrics with descriptions and labels
    Metrics,
}

/// Where scenario files are resolved from.
#[derive(Args, Debug)]
pub struct PathConfig {
    /// Scenario file (YAML, or JSON by .json extension)
    pub scenario: PathBuf,

    /// Directory topology files are resolved against
    #[arg(long, default_value = "topo")]
    pub topo_dir: PathBuf,

    /// Directory noise files are resolved against
    #[arg(long, default_value = "noise")]
    pub noise_dir: PathBuf,
}

/// Configuration for a scenario run
#[derive(Parser, Debug)]
pub struct RunConfig {
    #[command(flatten)]
    pub paths: PathConfig,

    /// Override the scenario's random seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Log and skip steps that fail validation instead of stopping
    #[arg(long)]
    pub keep_going: bool,
}

impl PathConfig {
    fn runner(&self, keep_going: bool) -> ScenarioRunner {
        ScenarioRunner {
            topo_dir: self.topo_dir.clone(),
            noise_dir: self.noise_dir.clone(),
            keep_going,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_scenario(config: RunConfig) -> Result<(), RunnerError> {
    let scenario = Scenario::from_path(&config.paths.scenario)?;
    let seed = config.seed.unwrap_or(scenario.seed);
    info!(scenario = %config.paths.scenario.display(), seed, "starting run");

    let mut controller = NetworkController::new(ReferenceEngine::new(seed));
    let report = config
        .paths
        .runner(config.keep_going)
        .run(&scenario, &mut controller)?;

    let engine = controller.engine();
    for &node in controller.known_nodes() {
        let inbox = engine.inbox(node);
        info!(
            node = node.get(),
            booted = engine.is_booted(node),
            powered = engine.is_powered(node),
            received = inbox.len(),
            "node summary"
        );
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_scenario(config: PathConfig) -> Result<(), RunnerError> {
    let scenario = Scenario::from_path(&config.scenario)?;
    config.runner(false).check(&scenario)?;
    println!(
        "{}: ok ({} steps)",
        config.scenario.display(),
        scenario.steps.len()
    );
    Ok(())
}

fn print_metrics_info() {
    for metric in metric_defs::ALL {
        println!("{} ({})", metric.name, metric.kind);
        if !metric.description.is_empty() {
            println!("    {}", metric.description);
        }
        if !metric.labels.is_empty() {
            println!("    labels: {}", metric.labels.join(", "));
        }
    }
}

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    motesim_metrics::describe_metrics();

    match cli.command {
        Commands::Run(config) => run_scenario(config)?,
        Commands::Check(config) => check_scenario(config)?,
        Commands::Metrics => print_metrics_info(),
    }

    Ok(())
}
