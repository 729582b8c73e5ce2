//! Headless autobattler runner.
//!
//! Runs the simulation without any frontend for benchmarking, balance
//! batches, determinism checks and content validation.
//!
//! # Usage
//!
//! ```bash
//! # Run a single seed and print its counters
//! cargo run -p arena_headless -- run --seed 42 --replay run42.replay
//!
//! # Run 1000 consecutive seeds in parallel
//! cargo run -p arena_headless -- batch --seed 0 --count 1000 --output results/batch.json
//!
//! # Verify determinism of one seed
//! cargo run -p arena_headless -- verify --seed 42 --runs 8
//!
//! # Re-drive a recorded run
//! cargo run -p arena_headless -- replay --file run42.replay
//!
//! # Check a content directory
//! cargo run -p arena_headless -- validate --content assets/content
//! ```
//!
//! JSON reports go to stdout; logs go to stderr.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use arena_core::replay::RunReplay;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    content_loader::{load_content, load_sim_config, ContentLoadError, ContentReport},
    policy::PolicyKind,
    runner::{run_single, RunConfig},
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless autobattler runner for batch simulation and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Content directory (defaults to the shipped assets)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// SimConfig overrides in RON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one run to completion
    Run {
        /// Run seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Starting relic id
        #[arg(long)]
        relic: Option<String>,

        /// Choice policy
        #[arg(long, value_enum, default_value_t = PolicyKind::First)]
        policy: PolicyKind,

        /// Save a replay of the run to this path
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Play many consecutive seeds in parallel
    Batch {
        /// First seed
        #[arg(long, default_value = "0")]
        seed: u32,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting relic id for every run
        #[arg(long)]
        relic: Option<String>,

        /// Choice policy
        #[arg(long, value_enum, default_value_t = PolicyKind::First)]
        policy: PolicyKind,

        /// Also write the full results (per-run metrics) to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u32,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Starting relic id
        #[arg(long)]
        relic: Option<String>,

        /// Choice policy
        #[arg(long, value_enum, default_value_t = PolicyKind::Seeded)]
        policy: PolicyKind,
    },

    /// Re-drive a recorded run and check its hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Load and validate content, listing every problem
    Validate,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for reports)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            seed,
            relic,
            policy,
            replay,
        } => {
            let (content, sim_config) = load_inputs(cli.content, cli.config);
            cmd_run(&content, &sim_config, seed, relic, policy, replay);
        }
        Commands::Batch {
            seed,
            count,
            parallel,
            relic,
            policy,
            output,
        } => {
            let (content, sim_config) = load_inputs(cli.content, cli.config);
            let config = BatchConfig {
                seed_start: seed,
                run_count: count,
                parallel_runs: parallel,
                relic,
                policy,
                output,
            };
            cmd_batch(&content, &sim_config, config);
        }
        Commands::Verify {
            seed,
            runs,
            relic,
            policy,
        } => {
            let (content, sim_config) = load_inputs(cli.content, cli.config);
            let config = RunConfig::new(seed).with_relic(relic).with_policy(policy);
            cmd_verify(&content, &sim_config, &config, runs);
        }
        Commands::Replay { file } => {
            let (content, sim_config) = load_inputs(cli.content, cli.config);
            cmd_replay(content, sim_config, &file);
        }
        Commands::Validate => cmd_validate(cli.content),
    }
}

/// Load content and config, exiting on failure.
fn load_inputs(
    content_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> (Arc<ContentLibrary>, SimConfig) {
    let content = match load_content(content_dir.as_deref()) {
        Ok(content) => content,
        Err(e) => fatal(&format!("Failed to load content: {e}")),
    };

    let sim_config = match config_path {
        Some(path) => match load_sim_config(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded SimConfig overrides");
                config
            }
            Err(e) => fatal(&format!("Failed to load config: {e}")),
        },
        None => SimConfig::default(),
    };

    (content, sim_config)
}

/// Play one run
fn cmd_run(
    content: &Arc<ContentLibrary>,
    sim_config: &SimConfig,
    seed: u32,
    relic: Option<String>,
    policy: PolicyKind,
    replay_path: Option<PathBuf>,
) {
    tracing::info!(seed, relic = ?relic, ?policy, "Starting run");

    let config = RunConfig::new(seed).with_relic(relic).with_policy(policy);
    let output = match run_single(content, sim_config, &config) {
        Ok(output) => output,
        Err(e) => fatal(&format!("Run failed: {e}")),
    };

    if let Some(path) = replay_path {
        if let Err(e) = output.replay.save(&path) {
            fatal(&format!("Failed to save replay: {e}"));
        }
        tracing::info!(
            path = %path.display(),
            choices = output.replay.choice_count(),
            "Replay saved"
        );
    }

    let m = &output.metrics;
    tracing::info!(
        victory = m.victory,
        waves_cleared = m.waves_cleared,
        ticks = m.total_ticks,
        events = m.events_emitted,
        elapsed_ms = format!("{:.2}", m.elapsed_seconds * 1000.0),
        "Run complete"
    );
    print_json(m);
}

/// Run a batch of seeds
fn cmd_batch(content: &Arc<ContentLibrary>, sim_config: &SimConfig, config: BatchConfig) {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(cpus_available = num_cpus, "Batch configuration");

    let output = config.output.clone();
    let results = run_batch(content, sim_config, config);

    if let Some(path) = output {
        if let Err(e) = results.save(&path) {
            tracing::error!(error = %e, path = %path.display(), "Failed to save results");
            fatal(&format!("Failed to save results: {e}"));
        }
        eprintln!("Results saved to: {}", path.display());
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs played: {}", results.runs.len());
    if !results.errors.is_empty() {
        eprintln!("Runs FAILED: {}", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!("  Run {} (seed {}): {}", error.run_index, error.seed, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }
    eprintln!("Duration: {:.2}s", results.duration_seconds);
    eprintln!("Throughput: {:.1} runs/sec", results.throughput());
    eprintln!("Victory rate: {:.1}%", summary.victory_rate * 100.0);
    eprintln!("Mean waves cleared: {:.2}", summary.avg_waves_cleared);
    if let Some(wave) = summary.deadliest_wave() {
        eprintln!("Deadliest wave: {wave}");
    }

    print_json(summary);

    if !results.errors.is_empty() {
        process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(
    content: &Arc<ContentLibrary>,
    sim_config: &SimConfig,
    config: &RunConfig,
    runs: u32,
) {
    tracing::info!(seed = config.seed, runs, "Verifying determinism");

    let report = match verify_determinism(content, sim_config, config, runs) {
        Ok(report) => report,
        Err(e) => fatal(&format!("Verification run failed: {e}")),
    };
    print_json(&report);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        process::exit(1);
    }
}

/// Verify a recorded replay
fn cmd_replay(content: Arc<ContentLibrary>, sim_config: SimConfig, file: &Path) {
    tracing::info!("Verifying replay: {}", file.display());

    let replay = match RunReplay::load(file) {
        Ok(replay) => replay,
        Err(e) => fatal(&format!("Failed to load replay: {e}")),
    };

    eprintln!("Loaded replay:");
    eprintln!("  Seed: {}", replay.seed);
    eprintln!("  Relic: {}", replay.relic.as_deref().unwrap_or("none"));
    eprintln!("  Choices: {}", replay.choice_count());
    eprintln!("  Duration: {} ticks", replay.total_ticks);

    match replay.verify(content, sim_config) {
        Ok(summary) => {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Hash: {:016x}", summary.event_log_hash);
            print_json(&summary);
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            process::exit(1);
        }
    }
}

/// Validate a content directory
fn cmd_validate(content_dir: Option<PathBuf>) {
    match load_content(content_dir.as_deref()) {
        Ok(content) => {
            let report = ContentReport::from_library(&content);
            eprintln!("OK: {} records", report.total());
            print_json(&report);
        }
        Err(ContentLoadError::Validation(errors)) => {
            eprintln!("INVALID: {} problem(s)", errors.len());
            for error in &errors {
                eprintln!("  - {error}");
            }
            process::exit(1);
        }
        Err(e) => fatal(&e.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("Failed to encode report: {e}")),
    }
}

fn fatal(message: &str) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    process::exit(1);
}
