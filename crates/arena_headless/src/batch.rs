//! Batch run driver.
//!
//! Runs many seeds in parallel using rayon. Each run owns its whole state
//! graph and only shares the read-only content library, so results are
//! independent of thread count and scheduling.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use arena_core::error::Result as SimResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::policy::PolicyKind;
use crate::runner::{run_single, RunConfig};

/// Configuration for a batch of runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Seed of the first run; run `i` uses `seed_start + i`.
    pub seed_start: u32,
    /// Number of runs.
    pub run_count: u32,
    /// Worker threads (0 = rayon default).
    pub parallel_runs: u32,
    /// Starting relic for every run.
    pub relic: Option<String>,
    /// Choice policy for every run.
    pub policy: PolicyKind,
    /// Where the results file goes, if anywhere.
    pub output: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            seed_start: 0,
            run_count: 100,
            parallel_runs: 0,
            relic: None,
            policy: PolicyKind::First,
            output: None,
        }
    }
}

impl BatchConfig {
    /// Config for `run_count` runs.
    pub fn new(run_count: u32) -> Self {
        Self {
            run_count,
            ..Default::default()
        }
    }

    /// Set the first seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the starting relic.
    pub fn with_relic(mut self, relic: Option<String>) -> Self {
        self.relic = relic;
        self
    }

    /// Set the choice policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Set the results path.
    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    /// Set the worker thread count.
    pub fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_runs = threads;
        self
    }

    fn run_config(&self, index: u32) -> RunConfig {
        RunConfig::new(self.seed_start.wrapping_add(index))
            .with_relic(self.relic.clone())
            .with_policy(self.policy)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-run metrics, in seed order.
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total wall-clock runtime.
    pub duration_seconds: f64,
    /// Runs that could not be played.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Runs per wall-clock second.
    pub fn throughput(&self) -> f64 {
        self.runs.len() as f64 / self.duration_seconds.max(0.001)
    }
}

/// A run that failed to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Index within the batch.
    pub run_index: u32,
    /// Seed used.
    pub seed: u32,
    /// Error message.
    pub message: String,
}

/// Progress tracking shared by batch workers.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total runs.
    pub total: u32,
    completed: AtomicU32,
    victories: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create a tracker for `total` runs.
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            victories: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished run.
    pub fn record_completion(&self, victory: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if victory {
            self.victories.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Runs finished so far.
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Victory rate among finished runs.
    pub fn victory_rate(&self) -> f64 {
        let completed = self.current();
        if completed == 0 {
            return 0.0;
        }
        f64::from(self.victories.load(Ordering::Relaxed)) / f64::from(completed)
    }

    /// Estimated time remaining.
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::ZERO;
        }
        let per_run = self.start_time.elapsed().as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_run * f64::from(remaining))
    }
}

/// Run a batch of consecutive seeds.
///
/// Runs that fail to construct are reported in [`BatchResults::errors`];
/// they never abort the batch.
pub fn run_batch(
    content: &Arc<ContentLibrary>,
    sim_config: &SimConfig,
    config: BatchConfig,
) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.run_count);

    info!(
        runs = config.run_count,
        seed_start = config.seed_start,
        policy = ?config.policy,
        relic = ?config.relic,
        "Starting batch"
    );

    let play = || -> Vec<std::result::Result<RunMetrics, BatchError>> {
        (0..config.run_count)
            .into_par_iter()
            .map(|index| {
                let run_config = config.run_config(index);
                match run_single(content, sim_config, &run_config) {
                    Ok(output) => {
                        progress.record_completion(output.metrics.victory);
                        let completed = progress.current();
                        if completed % 100 == 0 {
                            debug!(
                                completed,
                                total = progress.total,
                                percent = format!("{:.1}", progress.percentage()),
                                victory_rate = format!("{:.3}", progress.victory_rate()),
                                eta_secs = progress.eta().as_secs(),
                                "Batch progress"
                            );
                        }
                        Ok(output.metrics)
                    }
                    Err(e) => {
                        warn!(index, seed = run_config.seed, error = %e, "Run failed");
                        Err(BatchError {
                            run_index: index,
                            seed: run_config.seed,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    };

    let results = if config.parallel_runs > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build()
        {
            Ok(pool) => pool.install(play),
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, using the global pool");
                play()
            }
        }
    } else {
        play()
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunMetrics> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        runs = runs.len(),
        failed = errors.len(),
        victory_rate = format!("{:.3}", summary.victory_rate),
        duration_secs = format!("{duration_seconds:.2}"),
        "Batch complete"
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seed checked.
    pub seed: u32,
    /// Event-log hash of every repetition.
    pub hashes: Vec<u64>,
    /// Whether every repetition matched.
    pub deterministic: bool,
}

/// Play the same run `runs` times in parallel and compare event-log hashes.
///
/// # Errors
/// Returns the first construction error, if the run cannot be played.
pub fn verify_determinism(
    content: &Arc<ContentLibrary>,
    sim_config: &SimConfig,
    config: &RunConfig,
    runs: u32,
) -> SimResult<DeterminismReport> {
    let hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_single(content, sim_config, config).map(|o| o.metrics.event_log_hash))
        .collect::<SimResult<Vec<u64>>>()?;

    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(seed = config.seed, ?hashes, "Non-determinism detected");
    }

    Ok(DeterminismReport {
        seed: config.seed,
        hashes,
        deterministic,
    })
}
