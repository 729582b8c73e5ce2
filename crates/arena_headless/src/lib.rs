//! Headless run driver for batch simulation and CI verification.
//!
//! This crate wraps `arena_core` with everything that touches the outside
//! world:
//!
//! - **Content loading**: RON content files and `SimConfig` overrides
//! - **Batch runs**: many seeds in parallel, aggregated into a JSON report
//! - **Determinism checks**: the same seed replayed and hash-compared
//! - **Replays**: recorded runs re-driven and verified
//!
//! # Output
//!
//! - **stdout**: machine-readable JSON reports
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # One run, JSON counters on stdout
//! cargo run -p arena_headless -- run --seed 42
//!
//! # 1000 seeds with the seeded choice policy
//! cargo run -p arena_headless -- batch --seed 0 --count 1000 --policy seeded
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --seed 42 --runs 8
//! ```

pub mod batch;
pub mod content_loader;
pub mod metrics;
pub mod policy;
pub mod runner;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, DeterminismReport};
pub use content_loader::{
    default_content_dir, load_content, load_content_dir, load_sim_config, ContentLoadError,
    ContentReport,
};
pub use metrics::{BatchSummary, MetricsCollector, RunMetrics};
pub use policy::{ChoicePolicy, PolicyKind};
pub use runner::{run_single, RunConfig, RunOutput};
