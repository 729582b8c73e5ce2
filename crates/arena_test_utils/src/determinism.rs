//! Determinism testing utilities.
//!
//! Provides a harness for verifying that combats and runs produce
//! identical event logs given identical inputs.
//!
//! # Testing Strategy
//!
//! Every combat must replay exactly from its seed. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities are stored in spawn order and skill allocations in a `BTreeMap`.
//!
//! - **System randomness**: All "random" behavior draws from a
//!   [`arena_core::rng::SeededRng`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual operations (mitigation, stacking, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full combats and runs are reproducible
//! 4. **Parallel tests**: Running N runs on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::thread;

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use arena_core::run::RunManager;
use arena_core::simulation::CombatSession;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
        }
    }

    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a setup-and-drive closure multiple times and compare hashes.
///
/// # Example
///
/// ```ignore
/// use arena_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(5, || {
///     let mut session = fixtures::duel_session(7);
///     session.run_to_completion();
///     session.state().event_log_hash()
/// });
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<F>(runs: usize, run_once: F) -> DeterminismResult
where
    F: Fn() -> u64,
{
    DeterminismResult::from_hashes((0..runs).map(|_| run_once()).collect())
}

/// Run a combat to completion `runs` times and compare event-log hashes.
pub fn verify_combat_determinism<F>(runs: usize, setup: F) -> DeterminismResult
where
    F: Fn() -> CombatSession,
{
    verify_determinism(runs, || {
        let mut session = setup();
        session.run_to_completion();
        session.state().event_log_hash()
    })
}

/// Play a full run `runs` times with the first-option policy and compare
/// event-log hashes.
///
/// # Panics
///
/// Panics if the run cannot be constructed.
pub fn verify_run_determinism(
    runs: usize,
    content: &Arc<ContentLibrary>,
    config: &SimConfig,
    seed: u32,
) -> DeterminismResult {
    verify_determinism(runs, || play_run(content, config, seed))
}

/// Play the same run on `threads` scoped threads and compare hashes.
///
/// Catches non-determinism that only manifests under thread scheduling.
///
/// # Panics
///
/// Panics if a thread panics or a run cannot be constructed.
pub fn run_parallel_runs(
    content: &Arc<ContentLibrary>,
    config: &SimConfig,
    seed: u32,
    threads: usize,
) -> DeterminismResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| play_run(content, config, seed)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("determinism worker panicked"))
            .collect()
    });

    DeterminismResult::from_hashes(hashes)
}

fn play_run(content: &Arc<ContentLibrary>, config: &SimConfig, seed: u32) -> u64 {
    let mut run = RunManager::new(Arc::clone(content), config.clone(), seed, None)
        .expect("run inputs are valid");
    run.play_to_end(|_| Some((0, 0)))
        .expect("waves are constructible")
        .event_log_hash
}

/// Compare two combats tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if both combats stay identical, `Some(tick)` for the first tick
/// whose state hash differs.
pub fn find_first_divergence<F>(setup: F, max_ticks: u64) -> Option<u64>
where
    F: Fn() -> CombatSession,
{
    let mut first = setup();
    let mut second = setup();

    if first.state().state_hash() != second.state().state_hash() {
        return Some(0);
    }

    for tick in 1..=max_ticks {
        first.tick();
        second.tick();

        if first.state().state_hash() != second.state().state_hash() {
            tracing::debug!(tick, "Combats diverged");
            return Some(tick);
        }
        if first.state().is_complete() && second.state().is_complete() {
            break;
        }
    }

    None
}

/// Verify that a bincode round trip of a run state preserves it exactly.
pub fn verify_serialization_determinism(run: &RunManager) -> bool {
    let Ok(bytes) = run.state().to_bytes() else {
        return false;
    };
    let Ok(restored) = arena_core::run::RunState::from_bytes(&bytes) else {
        return false;
    };
    restored.state_hash() == run.state().state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
