//! Drive one run from seed to summary.
//!
//! The runner owns nothing global: every run builds its own
//! [`RunManager`] over a shared read-only [`ContentLibrary`], so runs are
//! free to execute on any thread.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use arena_core::error::Result;
use arena_core::replay::RunReplay;
use arena_core::run::{RunManager, RunPhase};

use crate::metrics::{MetricsCollector, RunMetrics};
use crate::policy::{ChoicePolicy, PolicyKind};

/// Inputs of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Run seed.
    pub seed: u32,
    /// Starting relic id.
    pub relic: Option<String>,
    /// Choice policy.
    pub policy: PolicyKind,
}

impl RunConfig {
    /// A run with `seed`, no relic and the first-option policy.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            relic: None,
            policy: PolicyKind::First,
        }
    }

    /// Set the starting relic.
    #[must_use]
    pub fn with_relic(mut self, relic: Option<String>) -> Self {
        self.relic = relic;
        self
    }

    /// Set the choice policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Collected metrics.
    pub metrics: RunMetrics,
    /// Replay that reproduces the run.
    pub replay: RunReplay,
}

/// Play a run to completion, collecting metrics and a replay.
///
/// # Errors
/// Returns an error if the run cannot be constructed (unknown relic,
/// unusable config) or a wave references missing content.
pub fn run_single(
    content: &Arc<ContentLibrary>,
    sim_config: &SimConfig,
    config: &RunConfig,
) -> Result<RunOutput> {
    let started = Instant::now();
    let mut run = RunManager::new(
        Arc::clone(content),
        sim_config.clone(),
        config.seed,
        config.relic.as_deref(),
    )?;
    run.mark_started(unix_seconds());

    let mut policy = ChoicePolicy::new(config.policy, config.seed);
    let mut collector = MetricsCollector::new(config.seed, config.relic.clone());

    loop {
        match run.phase() {
            RunPhase::Intermission => {
                if let Some((choice, option)) = policy.pick(run.state()) {
                    if run.choose(choice, option) {
                        if let Some(event) = run.run_events().last() {
                            collector.on_run_event(event);
                        }
                    }
                }
                let opening = run.start_wave()?;
                for event in &opening.combat {
                    collector.on_combat_event(event);
                }
                for event in &opening.run {
                    collector.on_run_event(event);
                }
            }
            RunPhase::Combat => {
                let outcome = run.tick();
                for event in &outcome.combat {
                    collector.on_combat_event(event);
                }
                for event in &outcome.run {
                    collector.on_run_event(event);
                }
            }
            RunPhase::GameOver | RunPhase::Victory => break,
        }
    }

    run.mark_ended(unix_seconds());
    let summary = run.summary();
    let metrics = collector.finalize(&summary, started.elapsed());
    let replay = RunReplay::from_run(&run);

    tracing::debug!(
        seed = config.seed,
        victory = metrics.victory,
        waves_cleared = metrics.waves_cleared,
        ticks = metrics.total_ticks,
        "Run finished"
    );

    Ok(RunOutput { metrics, replay })
}

/// Seconds since the Unix epoch, or 0 if the clock is before it.
fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::effects::EffectGrant;
    use arena_test_utils::fixtures::content_library;

    #[test]
    fn test_run_single_completes() {
        let content = content_library();
        let output = run_single(&content, &SimConfig::default(), &RunConfig::new(7)).unwrap();
        let m = &output.metrics;

        assert!(m.waves_cleared <= m.max_waves);
        assert_eq!(m.victory, m.waves_cleared == m.max_waves);
        assert_eq!(m.death_wave.is_some(), !m.victory);
        assert!(m.events_emitted > 0);
        assert!(m.total_ticks > 0);
        assert_eq!(output.replay.final_hash, m.event_log_hash);
    }

    #[test]
    fn test_run_single_is_repeatable() {
        let content = content_library();
        let config = RunConfig::new(99)
            .with_relic(Some("stone_idol".into()))
            .with_policy(PolicyKind::Seeded);

        let a = run_single(&content, &SimConfig::default(), &config).unwrap();
        let b = run_single(&content, &SimConfig::default(), &config).unwrap();
        assert_eq!(a.metrics.event_log_hash, b.metrics.event_log_hash);
        assert_eq!(a.metrics.items, b.metrics.items);
        assert_eq!(a.replay.choices, b.replay.choices);
    }

    #[test]
    fn test_replay_matches_run() {
        let content = content_library();
        let config = RunConfig::new(12).with_policy(PolicyKind::Seeded);
        let output = run_single(&content, &SimConfig::default(), &config).unwrap();

        let summary = output
            .replay
            .verify(Arc::clone(&content), SimConfig::default())
            .unwrap();
        assert_eq!(summary.event_log_hash, output.metrics.event_log_hash);
        assert_eq!(summary.waves_cleared, output.metrics.waves_cleared);
    }

    #[test]
    fn test_opening_shields_reach_metrics() {
        let mut library = (*content_library()).clone();
        for relic in &mut library.relics {
            relic.grants.push(EffectGrant::OpeningShield {
                amount: 40,
                duration_ticks: 600,
            });
        }
        let config = RunConfig::new(5).with_relic(Some("stone_idol".into()));
        let output = run_single(&Arc::new(library), &SimConfig::default(), &config).unwrap();
        let m = &output.metrics;

        // One player shield per wave started.
        let waves_started = m.waves_cleared + u32::from(!m.victory);
        assert!(m.effects_applied >= waves_started);
    }

    #[test]
    fn test_unknown_relic_is_an_error() {
        let content = content_library();
        let config = RunConfig::new(1).with_relic(Some("nonexistent".into()));
        assert!(run_single(&content, &SimConfig::default(), &config).is_err());
    }
}
