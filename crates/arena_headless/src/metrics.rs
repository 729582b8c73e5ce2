//! Metrics collection for run analysis.
//!
//! [`MetricsCollector`] watches the event streams of one run and produces a
//! [`RunMetrics`] record; [`BatchSummary`] aggregates many of them.

use std::collections::BTreeMap;
use std::time::Duration;

use arena_core::entity::EntityId;
use arena_core::events::{CombatEvent, CombatEventKind};
use arena_core::keystones::KeystoneId;
use arena_core::run::{RunEvent, RunSummary};
use serde::{Deserialize, Serialize};

/// Complete metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Run seed.
    pub seed: u32,
    /// Starting relic.
    pub relic: Option<String>,
    /// Whether every wave was cleared.
    pub victory: bool,
    /// Waves cleared.
    pub waves_cleared: u32,
    /// Waves in the run.
    pub max_waves: u32,
    /// Wave the player fell on, if they did.
    pub death_wave: Option<u32>,
    /// Final level.
    pub level: u32,
    /// Level-ups during the run.
    pub level_ups: u32,
    /// Experience earned.
    pub total_xp: u32,
    /// Currency earned.
    pub total_gold: u32,
    /// Combat ticks consumed.
    pub total_ticks: u64,
    /// Events emitted, combat and run.
    pub events_emitted: u64,
    /// Choices committed.
    pub choices_made: u32,
    /// Items taken.
    pub items: Vec<String>,
    /// Perks taken.
    pub perks: Vec<String>,
    /// Unlocked keystones.
    pub keystones: Vec<KeystoneId>,

    // === Combat ===
    /// Damage the player dealt, shields included.
    pub damage_dealt: u64,
    /// Damage the player took, shields included.
    pub damage_taken: u64,
    /// Damage absorbed by shields on the player.
    pub damage_shielded: u64,
    /// HP the player regained.
    pub healing: u64,
    /// Player crits.
    pub crits: u32,
    /// Player attacks evaded.
    pub misses: u32,
    /// Enemy attacks the player evaded.
    pub dodges: u32,
    /// Enemies killed.
    pub kills: u32,
    /// Status effects applied by the player.
    pub effects_applied: u32,
    /// Boss phase transitions.
    pub phase_changes: u32,
    /// Frenzy Loop procs.
    pub frenzy_procs: u32,
    /// Hemorrhage Engine procs.
    pub hemorrhage_procs: u32,
    /// Unbreakable procs.
    pub unbreakable_procs: u32,

    /// Digest of every event emitted.
    pub event_log_hash: u64,
    /// Wall-clock time spent simulating.
    pub elapsed_seconds: f64,
}

/// Builds [`RunMetrics`] from the events of one run.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: RunMetrics,
    current_wave: u32,
}

impl MetricsCollector {
    /// Start collecting for the run with `seed`.
    #[must_use]
    pub fn new(seed: u32, relic: Option<String>) -> Self {
        Self {
            metrics: RunMetrics {
                seed,
                relic,
                ..Default::default()
            },
            current_wave: 0,
        }
    }

    /// Observe a combat event.
    pub fn on_combat_event(&mut self, event: &CombatEvent) {
        let m = &mut self.metrics;
        match event.kind {
            CombatEventKind::Damage {
                source,
                target,
                amount,
                to_shield,
                ..
            } => {
                if target == EntityId::PLAYER {
                    m.damage_taken += u64::from(amount);
                    m.damage_shielded += u64::from(to_shield);
                } else if source == EntityId::PLAYER {
                    m.damage_dealt += u64::from(amount);
                }
            }
            CombatEventKind::Heal { target, amount, .. } if target == EntityId::PLAYER => {
                m.healing += u64::from(amount);
            }
            CombatEventKind::Crit { attacker, .. } if attacker == EntityId::PLAYER => {
                m.crits += 1;
            }
            CombatEventKind::Miss { attacker, .. } => {
                if attacker == EntityId::PLAYER {
                    m.misses += 1;
                } else {
                    m.dodges += 1;
                }
            }
            CombatEventKind::Death { entity, .. } if entity != EntityId::PLAYER => {
                m.kills += 1;
            }
            CombatEventKind::EffectApplied { source, .. } if source == EntityId::PLAYER => {
                m.effects_applied += 1;
            }
            CombatEventKind::PhaseChange { .. } => m.phase_changes += 1,
            CombatEventKind::KeystoneProc { keystone, .. } => match keystone {
                KeystoneId::FrenzyLoop => m.frenzy_procs += 1,
                KeystoneId::HemorrhageEngine => m.hemorrhage_procs += 1,
                KeystoneId::Unbreakable => m.unbreakable_procs += 1,
            },
            _ => {}
        }
    }

    /// Observe a run-level event.
    pub fn on_run_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::WaveStarted { wave, .. } => self.current_wave = *wave,
            RunEvent::LevelUp { .. } => self.metrics.level_ups += 1,
            RunEvent::ChoiceCommitted { .. } => self.metrics.choices_made += 1,
            RunEvent::RunEnded { victory: false, .. } => {
                self.metrics.death_wave = Some(self.current_wave);
            }
            _ => {}
        }
    }

    /// Finalize with the run's summary and wall-clock time.
    #[must_use]
    pub fn finalize(mut self, summary: &RunSummary, elapsed: Duration) -> RunMetrics {
        let m = &mut self.metrics;
        m.victory = summary.victory;
        m.waves_cleared = summary.waves_cleared;
        m.max_waves = summary.max_waves;
        m.level = summary.level;
        m.total_xp = summary.total_xp;
        m.total_gold = summary.total_gold;
        m.total_ticks = summary.total_ticks;
        m.events_emitted = summary.events_emitted;
        m.items.clone_from(&summary.items);
        m.perks.clone_from(&summary.perks);
        m.keystones.clone_from(&summary.keystones);
        m.event_log_hash = summary.event_log_hash;
        m.elapsed_seconds = elapsed.as_secs_f64();
        self.metrics
    }

    /// Metrics collected so far.
    #[must_use]
    pub fn current(&self) -> &RunMetrics {
        &self.metrics
    }
}

/// Summary statistics across many runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs played.
    pub total_runs: u32,
    /// Runs that cleared every wave.
    pub victories: u32,
    /// Victories over runs.
    pub victory_rate: f64,
    /// Mean waves cleared.
    pub avg_waves_cleared: f64,
    /// Mean final level.
    pub avg_level: f64,
    /// Mean combat ticks per run.
    pub avg_ticks: f64,
    /// Fewest ticks in a run.
    pub min_ticks: u64,
    /// Most ticks in a run.
    pub max_ticks: u64,
    /// Events emitted across every run.
    pub total_events: u64,
    /// Mean events per run.
    pub avg_events: f64,
    /// Mean player damage dealt per run.
    pub avg_damage_dealt: f64,
    /// Mean player damage taken per run.
    pub avg_damage_taken: f64,
    /// Losses keyed by the wave they happened on.
    pub deaths_by_wave: BTreeMap<u32, u32>,
    /// How often each item was taken.
    pub item_picks: BTreeMap<String, u32>,
    /// How often each perk was taken.
    pub perk_picks: BTreeMap<String, u32>,
}

impl BatchSummary {
    /// Calculate summary from a list of run metrics.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let count = runs.len() as f64;
        let mut summary = Self {
            total_runs: u32::try_from(runs.len()).unwrap_or(u32::MAX),
            min_ticks: u64::MAX,
            ..Default::default()
        };

        let mut waves = 0u64;
        let mut levels = 0u64;
        let mut ticks = 0u64;
        let mut dealt = 0u64;
        let mut taken = 0u64;

        for run in runs {
            if run.victory {
                summary.victories += 1;
            }
            if let Some(wave) = run.death_wave {
                *summary.deaths_by_wave.entry(wave).or_default() += 1;
            }
            for item in &run.items {
                *summary.item_picks.entry(item.clone()).or_default() += 1;
            }
            for perk in &run.perks {
                *summary.perk_picks.entry(perk.clone()).or_default() += 1;
            }

            waves += u64::from(run.waves_cleared);
            levels += u64::from(run.level);
            ticks += run.total_ticks;
            dealt += run.damage_dealt;
            taken += run.damage_taken;
            summary.total_events += run.events_emitted;
            summary.min_ticks = summary.min_ticks.min(run.total_ticks);
            summary.max_ticks = summary.max_ticks.max(run.total_ticks);
        }

        summary.victory_rate = f64::from(summary.victories) / count;
        summary.avg_waves_cleared = waves as f64 / count;
        summary.avg_level = levels as f64 / count;
        summary.avg_ticks = ticks as f64 / count;
        summary.avg_events = summary.total_events as f64 / count;
        summary.avg_damage_dealt = dealt as f64 / count;
        summary.avg_damage_taken = taken as f64 / count;
        summary
    }

    /// The wave that ended the most runs, lowest wave on ties.
    #[must_use]
    pub fn deadliest_wave(&self) -> Option<u32> {
        self.deaths_by_wave
            .iter()
            .max_by(|(wa, da), (wb, db)| da.cmp(db).then(wb.cmp(wa)))
            .map(|(wave, _)| *wave)
    }

    /// Check the victory rate lies within `[low, high]`.
    #[must_use]
    pub fn victory_rate_within(&self, low: f64, high: f64) -> bool {
        self.victory_rate >= low && self.victory_rate <= high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::combat::{DamageOrigin, DamageType};

    fn run(seed: u32, victory: bool, waves: u32, ticks: u64) -> RunMetrics {
        RunMetrics {
            seed,
            victory,
            waves_cleared: waves,
            max_waves: 5,
            death_wave: (!victory).then_some(waves + 1),
            level: 2,
            total_ticks: ticks,
            events_emitted: 100,
            items: vec!["iron_sword".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_collector_attributes_damage() {
        let mut collector = MetricsCollector::new(1, None);
        let damage = |source, target, amount, to_shield| {
            CombatEvent::new(
                1,
                CombatEventKind::Damage {
                    source,
                    target,
                    amount,
                    to_shield,
                    to_hp: amount - to_shield,
                    damage_type: DamageType::Physical,
                    origin: DamageOrigin::Attack,
                },
            )
        };

        collector.on_combat_event(&damage(EntityId::PLAYER, EntityId::enemy(0), 12, 0));
        collector.on_combat_event(&damage(EntityId::enemy(0), EntityId::PLAYER, 7, 3));
        collector.on_combat_event(&CombatEvent::new(
            2,
            CombatEventKind::Miss {
                attacker: EntityId::enemy(0),
                target: EntityId::PLAYER,
            },
        ));

        let m = collector.current();
        assert_eq!(m.damage_dealt, 12);
        assert_eq!(m.damage_taken, 7);
        assert_eq!(m.damage_shielded, 3);
        assert_eq!(m.dodges, 1);
        assert_eq!(m.misses, 0);
    }

    #[test]
    fn test_collector_records_death_wave() {
        let mut collector = MetricsCollector::new(1, None);
        collector.on_run_event(&RunEvent::WaveStarted {
            wave: 3,
            enemies: 2,
            boss: false,
        });
        collector.on_run_event(&RunEvent::RunEnded {
            victory: false,
            waves_cleared: 2,
        });
        assert_eq!(collector.current().death_wave, Some(3));
    }

    #[test]
    fn test_summary_from_runs() {
        let runs = vec![
            run(1, true, 5, 1_000),
            run(2, false, 2, 400),
            run(3, false, 2, 600),
            run(4, false, 4, 800),
        ];
        let summary = BatchSummary::from_runs(&runs);

        assert_eq!(summary.total_runs, 4);
        assert_eq!(summary.victories, 1);
        assert!((summary.victory_rate - 0.25).abs() < 1e-9);
        assert!((summary.avg_waves_cleared - 3.25).abs() < 1e-9);
        assert!((summary.avg_ticks - 700.0).abs() < 1e-9);
        assert_eq!(summary.min_ticks, 400);
        assert_eq!(summary.max_ticks, 1_000);
        assert_eq!(summary.total_events, 400);
        assert_eq!(summary.deaths_by_wave.get(&3), Some(&2));
        assert_eq!(summary.deadliest_wave(), Some(3));
        assert_eq!(summary.item_picks.get("iron_sword"), Some(&4));
        assert!(summary.victory_rate_within(0.2, 0.3));
    }

    #[test]
    fn test_summary_empty() {
        let summary = BatchSummary::from_runs(&[]);
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.deadliest_wave(), None);
    }
}
