//! Replay system for recording and verifying runs.
//!
//! A run is fully determined by its seed, its starting relic and the
//! choices committed between waves. Replays store exactly that, plus the
//! final event-log hash so a re-run can be checked against the original.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::SimConfig;
use crate::data::ContentLibrary;
use crate::error::{Result, SimError};
use crate::run::{ChoiceRecord, RunManager, RunPhase, RunSummary};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReplay {
    /// Replay format version.
    pub version: u32,
    /// Seed the run started from.
    pub seed: u32,
    /// Starting relic.
    pub relic: Option<String>,
    /// Committed choices in order.
    pub choices: Vec<ChoiceRecord>,
    /// Waves cleared.
    pub waves_cleared: u32,
    /// Combat ticks simulated.
    pub total_ticks: u64,
    /// Final event-log hash for verification.
    pub final_hash: u64,
}

impl RunReplay {
    /// Create an empty replay for a run that has not started yet.
    #[must_use]
    pub fn new(seed: u32, relic: Option<String>) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed,
            relic,
            choices: Vec::new(),
            waves_cleared: 0,
            total_ticks: 0,
            final_hash: 0,
        }
    }

    /// Capture a run's choices and current hash.
    #[must_use]
    pub fn from_run(run: &RunManager) -> Self {
        let mut replay = Self::new(run.state().seed, run.state().relic.clone());
        replay.choices = run.choice_log().to_vec();
        replay.finalize(&run.summary());
        replay
    }

    /// Record a committed choice.
    pub fn record_choice(&mut self, record: ChoiceRecord) {
        self.choices.push(record);
    }

    /// Finalize the replay with end-of-run results.
    pub fn finalize(&mut self, summary: &RunSummary) {
        self.waves_cleared = summary.waves_cleared;
        self.total_ticks = summary.total_ticks;
        self.final_hash = summary.event_log_hash;
    }

    /// Get the total number of recorded choices.
    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    /// Re-drive a fresh run from the recorded inputs.
    ///
    /// # Errors
    /// Returns an error if the run cannot be constructed.
    pub fn play(&self, content: Arc<ContentLibrary>, config: SimConfig) -> Result<RunManager> {
        let mut run = RunManager::new(content, config, self.seed, self.relic.as_deref())?;
        let mut pending = self.choices.iter().peekable();

        loop {
            match run.phase() {
                RunPhase::Intermission => {
                    let wave = run.state().current_wave;
                    if let Some(record) = pending.next_if(|record| record.wave == wave) {
                        run.choose(record.choice_index, record.option_index);
                    }
                    run.start_wave()?;
                }
                RunPhase::Combat => {
                    run.run_wave();
                }
                RunPhase::GameOver | RunPhase::Victory => return Ok(run),
            }
        }
    }

    /// Verify a re-run produces the recorded final hash.
    ///
    /// # Errors
    /// Returns [`SimError::ReplayDiverged`] on a hash mismatch, or any
    /// construction error from the re-run.
    pub fn verify(&self, content: Arc<ContentLibrary>, config: SimConfig) -> Result<RunSummary> {
        let summary = self.play(content, config)?.summary();
        if summary.event_log_hash != self.final_hash {
            return Err(SimError::ReplayDiverged {
                expected: self.final_hash,
                actual: summary.event_log_hash,
            });
        }
        tracing::debug!(seed = self.seed, hash = self.final_hash, "Replay verified");
        Ok(summary)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or the
    /// version does not match.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| SimError::Serialization(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| SimError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(SimError::Serialization(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EnemyData, PerkData, Rarity, StatBlock, WaveData, WaveRewards, WaveSpawn};
    use crate::math::Fixed;
    use crate::stats::StatModifiers;

    fn content() -> Arc<ContentLibrary> {
        let stats = StatBlock {
            max_hp: Fixed::from_num(30),
            attack: Fixed::from_num(6),
            armor: Fixed::from_num(2),
            resistance: Fixed::ZERO,
            attack_speed: Fixed::ONE,
            crit_chance: Fixed::from_num(0.1),
            crit_multiplier: Fixed::from_num(1.5),
            power: Fixed::ZERO,
            cdr: Fixed::ZERO,
            lifesteal: Fixed::ZERO,
            evasion: Fixed::from_num(0.05),
        };
        let waves = (1..=3)
            .map(|number| WaveData {
                number,
                name: format!("Wave {number}"),
                enemies: vec![WaveSpawn {
                    template: "wolf".into(),
                    count: number,
                    elite: false,
                    affix_count: 0,
                }],
                boss: None,
                rewards: WaveRewards {
                    xp: 40,
                    gold: 5,
                    item_drop_chance: Fixed::ZERO,
                },
            })
            .collect();
        let perks = ["tough", "sharp", "quick"]
            .iter()
            .map(|id| PerkData {
                id: (*id).to_string(),
                name: (*id).to_string(),
                description: String::new(),
                rarity: Rarity::Common,
                modifiers: StatModifiers {
                    attack: Fixed::ONE,
                    ..StatModifiers::default()
                },
                grants: vec![],
                tags: vec![],
            })
            .collect();

        Arc::new(ContentLibrary {
            perks,
            enemies: vec![EnemyData {
                id: "wolf".into(),
                name: "Wolf".into(),
                stats,
                xp_reward: 3,
                gold_reward: 1,
                grants: vec![],
                tags: vec![],
            }],
            waves,
            ..ContentLibrary::default()
        })
    }

    fn recorded(seed: u32) -> RunReplay {
        let mut run = RunManager::new(content(), SimConfig::default(), seed, None).unwrap();
        run.play_to_end(|state| Some((0, state.current_wave as usize % 2)))
            .unwrap();
        RunReplay::from_run(&run)
    }

    #[test]
    fn test_replay_captures_choices() {
        let replay = recorded(11);
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.seed, 11);
        assert!(replay.choice_count() > 0);
        assert_ne!(replay.final_hash, 0);
    }

    #[test]
    fn test_replay_verify() {
        let replay = recorded(11);
        let summary = replay.verify(content(), SimConfig::default()).unwrap();
        assert_eq!(summary.waves_cleared, replay.waves_cleared);
        assert_eq!(summary.total_ticks, replay.total_ticks);
    }

    #[test]
    fn test_replay_detects_divergence() {
        let mut replay = recorded(11);
        replay.final_hash ^= 1;
        assert!(matches!(
            replay.verify(content(), SimConfig::default()),
            Err(SimError::ReplayDiverged { .. })
        ));
    }

    #[test]
    fn test_replay_save_load() {
        let replay = recorded(5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.replay");

        replay.save(&path).unwrap();
        let loaded = RunReplay::load(&path).unwrap();
        assert_eq!(loaded, replay);
    }

    #[test]
    fn test_replay_version_mismatch() {
        let mut replay = recorded(5);
        replay.version = REPLAY_VERSION + 1;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.replay");

        replay.save(&path).unwrap();
        assert!(matches!(RunReplay::load(&path), Err(SimError::Serialization(_))));
    }
}
