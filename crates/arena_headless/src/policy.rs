//! Choice policies for unattended runs.
//!
//! A policy answers the intermission question "which option of which
//! pending choice?". Policies never touch the run's own RNG: the seeded
//! policy draws from an independent stream, so swapping policies changes
//! the choices but never the combat randomness behind them.

use arena_core::rng::SeededRng;
use arena_core::run::RunState;
use serde::{Deserialize, Serialize};

/// Mixed into the run seed to derive the policy stream.
const POLICY_SEED_SALT: u32 = 0x5eed_c40e;

/// Policy selector, as named on the command line and in batch configs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Always option 0 of choice 0.
    #[default]
    First,
    /// Uniform picks from an independent seeded stream.
    Seeded,
}

/// A policy instance for one run.
#[derive(Debug, Clone)]
pub enum ChoicePolicy {
    /// Always option 0 of choice 0.
    First,
    /// Uniform picks from its own RNG.
    Seeded(SeededRng),
}

impl ChoicePolicy {
    /// Build the policy for a run with `seed`.
    #[must_use]
    pub fn new(kind: PolicyKind, seed: u32) -> Self {
        match kind {
            PolicyKind::First => Self::First,
            PolicyKind::Seeded => Self::Seeded(SeededRng::new(seed ^ POLICY_SEED_SALT)),
        }
    }

    /// Pick `(choice, option)` from the pending choices, or `None` when
    /// there is nothing to pick.
    pub fn pick(&mut self, state: &RunState) -> Option<(usize, usize)> {
        let choices = &state.pending_choices;
        if choices.is_empty() {
            return None;
        }

        match self {
            Self::First => (!choices[0].options.is_empty()).then_some((0, 0)),
            Self::Seeded(rng) => {
                let choice = index(rng, choices.len());
                let options = choices[choice].options.len();
                if options == 0 {
                    return None;
                }
                Some((choice, index(rng, options)))
            }
        }
    }
}

fn index(rng: &mut SeededRng, len: usize) -> usize {
    let max = i64::try_from(len).unwrap_or(i64::MAX) - 1;
    usize::try_from(rng.next_int(0, max)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::config::SimConfig;
    use arena_core::run::RunManager;
    use arena_test_utils::fixtures::content_library;

    fn intermission_with_choices() -> RunManager {
        let mut run = RunManager::new(content_library(), SimConfig::default(), 21, None).unwrap();
        run.start_wave().unwrap();
        run.run_wave();
        run
    }

    #[test]
    fn test_first_policy() {
        let run = intermission_with_choices();
        let mut policy = ChoicePolicy::new(PolicyKind::First, 21);
        if run.choices().is_empty() {
            assert_eq!(policy.pick(run.state()), None);
        } else {
            assert_eq!(policy.pick(run.state()), Some((0, 0)));
        }
    }

    #[test]
    fn test_seeded_policy_in_range_and_repeatable() {
        let run = intermission_with_choices();
        let mut a = ChoicePolicy::new(PolicyKind::Seeded, 5);
        let mut b = ChoicePolicy::new(PolicyKind::Seeded, 5);

        for _ in 0..20 {
            let pick = a.pick(run.state());
            assert_eq!(pick, b.pick(run.state()));
            if let Some((choice, option)) = pick {
                assert!(choice < run.choices().len());
                assert!(option < run.choices()[choice].options.len());
            }
        }
    }

    #[test]
    fn test_no_choices_no_pick() {
        let run = RunManager::new(content_library(), SimConfig::default(), 3, None).unwrap();
        assert!(run.choices().is_empty());
        assert_eq!(ChoicePolicy::new(PolicyKind::Seeded, 3).pick(run.state()), None);
    }
}
