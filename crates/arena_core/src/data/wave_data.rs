//! Wave composition and rewards.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};

/// A group of identical enemies in a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveSpawn {
    /// Enemy template id.
    pub template: String,
    /// Number spawned.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Spawn as elites.
    #[serde(default)]
    pub elite: bool,
    /// Affixes drawn per elite.
    #[serde(default)]
    pub affix_count: u32,
}

const fn default_count() -> u32 {
    1
}

/// Rewards for clearing a wave, before per-kill rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveRewards {
    /// Experience.
    pub xp: u32,
    /// Currency.
    pub gold: u32,
    /// Chance that an item choice is offered without pity.
    #[serde(default, with = "fixed_decimal")]
    pub item_drop_chance: Fixed,
}

/// One wave of a run.
///
/// # Example RON
///
/// ```ron
/// WaveData(
///     number: 3,
///     name: "Ambush",
///     enemies: [WaveSpawn(template: "bandit", count: 2, elite: true, affix_count: 1)],
///     rewards: WaveRewards(xp: 60, gold: 25, item_drop_chance: 0.35),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveData {
    /// Wave number, starting at 1.
    pub number: u32,
    /// Display name.
    pub name: String,
    /// Regular spawns, in spawn order.
    #[serde(default)]
    pub enemies: Vec<WaveSpawn>,
    /// Boss spawned after the regular enemies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss: Option<String>,
    /// Clear rewards.
    pub rewards: WaveRewards,
}

impl WaveData {
    /// Whether this wave has a boss.
    #[must_use]
    pub const fn is_boss_wave(&self) -> bool {
        self.boss.is_some()
    }

    /// Number of enemies this wave spawns.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.enemies.iter().map(|spawn| spawn.count).sum::<u32>() + u32::from(self.is_boss_wave())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_count() {
        let wave = WaveData {
            number: 5,
            name: "Finale".into(),
            enemies: vec![WaveSpawn {
                template: "slime".into(),
                count: 3,
                elite: false,
                affix_count: 0,
            }],
            boss: Some("warden".into()),
            rewards: WaveRewards {
                xp: 100,
                gold: 50,
                item_drop_chance: Fixed::ZERO,
            },
        };
        assert!(wave.is_boss_wave());
        assert_eq!(wave.enemy_count(), 4);
    }
}
