//! Simulation tuning knobs.

use serde::{Deserialize, Serialize};

use crate::math::{floor_u32, seconds_to_ticks, Fixed};

/// Tuning for combat and run progression.
///
/// Every field has a default, so a RON file only needs the overrides:
///
/// ```ron
/// SimConfig(
///     max_ticks_per_wave: 3600,
///     item_pity_waves: 3,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Logical ticks per simulated second.
    pub ticks_per_second: u32,
    /// Ticks before a wave times out as a loss.
    pub max_ticks_per_wave: u64,
    /// Bleed fires on ticks divisible by this.
    pub bleed_interval_ticks: u32,
    /// Poison fires on ticks divisible by this.
    pub poison_interval_ticks: u32,
    /// An item choice is forced after this many waves without one.
    pub item_pity_waves: u32,
    /// Experience needed to reach level 2.
    pub xp_base: u32,
    /// Additional experience needed per level after that.
    pub xp_per_level: u32,
    /// Percentage of max HP restored on level up.
    pub level_up_heal_percent: u32,
    /// Skill points granted per level.
    pub skill_points_per_level: u32,
    /// Skills offered per skill-allocation choice.
    pub skill_options: usize,
    /// Perks offered per perk choice.
    pub perk_options: usize,
    /// Items offered per item choice.
    pub item_options: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            max_ticks_per_wave: 7200,
            bleed_interval_ticks: 30,
            poison_interval_ticks: 30,
            item_pity_waves: 2,
            xp_base: 100,
            xp_per_level: 50,
            level_up_heal_percent: 20,
            skill_points_per_level: 1,
            skill_options: 3,
            perk_options: 3,
            item_options: 3,
        }
    }
}

impl SimConfig {
    /// Experience needed to advance from `level` to `level + 1`.
    #[must_use]
    pub const fn xp_to_next_level(&self, level: u32) -> u32 {
        self.xp_base
            .saturating_add(self.xp_per_level.saturating_mul(level.saturating_sub(1)))
    }

    /// HP restored on level up for a given max HP.
    #[must_use]
    pub fn level_up_heal_amount(&self, max_hp: Fixed) -> u32 {
        let percent = Fixed::from_num(self.level_up_heal_percent);
        floor_u32(max_hp.saturating_mul(percent) / Fixed::from_num(100))
    }

    /// Frenzy Loop cooldown reduction: 0.2 seconds.
    #[must_use]
    pub const fn frenzy_reduction_ticks(&self) -> u32 {
        seconds_to_ticks(1, 5, self.ticks_per_second)
    }

    /// Frenzy Loop internal cooldown: 0.5 seconds.
    #[must_use]
    pub const fn frenzy_cooldown_ticks(&self) -> u32 {
        seconds_to_ticks(1, 2, self.ticks_per_second)
    }

    /// Check the configuration for values the engine cannot run with.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.ticks_per_second == 0 {
            errors.push("ticks_per_second must be positive".to_string());
        }
        if self.max_ticks_per_wave == 0 {
            errors.push("max_ticks_per_wave must be positive".to_string());
        }
        if self.bleed_interval_ticks == 0 || self.poison_interval_ticks == 0 {
            errors.push("damage-over-time intervals must be positive".to_string());
        }
        if self.item_pity_waves == 0 {
            errors.push("item_pity_waves must be at least 1".to_string());
        }
        if self.xp_base == 0 {
            errors.push("xp_base must be positive".to_string());
        }
        if self.level_up_heal_percent > 100 {
            errors.push("level_up_heal_percent must be at most 100".to_string());
        }
        errors
    }
}
