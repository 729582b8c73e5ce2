//! Enemy, boss and affix definitions.

use serde::{Deserialize, Serialize};

use crate::effects::EffectGrant;
use crate::math::{fixed_decimal, Fixed};
use crate::stats::{StatModifiers, Stats};

/// Hand-authored base stats. Current HP starts at max HP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    /// Maximum hit points.
    #[serde(with = "fixed_decimal")]
    pub max_hp: Fixed,
    /// Attack damage.
    #[serde(with = "fixed_decimal")]
    pub attack: Fixed,
    /// Armor.
    #[serde(default, with = "fixed_decimal")]
    pub armor: Fixed,
    /// Resistance.
    #[serde(default, with = "fixed_decimal")]
    pub resistance: Fixed,
    /// Attacks per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// Crit chance.
    #[serde(default, with = "fixed_decimal")]
    pub crit_chance: Fixed,
    /// Crit multiplier.
    #[serde(default = "default_crit_multiplier", with = "fixed_decimal")]
    pub crit_multiplier: Fixed,
    /// Power.
    #[serde(default, with = "fixed_decimal")]
    pub power: Fixed,
    /// Cooldown reduction.
    #[serde(default, with = "fixed_decimal")]
    pub cdr: Fixed,
    /// Lifesteal.
    #[serde(default, with = "fixed_decimal")]
    pub lifesteal: Fixed,
    /// Evasion.
    #[serde(default, with = "fixed_decimal")]
    pub evasion: Fixed,
}

fn default_crit_multiplier() -> Fixed {
    Fixed::from_num(3) / Fixed::from_num(2)
}

impl StatBlock {
    /// Clamped stats at full HP.
    #[must_use]
    pub fn to_stats(&self) -> Stats {
        Stats {
            hp: self.max_hp,
            max_hp: self.max_hp,
            attack: self.attack,
            armor: self.armor,
            resistance: self.resistance,
            attack_speed: self.attack_speed,
            crit_chance: self.crit_chance,
            crit_multiplier: self.crit_multiplier,
            power: self.power,
            cdr: self.cdr,
            lifesteal: self.lifesteal,
            evasion: self.evasion,
        }
        .clamped()
    }

    /// Problems that would make the block unusable.
    #[must_use]
    pub fn validate(&self, owner: &str) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_hp <= Fixed::ZERO {
            errors.push(format!("'{owner}' has non-positive max_hp"));
        }
        if self.attack_speed <= Fixed::ZERO {
            errors.push(format!("'{owner}' has non-positive attack_speed"));
        }
        errors
    }
}

/// Regular enemy template.
///
/// # Example RON
///
/// ```ron
/// EnemyData(
///     id: "slime",
///     name: "Slime",
///     stats: StatBlock(max_hp: 40, attack: 6, attack_speed: 0.8),
///     xp_reward: 10,
///     gold_reward: 4,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base stats.
    pub stats: StatBlock,
    /// Experience granted on death.
    #[serde(default)]
    pub xp_reward: u32,
    /// Currency granted on death.
    #[serde(default)]
    pub gold_reward: u32,
    /// On-hit and opening-shield grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One boss phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BossPhase {
    /// Phase number entered, starting at 2.
    pub phase: u32,
    /// Enter when HP fraction drops to or below this.
    #[serde(with = "fixed_decimal")]
    pub hp_threshold: Fixed,
    /// Modifiers applied to current stats on entry.
    #[serde(default)]
    pub modifiers: StatModifiers,
}

/// Boss template with phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base stats.
    pub stats: StatBlock,
    /// Experience granted on death.
    #[serde(default)]
    pub xp_reward: u32,
    /// Currency granted on death.
    #[serde(default)]
    pub gold_reward: u32,
    /// On-hit and opening-shield grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
    /// Phase transitions.
    #[serde(default)]
    pub phases: Vec<BossPhase>,
}

impl BossData {
    /// Problems with the phase list.
    #[must_use]
    pub fn validate_phases(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = Vec::new();
        for phase in &self.phases {
            if phase.phase < 2 {
                errors.push(format!("Boss '{}' has phase {} below 2", self.id, phase.phase));
            }
            if seen.contains(&phase.phase) {
                errors.push(format!("Boss '{}' repeats phase {}", self.id, phase.phase));
            }
            seen.push(phase.phase);
            if phase.hp_threshold < Fixed::ZERO || phase.hp_threshold > Fixed::ONE {
                errors.push(format!(
                    "Boss '{}' phase {} threshold outside [0, 1]",
                    self.id, phase.phase
                ));
            }
        }
        errors
    }
}

/// Elite affix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffixData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stat modifiers.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Effect grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
}
