//! Keystones: conditional abilities the player unlocks through skills.
//!
//! The tick engine consults [`KeystoneState`] at fixed points in a tick.
//! A keystone that is not unlocked, or whose condition is not met, does
//! nothing and emits nothing.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::entity::{Enemy, EntityId, Player};
use crate::events::{CombatEvent, CombatEventKind};
use crate::math::{fixed_serde, ratio, Fixed};

/// Bleed stacks consumed per Hemorrhage Engine free attack.
pub const HEMORRHAGE_THRESHOLD: u32 = 5;

/// Unbreakable triggers at or below this HP percentage.
const UNBREAKABLE_HP_PERCENT: i32 = 30;

/// Unbreakable armor bonus as a percentage of base armor.
const UNBREAKABLE_ARMOR_PERCENT: i32 = 20;

/// Keystone identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeystoneId {
    /// Crits shorten the attack cooldown.
    FrenzyLoop,
    /// Enemy bleed stacks convert into free attacks.
    HemorrhageEngine,
    /// Low HP grants armor and lifesteal once per combat.
    Unbreakable,
}

/// What a keystone did when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeystoneEffect {
    /// Attack cooldown reduced.
    CooldownsReduced {
        /// Ticks removed.
        ticks: u32,
    },
    /// A free attack was granted.
    FreeAttack {
        /// Target of the free attack.
        target: EntityId,
        /// Bleed stacks consumed.
        stacks_consumed: u32,
    },
    /// Defensive bonus applied for the rest of the combat.
    Fortified {
        /// Armor added.
        #[serde(with = "fixed_serde")]
        armor_bonus: Fixed,
        /// Lifesteal added.
        #[serde(with = "fixed_serde")]
        lifesteal_bonus: Fixed,
    },
}

/// Per-combat keystone bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeystoneState {
    /// Ticks until Frenzy Loop can fire again.
    pub frenzy_cooldown: u32,
    /// Bleed stacks counted toward the next Hemorrhage Engine attack.
    pub bleed_accumulator: u32,
    /// Whether Unbreakable already fired this combat.
    pub unbreakable_used: bool,
}

impl KeystoneState {
    /// Fresh state for a new combat.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frenzy Loop: called after a player crit.
    ///
    /// Reduces the player's attack cooldown and arms the internal cooldown.
    pub fn frenzy_loop(
        &mut self,
        player: &mut Player,
        tick: u64,
        config: &SimConfig,
    ) -> Option<CombatEvent> {
        if !player.has_keystone(KeystoneId::FrenzyLoop)
            || !player.entity.is_alive()
            || self.frenzy_cooldown > 0
        {
            return None;
        }

        let ticks = config.frenzy_reduction_ticks();
        player.entity.attack_cooldown = player.entity.attack_cooldown.saturating_sub(ticks);
        self.frenzy_cooldown = config.frenzy_cooldown_ticks();

        Some(CombatEvent::new(
            tick,
            CombatEventKind::KeystoneProc {
                entity: player.entity.id,
                keystone: KeystoneId::FrenzyLoop,
                effect: KeystoneEffect::CooldownsReduced { ticks },
            },
        ))
    }

    /// Hemorrhage Engine: add this tick's bleed stacks on living enemies
    /// and return how many free attacks they pay for.
    pub fn hemorrhage_engine(&mut self, player: &Player, enemies: &[Enemy]) -> u32 {
        if !player.has_keystone(KeystoneId::HemorrhageEngine) {
            return 0;
        }

        let stacks: u32 = enemies
            .iter()
            .filter(|enemy| enemy.entity.is_alive())
            .map(|enemy| enemy.entity.effects.bleed_stacks())
            .sum();
        self.bleed_accumulator = self.bleed_accumulator.saturating_add(stacks);

        let procs = self.bleed_accumulator / HEMORRHAGE_THRESHOLD;
        self.bleed_accumulator %= HEMORRHAGE_THRESHOLD;
        procs
    }

    /// Unbreakable: once per combat, when the player drops to 30% HP or
    /// lower, add 20% of base armor and 0.15 lifesteal.
    pub fn unbreakable(&mut self, player: &mut Player, tick: u64) -> Option<CombatEvent> {
        if self.unbreakable_used
            || !player.has_keystone(KeystoneId::Unbreakable)
            || !player.entity.is_alive()
        {
            return None;
        }

        let stats = &player.entity.stats;
        let hundred = Fixed::from_num(100);
        let threshold = stats
            .max_hp
            .saturating_mul(Fixed::from_num(UNBREAKABLE_HP_PERCENT));
        if stats.hp.saturating_mul(hundred) > threshold {
            return None;
        }

        let armor_bonus = player
            .entity
            .base
            .armor
            .saturating_mul(Fixed::from_num(UNBREAKABLE_ARMOR_PERCENT))
            / hundred;
        let lifesteal_bonus = ratio(3, 20);

        let stats = &mut player.entity.stats;
        stats.armor += armor_bonus;
        stats.lifesteal += lifesteal_bonus;
        stats.clamp();
        self.unbreakable_used = true;

        Some(CombatEvent::new(
            tick,
            CombatEventKind::KeystoneProc {
                entity: player.entity.id,
                keystone: KeystoneId::Unbreakable,
                effect: KeystoneEffect::Fortified {
                    armor_bonus,
                    lifesteal_bonus,
                },
            },
        ))
    }

    /// Count internal cooldowns down by one tick.
    pub fn tick_cooldowns(&mut self) {
        self.frenzy_cooldown = self.frenzy_cooldown.saturating_sub(1);
    }
}
