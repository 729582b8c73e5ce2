//! Combat events emitted by the tick engine.
//!
//! Every event carries the tick it happened on. Logs serialize with serde
//! and hash with [`event_log_hash`], so two runs can be compared byte for
//! byte.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{DamageOrigin, DamageType};
use crate::effects::{EffectId, StatusTag};
use crate::entity::EntityId;
use crate::keystones::{KeystoneEffect, KeystoneId};
use crate::math::{fixed_serde, Fixed};

/// Why an effect left its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Duration ran out.
    Expired,
    /// Shield absorption reached zero.
    Consumed,
}

/// One entry of the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Tick the event happened on.
    pub tick: u64,
    /// What happened.
    pub kind: CombatEventKind,
}

impl CombatEvent {
    /// Create an event.
    #[must_use]
    pub const fn new(tick: u64, kind: CombatEventKind) -> Self {
        Self { tick, kind }
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatEventKind {
    /// An attack landed.
    Attack {
        /// Attacking entity.
        attacker: EntityId,
        /// Target entity.
        target: EntityId,
        /// Final damage.
        damage: u32,
        /// Whether it crit.
        crit: bool,
        /// Granted by a keystone rather than the attack cooldown.
        free: bool,
    },
    /// Damage was applied.
    Damage {
        /// Entity credited with the damage.
        source: EntityId,
        /// Entity damaged.
        target: EntityId,
        /// Total damage after mitigation.
        amount: u32,
        /// Portion absorbed by shields.
        to_shield: u32,
        /// Portion subtracted from HP.
        to_hp: u32,
        /// Damage type.
        damage_type: DamageType,
        /// Attack or damage over time.
        origin: DamageOrigin,
    },
    /// HP was restored.
    Heal {
        /// Entity providing the heal.
        source: EntityId,
        /// Entity healed.
        target: EntityId,
        /// HP restored.
        amount: u32,
    },
    /// An attack crit.
    Crit {
        /// Attacking entity.
        attacker: EntityId,
        /// Target entity.
        target: EntityId,
        /// Final damage.
        damage: u32,
        /// Multiplier applied.
        #[serde(with = "fixed_serde")]
        multiplier: Fixed,
    },
    /// An attack was evaded.
    Miss {
        /// Attacking entity.
        attacker: EntityId,
        /// Evading entity.
        target: EntityId,
    },
    /// An entity died.
    Death {
        /// Entity that died.
        entity: EntityId,
        /// Last entity to damage it.
        killer: Option<EntityId>,
        /// Experience granted.
        xp_reward: u32,
        /// Currency granted.
        gold_reward: u32,
    },
    /// An effect was applied or refreshed.
    EffectApplied {
        /// Entity carrying the effect.
        target: EntityId,
        /// Entity applying the effect.
        source: EntityId,
        /// Effect identifier.
        effect: EffectId,
        /// Effect type.
        status: StatusTag,
        /// Stacks after merging.
        stacks: u32,
        /// Duration after merging.
        duration: u32,
    },
    /// An effect ended.
    EffectRemoved {
        /// Entity that carried the effect.
        target: EntityId,
        /// Effect identifier.
        effect: EffectId,
        /// Effect type.
        status: StatusTag,
        /// Why it ended.
        reason: RemovalReason,
    },
    /// A damage-over-time effect fired.
    EffectTick {
        /// Entity carrying the effect.
        target: EntityId,
        /// Effect identifier.
        effect: EffectId,
        /// Effect type.
        status: StatusTag,
        /// Damage dealt.
        damage: u32,
    },
    /// A boss entered a new phase.
    PhaseChange {
        /// The boss.
        entity: EntityId,
        /// Phase left.
        old_phase: u32,
        /// Phase entered.
        new_phase: u32,
    },
    /// A keystone fired.
    KeystoneProc {
        /// Entity owning the keystone.
        entity: EntityId,
        /// Keystone that fired.
        keystone: KeystoneId,
        /// What it did.
        effect: KeystoneEffect,
    },
}

impl CombatEventKind {
    /// Short name of the variant, for counters and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Attack { .. } => "attack",
            Self::Damage { .. } => "damage",
            Self::Heal { .. } => "heal",
            Self::Crit { .. } => "crit",
            Self::Miss { .. } => "miss",
            Self::Death { .. } => "death",
            Self::EffectApplied { .. } => "effect_applied",
            Self::EffectRemoved { .. } => "effect_removed",
            Self::EffectTick { .. } => "effect_tick",
            Self::PhaseChange { .. } => "phase_change",
            Self::KeystoneProc { .. } => "keystone_proc",
        }
    }
}

/// Fold `event` into a running digest.
#[must_use]
pub fn chain_hash<T: Hash>(digest: u64, event: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    digest.hash(&mut hasher);
    event.hash(&mut hasher);
    hasher.finish()
}

/// Digest of a whole event log.
#[must_use]
pub fn event_log_hash(events: &[CombatEvent]) -> u64 {
    events.iter().fold(0, |digest, event| chain_hash(digest, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn death(tick: u64) -> CombatEvent {
        CombatEvent::new(
            tick,
            CombatEventKind::Death {
                entity: EntityId(1),
                killer: Some(EntityId(0)),
                xp_reward: 10,
                gold_reward: 5,
            },
        )
    }

    #[test]
    fn test_log_hash_depends_on_order_and_tick() {
        let miss = CombatEvent::new(
            1,
            CombatEventKind::Miss {
                attacker: EntityId(0),
                target: EntityId(1),
            },
        );
        let a = vec![miss.clone(), death(2)];
        let b = vec![death(2), miss];
        assert_ne!(event_log_hash(&a), event_log_hash(&b));
        assert_ne!(event_log_hash(&[death(1)]), event_log_hash(&[death(2)]));
        assert_eq!(event_log_hash(&a), event_log_hash(&a.clone()));
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = CombatEvent::new(
            9,
            CombatEventKind::Crit {
                attacker: EntityId(0),
                target: EntityId(3),
                damage: 42,
                multiplier: Fixed::from_num(1.75),
            },
        );
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: CombatEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(death(1).kind.name(), "death");
    }
}
