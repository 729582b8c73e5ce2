//! Damage, mitigation and attack resolution.
//!
//! This module implements:
//! - Diminishing-returns mitigation: `raw * 100 / (100 + defense)`
//! - Physical damage reduced by armor, magic by resistance, true damage unreduced
//! - Vulnerable amplification after mitigation
//! - Shields absorbing damage before HP
//! - One attack resolution path shared by the player and enemies

use serde::{Deserialize, Serialize};

use crate::effects::{apply_effect, StatusEffect, StatusTag};
use crate::entity::{Entity, EntityId};
use crate::events::{CombatEvent, CombatEventKind, RemovalReason};
use crate::math::{floor_u32, Fixed};
use crate::rng::SeededRng;

/// How damage interacts with defenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Reduced by armor.
    Physical,
    /// Reduced by resistance.
    Magic,
    /// Ignores defenses.
    True,
}

/// What caused a damage instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageOrigin {
    /// An auto-attack (regular or free).
    Attack,
    /// A bleed tick.
    Bleed,
    /// A poison tick.
    Poison,
}

/// Reduce `raw` damage by `defense`. Never reaches zero for positive input.
#[must_use]
pub fn mitigate(raw: Fixed, defense: Fixed) -> Fixed {
    if defense <= Fixed::ZERO {
        return raw;
    }
    let hundred = Fixed::from_num(100);
    raw.saturating_mul(hundred) / (hundred + defense)
}

/// Final integer damage of `raw` against `target`.
#[must_use]
pub fn calculate_damage(raw: Fixed, damage_type: DamageType, target: &Entity) -> u32 {
    let mitigated = match damage_type {
        DamageType::Physical => mitigate(raw, target.stats.armor),
        DamageType::Magic => mitigate(raw, target.stats.resistance),
        DamageType::True => raw,
    };
    floor_u32(mitigated.saturating_mul(target.effects.vulnerable_multiplier()))
}

/// Result of [`apply_damage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Absorbed by shields.
    pub to_shield: u32,
    /// Subtracted from HP.
    pub to_hp: u32,
    /// Shields depleted by this hit.
    pub consumed: Vec<StatusEffect>,
    /// Whether this hit killed the target.
    pub killed: bool,
}

/// Apply final damage: shields first, then HP.
pub fn apply_damage(target: &mut Entity, amount: u32, source: EntityId) -> DamageOutcome {
    if amount == 0 {
        return DamageOutcome::default();
    }
    target.last_damaged_by = Some(source);

    let (to_shield, consumed) = target.effects.absorb(amount);
    let to_hp = amount - to_shield;
    let was_alive = target.is_alive();

    target.stats.hp = (target.stats.hp - Fixed::from_num(to_hp)).max(Fixed::ZERO);
    if target.stats.hp <= Fixed::ZERO {
        target.dead = true;
    }

    DamageOutcome {
        to_shield,
        to_hp,
        consumed,
        killed: was_alive && target.dead,
    }
}

/// Heal `target`, clamped to max HP. Returns the HP actually restored.
pub fn apply_healing(target: &mut Entity, amount: u32) -> u32 {
    if target.dead || amount == 0 {
        return 0;
    }
    let before = target.stats.hp;
    target.stats.hp = (before + Fixed::from_num(amount)).min(target.stats.max_hp);
    floor_u32(target.stats.hp - before)
}

/// Roll whether an attack lands. Consumes one draw.
pub fn roll_hit(target: &Entity, rng: &mut SeededRng) -> bool {
    !rng.chance(target.stats.evasion)
}

/// Roll whether a landed attack crits. Consumes one draw.
pub fn roll_crit(attacker: &Entity, rng: &mut SeededRng) -> bool {
    rng.chance(attacker.stats.crit_chance)
}

/// Physical damage of one auto-attack.
#[must_use]
pub fn calculate_attack_damage(attacker: &Entity, target: &Entity, crit: bool) -> u32 {
    let raw = if crit {
        attacker.stats.attack.saturating_mul(attacker.stats.crit_multiplier)
    } else {
        attacker.stats.attack
    };
    calculate_damage(raw, DamageType::Physical, target)
}

/// Result of [`resolve_attack`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Events in emission order.
    pub events: Vec<CombatEvent>,
    /// Whether the attack landed.
    pub landed: bool,
    /// Whether the attack crit.
    pub crit: bool,
    /// Final damage dealt.
    pub damage: u32,
}

/// Resolve one auto-attack from `attacker` against `defender`.
///
/// Draw order: hit roll, crit roll (only on a hit), then one roll per
/// on-hit grant while the defender lives. `free` marks attacks granted
/// by keystones.
pub fn resolve_attack(
    attacker: &mut Entity,
    defender: &mut Entity,
    rng: &mut SeededRng,
    tick: u64,
    free: bool,
) -> AttackOutcome {
    let mut outcome = AttackOutcome::default();

    if !roll_hit(defender, rng) {
        outcome.events.push(CombatEvent::new(
            tick,
            CombatEventKind::Miss {
                attacker: attacker.id,
                target: defender.id,
            },
        ));
        return outcome;
    }

    let crit = roll_crit(attacker, rng);
    let damage = calculate_attack_damage(attacker, defender, crit);
    outcome.landed = true;
    outcome.crit = crit;
    outcome.damage = damage;

    outcome.events.push(CombatEvent::new(
        tick,
        CombatEventKind::Attack {
            attacker: attacker.id,
            target: defender.id,
            damage,
            crit,
            free,
        },
    ));
    if crit {
        outcome.events.push(CombatEvent::new(
            tick,
            CombatEventKind::Crit {
                attacker: attacker.id,
                target: defender.id,
                damage,
                multiplier: attacker.stats.crit_multiplier,
            },
        ));
    }

    let applied = apply_damage(defender, damage, attacker.id);
    outcome.events.push(CombatEvent::new(
        tick,
        CombatEventKind::Damage {
            source: attacker.id,
            target: defender.id,
            amount: damage,
            to_shield: applied.to_shield,
            to_hp: applied.to_hp,
            damage_type: DamageType::Physical,
            origin: DamageOrigin::Attack,
        },
    ));
    for shield in &applied.consumed {
        outcome.events.push(CombatEvent::new(
            tick,
            CombatEventKind::EffectRemoved {
                target: defender.id,
                effect: shield.id,
                status: StatusTag::Shield,
                reason: RemovalReason::Consumed,
            },
        ));
    }

    let lifesteal = floor_u32(Fixed::from_num(damage).saturating_mul(attacker.stats.lifesteal));
    let healed = apply_healing(attacker, lifesteal);
    if healed > 0 {
        outcome.events.push(CombatEvent::new(
            tick,
            CombatEventKind::Heal {
                source: attacker.id,
                target: attacker.id,
                amount: healed,
            },
        ));
    }

    if defender.is_alive() {
        let applications: Vec<_> = attacker
            .grants
            .iter()
            .filter_map(|grant| grant.on_hit_application(attacker.id))
            .collect();
        for (chance, application) in applications {
            if rng.chance(chance) {
                outcome
                    .events
                    .push(apply_effect(defender, application, tick));
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectApplication, EffectGrant, OnHitStatus};
    use crate::math::ratio;
    use crate::stats::Stats;
    use proptest::prelude::*;

    fn entity(id: u32, stats: Stats) -> Entity {
        Entity::new(EntityId(id), "E", stats)
    }

    #[test]
    fn test_mitigate_basic() {
        let mitigated = mitigate(Fixed::from_num(100), Fixed::from_num(100));
        assert_eq!(mitigated, Fixed::from_num(50));
    }

    #[test]
    fn test_mitigate_zero_defense_is_identity() {
        let raw = Fixed::from_num(37);
        assert_eq!(mitigate(raw, Fixed::ZERO), raw);
        assert_eq!(mitigate(raw, Fixed::from_num(-5)), raw);
    }

    #[test]
    fn test_damage_types() {
        let mut target = entity(1, Stats::minimal().with_hp(100).with_armor(100));
        target.stats.resistance = Fixed::from_num(300);
        let raw = Fixed::from_num(100);

        assert_eq!(calculate_damage(raw, DamageType::Physical, &target), 50);
        assert_eq!(calculate_damage(raw, DamageType::Magic, &target), 25);
        assert_eq!(calculate_damage(raw, DamageType::True, &target), 100);
    }

    #[test]
    fn test_vulnerable_amplifies_after_mitigation() {
        let mut target = entity(1, Stats::minimal().with_hp(100).with_armor(100));
        target
            .effects
            .apply(EffectApplication::vulnerable(EntityId(2), 2, ratio(1, 4), 60));
        // 100 -> 50 after armor -> 75 with +50%
        assert_eq!(calculate_damage(Fixed::from_num(100), DamageType::Physical, &target), 75);
    }

    #[test]
    fn test_shield_absorbs_first() {
        let mut target = entity(1, Stats::minimal().with_hp(50));
        target.effects.apply(EffectApplication::shield(EntityId(1), 20, 100));

        let outcome = apply_damage(&mut target, 15, EntityId(2));
        assert_eq!(outcome.to_shield, 15);
        assert_eq!(outcome.to_hp, 0);
        assert_eq!(target.stats.hp, Fixed::from_num(50));
        assert_eq!(target.effects.total_shield(), 5);

        let outcome = apply_damage(&mut target, 12, EntityId(2));
        assert_eq!(outcome.to_shield, 5);
        assert_eq!(outcome.to_hp, 7);
        assert_eq!(outcome.consumed.len(), 1);
        assert_eq!(target.stats.hp, Fixed::from_num(43));
    }

    #[test]
    fn test_lethal_damage_sets_dead_once() {
        let mut target = entity(1, Stats::minimal().with_hp(10));
        let outcome = apply_damage(&mut target, 25, EntityId(2));
        assert!(outcome.killed);
        assert!(target.dead);
        assert_eq!(target.stats.hp, Fixed::ZERO);
        assert_eq!(target.last_damaged_by, Some(EntityId(2)));

        let outcome = apply_damage(&mut target, 5, EntityId(3));
        assert!(!outcome.killed);
    }

    #[test]
    fn test_healing_clamps() {
        let mut target = entity(1, Stats::minimal().with_hp(100));
        target.stats.hp = Fixed::from_num(95);
        assert_eq!(apply_healing(&mut target, 20), 5);
        assert_eq!(target.stats.hp, Fixed::from_num(100));

        target.dead = true;
        assert_eq!(apply_healing(&mut target, 20), 0);
    }

    #[test]
    fn test_crit_damage() {
        let attacker = entity(0, Stats::player_default().with_attack(20));
        let target = entity(1, Stats::minimal().with_hp(500));
        assert_eq!(calculate_attack_damage(&attacker, &target, false), 20);
        assert_eq!(calculate_attack_damage(&attacker, &target, true), 35);
    }

    #[test]
    fn test_max_evasion_still_hits_sometimes() {
        let mut defender = entity(1, Stats::minimal().with_hp(100));
        defender.stats.evasion = Fixed::ONE;
        defender.stats.clamp();
        let mut rng = SeededRng::new(11);
        let hits = (0..400).filter(|_| roll_hit(&defender, &mut rng)).count();
        assert!(hits > 0);
        assert!(hits < 400);
    }

    #[test]
    fn test_resolve_attack_event_order() {
        let mut attacker = entity(0, Stats::minimal().with_hp(100).with_attack(10));
        attacker.stats.lifesteal = ratio(1, 2);
        attacker.stats.hp = Fixed::from_num(50);
        attacker.grants.push(EffectGrant::OnHit {
            status: OnHitStatus::Bleed,
            chance: Fixed::ONE,
            stacks: 1,
            magnitude: Fixed::from_num(2),
            duration_ticks: 60,
        });
        let mut defender = entity(1, Stats::minimal().with_hp(100));
        let mut rng = SeededRng::new(1);

        let outcome = resolve_attack(&mut attacker, &mut defender, &mut rng, 4, false);
        assert!(outcome.landed);
        assert!(!outcome.crit);
        assert_eq!(outcome.damage, 10);

        let kinds: Vec<_> = outcome.events.iter().map(|e| &e.kind).collect();
        assert!(matches!(kinds[0], CombatEventKind::Attack { damage: 10, .. }));
        assert!(matches!(kinds[1], CombatEventKind::Damage { to_hp: 10, .. }));
        assert!(matches!(kinds[2], CombatEventKind::Heal { amount: 5, .. }));
        assert!(matches!(kinds[3], CombatEventKind::EffectApplied { status: StatusTag::Bleed, .. }));
        assert!(outcome.events.iter().all(|e| e.tick == 4));
        assert_eq!(defender.effects.bleed_stacks(), 1);
    }

    #[test]
    fn test_resolve_attack_miss() {
        let mut attacker = entity(0, Stats::minimal().with_attack(10));
        let mut defender = entity(1, Stats::minimal().with_hp(100));
        defender.stats.evasion = ratio(3, 4);
        let mut rng = SeededRng::new(0);

        let misses = (0..50)
            .map(|t| resolve_attack(&mut attacker, &mut defender, &mut rng, t, false))
            .filter(|o| !o.landed)
            .inspect(|o| assert!(matches!(o.events[0].kind, CombatEventKind::Miss { .. })))
            .count();
        assert!(misses > 0);
    }

    proptest! {
        #[test]
        fn prop_mitigation_monotonic(raw in 1i32..10_000, d1 in 0i32..1000, delta in 1i32..1000) {
            let raw = Fixed::from_num(raw);
            let low = mitigate(raw, Fixed::from_num(d1));
            let high = mitigate(raw, Fixed::from_num(d1 + delta));
            prop_assert!(low > high);
            prop_assert!(high > Fixed::ZERO);
        }

        #[test]
        fn prop_shield_before_hp(shield in 1u32..500, damage in 0u32..1000) {
            let mut target = entity(1, Stats::minimal().with_hp(2000));
            target.effects.apply(EffectApplication::shield(EntityId(1), shield, 100));
            let outcome = apply_damage(&mut target, damage, EntityId(2));

            if damage <= shield {
                prop_assert_eq!(target.stats.hp, Fixed::from_num(2000));
                prop_assert_eq!(outcome.to_shield, damage);
                prop_assert_eq!(target.effects.total_shield(), shield - damage);
            } else {
                prop_assert_eq!(target.effects.total_shield(), 0);
                prop_assert_eq!(target.stats.hp, Fixed::from_num(2000 - (damage - shield)));
            }
        }
    }
}
