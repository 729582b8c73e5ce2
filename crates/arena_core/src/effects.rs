//! Status effects: damage over time, vulnerability and shields.
//!
//! Each entity owns a [`StatusEffects`] list. The list hands out effect
//! identifiers from its own counter, so two simulations never share
//! identifier state.
//!
//! # Stacking
//!
//! At most one effect exists per `(kind, source)` pair. Reapplying merges
//! into the existing entry: stacks are summed, duration and magnitude take
//! the larger of the two values.

use serde::{Deserialize, Serialize};

use crate::combat::{apply_damage, calculate_damage, DamageOrigin, DamageType};
use crate::config::SimConfig;
use crate::entity::{Entity, EntityId};
use crate::events::{CombatEvent, CombatEventKind, RemovalReason};
use crate::math::{fixed_decimal, fixed_serde, Fixed};

/// Identifier of a status effect, unique within its owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId {
    /// Entity carrying the effect.
    pub owner: EntityId,
    /// Per-owner sequence number.
    pub seq: u32,
}

/// Discriminant of [`EffectKind`], used for matching and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusTag {
    /// Physical damage over time.
    Bleed,
    /// Magic damage over time.
    Poison,
    /// Increases damage taken.
    Vulnerable,
    /// Absorbs damage before HP.
    Shield,
}

/// Type-specific payload of a status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Physical damage per stack on every bleed interval.
    Bleed {
        /// Raw damage per stack.
        #[serde(with = "fixed_serde")]
        damage_per_stack: Fixed,
    },
    /// Magic damage per stack on every poison interval.
    Poison {
        /// Raw damage per stack.
        #[serde(with = "fixed_serde")]
        damage_per_stack: Fixed,
    },
    /// Damage taken is multiplied by `1 + stacks * increase_per_stack`.
    Vulnerable {
        /// Damage increase per stack, `0.1` = +10%.
        #[serde(with = "fixed_serde")]
        increase_per_stack: Fixed,
    },
    /// Damage absorption.
    Shield {
        /// Remaining absorption.
        amount: u32,
        /// Absorption when applied.
        max_amount: u32,
    },
}

impl EffectKind {
    /// The tag of this effect.
    #[must_use]
    pub const fn tag(&self) -> StatusTag {
        match self {
            Self::Bleed { .. } => StatusTag::Bleed,
            Self::Poison { .. } => StatusTag::Poison,
            Self::Vulnerable { .. } => StatusTag::Vulnerable,
            Self::Shield { .. } => StatusTag::Shield,
        }
    }

    /// Merge another payload of the same kind, keeping the larger magnitude.
    fn merge_magnitude(&mut self, other: &Self) {
        match (self, other) {
            (
                Self::Bleed { damage_per_stack },
                Self::Bleed {
                    damage_per_stack: new,
                },
            )
            | (
                Self::Poison { damage_per_stack },
                Self::Poison {
                    damage_per_stack: new,
                },
            ) => {
                *damage_per_stack = (*damage_per_stack).max(*new);
            }
            (
                Self::Vulnerable { increase_per_stack },
                Self::Vulnerable {
                    increase_per_stack: new,
                },
            ) => {
                *increase_per_stack = (*increase_per_stack).max(*new);
            }
            (
                Self::Shield { amount, max_amount },
                Self::Shield {
                    amount: new_amount,
                    max_amount: new_max,
                },
            ) => {
                *amount = (*amount).max(*new_amount);
                *max_amount = (*max_amount).max(*new_max);
            }
            _ => {}
        }
    }
}

/// An active status effect on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect identifier.
    pub id: EffectId,
    /// Entity that applied the effect.
    pub source: EntityId,
    /// Stack count.
    pub stacks: u32,
    /// Ticks remaining.
    pub duration: u32,
    /// Type-specific payload.
    pub kind: EffectKind,
}

impl StatusEffect {
    /// The tag of this effect.
    #[must_use]
    pub const fn tag(&self) -> StatusTag {
        self.kind.tag()
    }
}

/// A request to apply or refresh an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectApplication {
    /// Entity applying the effect.
    pub source: EntityId,
    /// Stacks to add.
    pub stacks: u32,
    /// Duration in ticks.
    pub duration: u32,
    /// Payload.
    pub kind: EffectKind,
}

impl EffectApplication {
    /// A bleed application.
    #[must_use]
    pub const fn bleed(
        source: EntityId,
        stacks: u32,
        damage_per_stack: Fixed,
        duration: u32,
    ) -> Self {
        Self {
            source,
            stacks,
            duration,
            kind: EffectKind::Bleed { damage_per_stack },
        }
    }

    /// A poison application.
    #[must_use]
    pub const fn poison(
        source: EntityId,
        stacks: u32,
        damage_per_stack: Fixed,
        duration: u32,
    ) -> Self {
        Self {
            source,
            stacks,
            duration,
            kind: EffectKind::Poison { damage_per_stack },
        }
    }

    /// A vulnerable application.
    #[must_use]
    pub const fn vulnerable(
        source: EntityId,
        stacks: u32,
        increase_per_stack: Fixed,
        duration: u32,
    ) -> Self {
        Self {
            source,
            stacks,
            duration,
            kind: EffectKind::Vulnerable { increase_per_stack },
        }
    }

    /// A shield application.
    #[must_use]
    pub const fn shield(source: EntityId, amount: u32, duration: u32) -> Self {
        Self {
            source,
            stacks: 1,
            duration,
            kind: EffectKind::Shield {
                amount,
                max_amount: amount,
            },
        }
    }
}

/// Ordered list of effects owned by one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffects {
    owner: EntityId,
    next_seq: u32,
    effects: Vec<StatusEffect>,
}

impl StatusEffects {
    /// Create an empty list for `owner`.
    #[must_use]
    pub const fn new(owner: EntityId) -> Self {
        Self {
            owner,
            next_seq: 1,
            effects: Vec::new(),
        }
    }

    /// Apply or merge an effect. Returns the resulting effect.
    pub fn apply(&mut self, application: EffectApplication) -> &StatusEffect {
        let tag = application.kind.tag();
        let existing = self
            .effects
            .iter()
            .position(|e| e.tag() == tag && e.source == application.source);

        let index = match existing {
            Some(index) => {
                let effect = &mut self.effects[index];
                effect.stacks = effect.stacks.saturating_add(application.stacks);
                effect.duration = effect.duration.max(application.duration);
                effect.kind.merge_magnitude(&application.kind);
                index
            }
            None => {
                let id = EffectId {
                    owner: self.owner,
                    seq: self.next_seq,
                };
                self.next_seq += 1;
                self.effects.push(StatusEffect {
                    id,
                    source: application.source,
                    stacks: application.stacks,
                    duration: application.duration,
                    kind: application.kind,
                });
                self.effects.len() - 1
            }
        };

        &self.effects[index]
    }

    /// Iterate effects in application order.
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    /// Number of active effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effects are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Find an effect by tag and source.
    #[must_use]
    pub fn find(&self, tag: StatusTag, source: EntityId) -> Option<&StatusEffect> {
        self.effects
            .iter()
            .find(|e| e.tag() == tag && e.source == source)
    }

    /// Whether any effect with `tag` is active.
    #[must_use]
    pub fn has(&self, tag: StatusTag) -> bool {
        self.effects.iter().any(|e| e.tag() == tag)
    }

    /// Total bleed stacks from every source.
    #[must_use]
    pub fn bleed_stacks(&self) -> u32 {
        self.effects
            .iter()
            .filter(|e| e.tag() == StatusTag::Bleed)
            .map(|e| e.stacks)
            .sum()
    }

    /// Aggregated damage-taken multiplier from every vulnerable effect.
    #[must_use]
    pub fn vulnerable_multiplier(&self) -> Fixed {
        self.effects
            .iter()
            .filter_map(|e| match e.kind {
                EffectKind::Vulnerable { increase_per_stack } => {
                    Some(Fixed::from_num(e.stacks) * increase_per_stack)
                }
                _ => None,
            })
            .fold(Fixed::ONE, |acc, increase| acc + increase)
    }

    /// Remaining absorption across all shields.
    #[must_use]
    pub fn total_shield(&self) -> u32 {
        self.effects
            .iter()
            .filter_map(|e| match e.kind {
                EffectKind::Shield { amount, .. } => Some(amount),
                _ => None,
            })
            .sum()
    }

    /// Drain `damage` from shields in list order.
    ///
    /// Returns the absorbed amount and the shields that were depleted,
    /// which are removed from the list.
    pub fn absorb(&mut self, damage: u32) -> (u32, Vec<StatusEffect>) {
        let mut remaining = damage;
        for effect in &mut self.effects {
            if remaining == 0 {
                break;
            }
            if let EffectKind::Shield { amount, .. } = &mut effect.kind {
                let absorbed = (*amount).min(remaining);
                *amount -= absorbed;
                remaining -= absorbed;
            }
        }

        let consumed = self.drain_where(|e| matches!(e.kind, EffectKind::Shield { amount: 0, .. }));
        (damage - remaining, consumed)
    }

    /// Decrement every duration by one tick and remove expired effects.
    pub fn tick_durations(&mut self) -> Vec<StatusEffect> {
        for effect in &mut self.effects {
            effect.duration = effect.duration.saturating_sub(1);
        }
        self.drain_where(|e| e.duration == 0)
    }

    /// Remove every effect.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    fn drain_where(&mut self, predicate: impl Fn(&StatusEffect) -> bool) -> Vec<StatusEffect> {
        let (removed, kept): (Vec<_>, Vec<_>) = self.effects.drain(..).partition(|e| predicate(e));
        self.effects = kept;
        removed
    }
}

/// Which status an on-hit grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnHitStatus {
    /// Apply bleed; magnitude is damage per stack.
    Bleed,
    /// Apply poison; magnitude is damage per stack.
    Poison,
    /// Apply vulnerable; magnitude is damage increase per stack.
    Vulnerable,
}

/// Effect-granting behavior carried by skills, perks, items, relics and affixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectGrant {
    /// Chance to apply a status to the target of a landed attack.
    OnHit {
        /// Status applied.
        status: OnHitStatus,
        /// Probability per landed hit.
        #[serde(with = "fixed_decimal")]
        chance: Fixed,
        /// Stacks per application.
        stacks: u32,
        /// Damage per stack (bleed, poison) or increase per stack (vulnerable).
        #[serde(with = "fixed_decimal")]
        magnitude: Fixed,
        /// Duration in ticks.
        duration_ticks: u32,
    },
    /// Shield applied to the carrier when combat starts.
    OpeningShield {
        /// Absorption.
        amount: u32,
        /// Duration in ticks.
        duration_ticks: u32,
    },
}

impl EffectGrant {
    /// Build the application for an on-hit grant, or `None` for other grants.
    #[must_use]
    pub fn on_hit_application(&self, source: EntityId) -> Option<(Fixed, EffectApplication)> {
        match *self {
            Self::OnHit {
                status,
                chance,
                stacks,
                magnitude,
                duration_ticks,
            } => {
                let application = match status {
                    OnHitStatus::Bleed => {
                        EffectApplication::bleed(source, stacks, magnitude, duration_ticks)
                    }
                    OnHitStatus::Poison => {
                        EffectApplication::poison(source, stacks, magnitude, duration_ticks)
                    }
                    OnHitStatus::Vulnerable => {
                        EffectApplication::vulnerable(source, stacks, magnitude, duration_ticks)
                    }
                };
                Some((chance, application))
            }
            Self::OpeningShield { .. } => None,
        }
    }
}

/// Apply an effect to `target` and report it.
pub fn apply_effect(target: &mut Entity, application: EffectApplication, tick: u64) -> CombatEvent {
    let target_id = target.id;
    let effect = target.effects.apply(application);
    CombatEvent::new(
        tick,
        CombatEventKind::EffectApplied {
            target: target_id,
            source: application.source,
            effect: effect.id,
            status: effect.tag(),
            stacks: effect.stacks,
            duration: effect.duration,
        },
    )
}

/// Resolve bleed and poison damage on `entity` for this tick.
///
/// Bleed fires on ticks divisible by the bleed interval, poison on ticks
/// divisible by the poison interval. Damage goes through shields first.
pub fn resolve_dots(entity: &mut Entity, tick: u64, config: &SimConfig) -> Vec<CombatEvent> {
    let mut events = Vec::new();

    let due: Vec<(EffectId, EntityId, StatusTag, Fixed)> = entity
        .effects
        .iter()
        .filter_map(|effect| {
            let (tag, damage_per_stack, interval) = match effect.kind {
                EffectKind::Bleed { damage_per_stack } => {
                    (StatusTag::Bleed, damage_per_stack, config.bleed_interval_ticks)
                }
                EffectKind::Poison { damage_per_stack } => {
                    (StatusTag::Poison, damage_per_stack, config.poison_interval_ticks)
                }
                _ => return None,
            };
            if !is_due(tick, interval) {
                return None;
            }
            let raw = damage_per_stack.saturating_mul(Fixed::from_num(effect.stacks));
            Some((effect.id, effect.source, tag, raw))
        })
        .collect();

    for (effect_id, source, tag, raw) in due {
        if entity.dead {
            break;
        }
        let (damage_type, origin) = match tag {
            StatusTag::Poison => (DamageType::Magic, DamageOrigin::Poison),
            _ => (DamageType::Physical, DamageOrigin::Bleed),
        };
        let amount = calculate_damage(raw, damage_type, entity);
        let outcome = apply_damage(entity, amount, source);

        events.push(CombatEvent::new(
            tick,
            CombatEventKind::Damage {
                source,
                target: entity.id,
                amount,
                to_shield: outcome.to_shield,
                to_hp: outcome.to_hp,
                damage_type,
                origin,
            },
        ));
        events.extend(outcome.consumed.iter().map(|shield| {
            CombatEvent::new(
                tick,
                CombatEventKind::EffectRemoved {
                    target: entity.id,
                    effect: shield.id,
                    status: StatusTag::Shield,
                    reason: RemovalReason::Consumed,
                },
            )
        }));
        events.push(CombatEvent::new(
            tick,
            CombatEventKind::EffectTick {
                target: entity.id,
                effect: effect_id,
                status: tag,
                damage: amount,
            },
        ));
    }

    events
}

/// Count down durations on `entity` and report expired effects.
pub fn tick_effects(entity: &mut Entity, tick: u64) -> Vec<CombatEvent> {
    let target = entity.id;
    entity
        .effects
        .tick_durations()
        .into_iter()
        .map(|effect| {
            CombatEvent::new(
                tick,
                CombatEventKind::EffectRemoved {
                    target,
                    effect: effect.id,
                    status: effect.tag(),
                    reason: RemovalReason::Expired,
                },
            )
        })
        .collect()
}

/// Total bleed stacks on `entity`.
#[must_use]
pub fn bleed_stacks(entity: &Entity) -> u32 {
    entity.effects.bleed_stacks()
}

fn is_due(tick: u64, interval: u32) -> bool {
    interval > 0 && tick % u64::from(interval) == 0
}
