//! Combatants: the shared entity core plus player and enemy variants.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{BossPhase, ItemSlot};
use crate::effects::{apply_effect, EffectApplication, EffectGrant, StatusEffects};
use crate::events::{CombatEvent, CombatEventKind};
use crate::keystones::KeystoneId;
use crate::math::{ceil_ticks, Fixed};
use crate::stats::Stats;

/// Identifier of a combatant within one wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The player always has id 0.
    pub const PLAYER: Self = Self(0);

    /// Id of the `index`-th enemy spawned in a wave.
    #[must_use]
    pub const fn enemy(index: u32) -> Self {
        Self(index + 1)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State shared by every combatant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Permanent stats.
    pub base: Stats,
    /// Base stats plus temporary combat modifiers.
    pub stats: Stats,
    /// Active status effects.
    pub effects: StatusEffects,
    /// Ticks until the next auto-attack.
    pub attack_cooldown: u32,
    /// Whether HP has reached zero.
    pub dead: bool,
    /// Whether the death has been reported in the event log.
    pub death_reported: bool,
    /// Last entity to deal damage, reported as the killer.
    pub last_damaged_by: Option<EntityId>,
    /// On-hit and opening-shield grants.
    pub grants: Vec<EffectGrant>,
}

impl Entity {
    /// Create an entity at full HP with current stats equal to `base`.
    pub fn new(id: EntityId, name: impl Into<String>, base: Stats) -> Self {
        let base = base.clamped();
        Self {
            id,
            name: name.into(),
            base,
            stats: base,
            effects: StatusEffects::new(id),
            attack_cooldown: 0,
            dead: false,
            death_reported: false,
            last_damaged_by: None,
            grants: Vec::new(),
        }
    }

    /// Attach effect grants.
    #[must_use]
    pub fn with_grants(mut self, grants: Vec<EffectGrant>) -> Self {
        self.grants = grants;
        self
    }

    /// Whether the entity can still act.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Ticks between auto-attacks: `ceil(tps / attack_speed)`.
    #[must_use]
    pub fn attack_interval(&self, ticks_per_second: u32) -> u32 {
        ceil_ticks(Fixed::from_num(ticks_per_second) / self.stats.attack_speed)
    }

    /// Count the attack cooldown down by one tick. Returns true when ready.
    pub fn advance_attack_cooldown(&mut self) -> bool {
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
        self.attack_cooldown == 0
    }

    /// Prepare for a new combat: keep HP, drop effects and temporary stats.
    pub fn reset_for_combat(&mut self) {
        let hp = self.stats.hp;
        self.stats = self.base;
        self.stats.hp = hp;
        self.stats.clamp();
        self.effects = StatusEffects::new(self.id);
        self.attack_cooldown = 0;
        self.dead = self.stats.hp <= Fixed::ZERO;
        self.death_reported = false;
        self.last_damaged_by = None;
    }

    /// Apply opening shields from grants. Returns one event per shield.
    pub fn apply_opening_shields(&mut self, tick: u64) -> Vec<CombatEvent> {
        let shields: Vec<EffectApplication> = self
            .grants
            .iter()
            .filter_map(|grant| match *grant {
                EffectGrant::OpeningShield {
                    amount,
                    duration_ticks,
                } if amount > 0 && duration_ticks > 0 => {
                    Some(EffectApplication::shield(self.id, amount, duration_ticks))
                }
                _ => None,
            })
            .collect();

        shields
            .into_iter()
            .map(|shield| apply_effect(self, shield, tick))
            .collect()
    }
}

/// An equipped item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquippedItem {
    /// Item record id.
    pub id: String,
    /// Slot the item occupies.
    pub slot: ItemSlot,
}

/// The player character, persistent across waves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Combat state.
    pub entity: Entity,
    /// Character level, starting at 1.
    pub level: u32,
    /// Experience toward the next level.
    pub xp: u32,
    /// Experience required for the next level.
    pub xp_to_next_level: u32,
    /// Unspent currency.
    pub gold: u32,
    /// Unspent skill points.
    pub skill_points: u32,
    /// Points allocated per skill id.
    pub allocated_skills: BTreeMap<String, u32>,
    /// Equipped items, at most one per slot.
    pub items: Vec<EquippedItem>,
    /// Selected perk ids in pick order.
    pub perks: Vec<String>,
    /// Unlocked keystones.
    pub keystones: Vec<KeystoneId>,
    /// Starting relic.
    pub relic: Option<String>,
}

impl Player {
    /// Create a level 1 player.
    pub fn new(name: impl Into<String>, base: Stats, xp_to_next_level: u32) -> Self {
        Self {
            entity: Entity::new(EntityId::PLAYER, name, base),
            level: 1,
            xp: 0,
            xp_to_next_level,
            gold: 0,
            skill_points: 0,
            allocated_skills: BTreeMap::new(),
            items: Vec::new(),
            perks: Vec::new(),
            keystones: Vec::new(),
            relic: None,
        }
    }

    /// Whether `keystone` is unlocked.
    #[must_use]
    pub fn has_keystone(&self, keystone: KeystoneId) -> bool {
        self.keystones.contains(&keystone)
    }

    /// Unlock a keystone. Unlocking twice has no effect.
    pub fn unlock_keystone(&mut self, keystone: KeystoneId) {
        if !self.has_keystone(keystone) {
            self.keystones.push(keystone);
        }
    }

    /// Points allocated to a skill.
    #[must_use]
    pub fn skill_points_in(&self, skill_id: &str) -> u32 {
        self.allocated_skills.get(skill_id).copied().unwrap_or(0)
    }

    /// Item equipped in `slot`.
    #[must_use]
    pub fn item_in(&self, slot: ItemSlot) -> Option<&EquippedItem> {
        self.items.iter().find(|item| item.slot == slot)
    }

    /// Equip an item, replacing whatever occupies its slot.
    pub fn equip(&mut self, item: EquippedItem) {
        self.items.retain(|equipped| equipped.slot != item.slot);
        self.items.push(item);
    }
}

/// A hostile combatant spawned for one wave.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enemy {
    /// Combat state.
    pub entity: Entity,
    /// Template or boss id.
    pub template_id: String,
    /// Spawned as an elite.
    pub elite: bool,
    /// Spawned from a boss template.
    pub boss: bool,
    /// Affix ids applied at spawn.
    pub affixes: Vec<String>,
    /// Current phase, starting at 1.
    pub phase: u32,
    /// Phase transitions still available, in order.
    pub phases: Vec<BossPhase>,
    /// Experience granted on death.
    pub xp_reward: u32,
    /// Currency granted on death.
    pub gold_reward: u32,
}

impl Enemy {
    /// Create a regular enemy.
    pub fn new(entity: Entity, template_id: impl Into<String>) -> Self {
        Self {
            entity,
            template_id: template_id.into(),
            elite: false,
            boss: false,
            affixes: Vec::new(),
            phase: 1,
            phases: Vec::new(),
            xp_reward: 0,
            gold_reward: 0,
        }
    }

    /// Set death rewards.
    #[must_use]
    pub const fn with_rewards(mut self, xp: u32, gold: u32) -> Self {
        self.xp_reward = xp;
        self.gold_reward = gold;
        self
    }

    /// Make this enemy a boss with the given phases.
    #[must_use]
    pub fn with_phases(mut self, mut phases: Vec<BossPhase>) -> Self {
        phases.sort_by_key(|p| p.phase);
        self.boss = true;
        self.phases = phases;
        self
    }

    /// Advance through every phase whose HP threshold has been crossed.
    ///
    /// Dead enemies never change phase.
    pub fn advance_phases(&mut self, tick: u64) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        while self.entity.is_alive() {
            let next = self.phase + 1;
            let Some(phase) = self.phases.iter().find(|p| p.phase == next) else {
                break;
            };
            if self.entity.stats.hp_fraction() > phase.hp_threshold {
                break;
            }

            self.entity.stats = self.entity.stats.apply_modifiers(&phase.modifiers);
            let old_phase = self.phase;
            self.phase = next;
            events.push(CombatEvent::new(
                tick,
                CombatEventKind::PhaseChange {
                    entity: self.entity.id,
                    old_phase,
                    new_phase: next,
                },
            ));
        }
        events
    }
}
