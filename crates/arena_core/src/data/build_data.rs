//! Build choices: skills, perks, items and relics.

use serde::{Deserialize, Serialize};

use crate::effects::EffectGrant;
use crate::keystones::KeystoneId;
use crate::stats::StatModifiers;

/// Skill tree branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillBranch {
    /// Speed and crits.
    BladeDance,
    /// Bleeds and lifesteal.
    Bloodcraft,
    /// Armor and shields.
    IronVeil,
}

/// Rarity of perks and items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Rarity {
    /// Common.
    #[default]
    Common,
    /// Rare.
    Rare,
    /// Epic.
    Epic,
    /// Legendary.
    Legendary,
}

/// Equipment slot. One item per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemSlot {
    /// Weapon.
    Weapon,
    /// Armor.
    Armor,
    /// Trinket.
    Trinket,
}

/// Skill tree node.
///
/// # Example RON
///
/// ```ron
/// SkillData(
///     id: "serrated_edge",
///     name: "Serrated Edge",
///     branch: Bloodcraft,
///     tier: 1,
///     max_points: 3,
///     modifiers: StatModifiers(attack: 2),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Tree branch.
    pub branch: SkillBranch,
    /// Tier within the branch, 1 to 5.
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// Maximum allocatable points.
    #[serde(default = "default_max_points")]
    pub max_points: u32,
    /// Skills that need at least one point first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Modifiers per allocated point.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Grants applied once the skill has a point.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
    /// Keystone unlocked by the first point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystone: Option<KeystoneId>,
}

const fn default_tier() -> u8 {
    1
}

const fn default_max_points() -> u32 {
    1
}

impl SkillData {
    /// Whether this node unlocks a keystone.
    #[must_use]
    pub const fn is_keystone(&self) -> bool {
        self.keystone.is_some()
    }
}

/// Perk offered between waves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Rarity.
    #[serde(default)]
    pub rarity: Rarity,
    /// Stat modifiers.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Effect grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PerkData {
    /// Check if this perk has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Equippable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Slot.
    pub slot: ItemSlot,
    /// Rarity.
    #[serde(default)]
    pub rarity: Rarity,
    /// Stat modifiers.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Effect grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
}

/// Starting relic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelicData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Stat modifiers.
    #[serde(default)]
    pub modifiers: StatModifiers,
    /// Effect grants.
    #[serde(default)]
    pub grants: Vec<EffectGrant>,
}
