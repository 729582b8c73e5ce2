//! Content record types.
//!
//! Pure data definitions for skills, perks, items, relics, enemies, bosses,
//! affixes and waves. Every struct deserializes from RON, with fractional
//! values written as decimals.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `arena_headless`.

mod build_data;
mod enemy_data;
mod library;
mod wave_data;

pub use build_data::{ItemData, ItemSlot, PerkData, Rarity, RelicData, SkillBranch, SkillData};
pub use enemy_data::{AffixData, BossData, BossPhase, EnemyData, StatBlock};
pub use library::ContentLibrary;
pub use wave_data::{WaveData, WaveRewards, WaveSpawn};
