//! Test fixtures and helpers.
//!
//! Pre-built content, entities and combats for consistent testing.

use std::sync::Arc;

use arena_core::config::SimConfig;
use arena_core::data::{
    AffixData, BossData, BossPhase, ContentLibrary, EnemyData, ItemData, ItemSlot, PerkData, Rarity,
    RelicData, SkillBranch, SkillData, StatBlock, WaveData, WaveRewards, WaveSpawn,
};
use arena_core::effects::{EffectGrant, OnHitStatus};
use arena_core::entity::{Enemy, Entity, EntityId, Player};
use arena_core::keystones::KeystoneId;
use arena_core::rng::SeededRng;
use arena_core::simulation::{CombatSession, CombatState};
use arena_core::stats::{StatModifiers, Stats};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Stats with the given HP, attack and armor; one attack per second,
/// no crits, no evasion.
#[must_use]
pub fn stats(hp: i32, attack: i32, armor: i32) -> Stats {
    Stats::minimal().with_hp(hp).with_attack(attack).with_armor(armor)
}

/// A level 1 player with `base` stats.
#[must_use]
pub fn player(base: Stats) -> Player {
    Player::new("Hero", base, SimConfig::default().xp_to_next_level(1))
}

/// An enemy at spawn `index` with `base` stats.
#[must_use]
pub fn enemy(index: u32, base: Stats) -> Enemy {
    Enemy::new(Entity::new(EntityId::enemy(index), format!("Enemy {index}"), base), "fixture")
}

/// A target that never attacks back.
#[must_use]
pub fn dummy(index: u32, hp: i32) -> Enemy {
    enemy(index, stats(hp, 0, 0))
}

/// Bundle a combat with a fresh RNG and default config.
///
/// # Panics
///
/// Panics if `enemies` is empty.
#[must_use]
pub fn session(seed: u32, player: Player, enemies: Vec<Enemy>) -> CombatSession {
    let state = CombatState::new(player, enemies).expect("fixture combat has enemies");
    CombatSession::new(state, SeededRng::new(seed), SimConfig::default())
}

/// Default player against a single bandit, with crits and evasion in play.
#[must_use]
pub fn duel_session(seed: u32) -> CombatSession {
    let bandit = content_library()
        .get_enemy("bandit")
        .map(|data| data.stats.to_stats())
        .unwrap_or_else(|| stats(60, 9, 5));
    session(seed, player(Stats::player_default()), vec![enemy(0, bandit)])
}

fn block(hp: i32, attack: i32, armor: i32, attack_speed: f64) -> StatBlock {
    StatBlock {
        max_hp: fixed(hp),
        attack: fixed(attack),
        armor: fixed(armor),
        resistance: I32F32::ZERO,
        attack_speed: fixed_f(attack_speed),
        crit_chance: fixed_f(0.05),
        crit_multiplier: fixed_f(1.5),
        power: I32F32::ZERO,
        cdr: I32F32::ZERO,
        lifesteal: I32F32::ZERO,
        evasion: I32F32::ZERO,
    }
}

fn on_hit(
    status: OnHitStatus,
    chance: f64,
    stacks: u32,
    magnitude: f64,
    duration_ticks: u32,
) -> EffectGrant {
    EffectGrant::OnHit {
        status,
        chance: fixed_f(chance),
        stacks,
        magnitude: fixed_f(magnitude),
        duration_ticks,
    }
}

#[allow(clippy::too_many_arguments)]
fn skill(
    id: &str,
    branch: SkillBranch,
    tier: u8,
    max_points: u32,
    prerequisites: &[&str],
    modifiers: StatModifiers,
    grants: Vec<EffectGrant>,
    keystone: Option<KeystoneId>,
) -> SkillData {
    SkillData {
        id: id.to_string(),
        name: id.replace('_', " "),
        description: String::new(),
        branch,
        tier,
        max_points,
        prerequisites: prerequisites.iter().map(|p| (*p).to_string()).collect(),
        modifiers,
        grants,
        keystone,
    }
}

fn perk(id: &str, rarity: Rarity, modifiers: StatModifiers, grants: Vec<EffectGrant>) -> PerkData {
    PerkData {
        id: id.to_string(),
        name: id.replace('_', " "),
        description: String::new(),
        rarity,
        modifiers,
        grants,
        tags: Vec::new(),
    }
}

fn item(id: &str, slot: ItemSlot, modifiers: StatModifiers) -> ItemData {
    ItemData {
        id: id.to_string(),
        name: id.replace('_', " "),
        description: String::new(),
        slot,
        rarity: Rarity::Common,
        modifiers,
        grants: Vec::new(),
    }
}

fn wave(
    number: u32,
    spawns: &[(&str, u32, bool)],
    boss: Option<&str>,
    xp: u32,
    gold: u32,
) -> WaveData {
    WaveData {
        number,
        name: format!("Wave {number}"),
        enemies: spawns
            .iter()
            .map(|&(template, count, elite)| WaveSpawn {
                template: template.to_string(),
                count,
                elite,
                affix_count: u32::from(elite),
            })
            .collect(),
        boss: boss.map(str::to_string),
        rewards: WaveRewards {
            xp,
            gold,
            item_drop_chance: fixed_f(0.25),
        },
    }
}

/// A small but complete content library: every skill branch and
/// keystone, a handful of perks, items, relics and affixes, and five
/// waves ending in a boss.
#[must_use]
pub fn content_library() -> Arc<ContentLibrary> {
    let none = StatModifiers::default;

    let skills = vec![
        skill(
            "quick_strikes",
            SkillBranch::BladeDance,
            1,
            3,
            &[],
            StatModifiers {
                attack_speed: fixed_f(0.1),
                ..none()
            },
            vec![],
            None,
        ),
        skill(
            "frenzy_loop",
            SkillBranch::BladeDance,
            5,
            1,
            &["quick_strikes"],
            StatModifiers {
                crit_chance: fixed_f(0.1),
                ..none()
            },
            vec![],
            Some(KeystoneId::FrenzyLoop),
        ),
        skill(
            "serrated_edge",
            SkillBranch::Bloodcraft,
            1,
            3,
            &[],
            none(),
            vec![on_hit(OnHitStatus::Bleed, 0.5, 1, 2.0, 180)],
            None,
        ),
        skill(
            "hemorrhage_engine",
            SkillBranch::Bloodcraft,
            5,
            1,
            &["serrated_edge"],
            none(),
            vec![],
            Some(KeystoneId::HemorrhageEngine),
        ),
        skill(
            "thick_skin",
            SkillBranch::IronVeil,
            1,
            3,
            &[],
            StatModifiers {
                armor: fixed(3),
                ..none()
            },
            vec![],
            None,
        ),
        skill(
            "unbreakable",
            SkillBranch::IronVeil,
            5,
            1,
            &["thick_skin"],
            none(),
            vec![],
            Some(KeystoneId::Unbreakable),
        ),
    ];

    let perks = vec![
        perk(
            "vigor",
            Rarity::Common,
            StatModifiers {
                max_hp: fixed(25),
                ..none()
            },
            vec![],
        ),
        perk(
            "precision",
            Rarity::Common,
            StatModifiers {
                crit_chance: fixed_f(0.05),
                ..none()
            },
            vec![],
        ),
        perk(
            "venom",
            Rarity::Rare,
            none(),
            vec![on_hit(OnHitStatus::Poison, 0.3, 1, 3.0, 120)],
        ),
        perk(
            "bulwark",
            Rarity::Rare,
            none(),
            vec![EffectGrant::OpeningShield {
                amount: 30,
                duration_ticks: 300,
            }],
        ),
        perk(
            "exploit",
            Rarity::Epic,
            none(),
            vec![on_hit(OnHitStatus::Vulnerable, 0.25, 1, 0.1, 120)],
        ),
    ];

    let items = vec![
        item(
            "iron_sword",
            ItemSlot::Weapon,
            StatModifiers {
                attack: fixed(6),
                ..none()
            },
        ),
        item(
            "war_axe",
            ItemSlot::Weapon,
            StatModifiers {
                attack_percent: fixed_f(0.25),
                ..none()
            },
        ),
        item(
            "chain_mail",
            ItemSlot::Armor,
            StatModifiers {
                armor: fixed(6),
                ..none()
            },
        ),
        item(
            "lucky_charm",
            ItemSlot::Trinket,
            StatModifiers {
                crit_chance: fixed_f(0.05),
                evasion: fixed_f(0.05),
                ..none()
            },
        ),
    ];

    let relics = vec![
        RelicData {
            id: "ember_heart".into(),
            name: "Ember Heart".into(),
            description: String::new(),
            modifiers: StatModifiers {
                attack: fixed(3),
                ..none()
            },
            grants: vec![],
        },
        RelicData {
            id: "stone_idol".into(),
            name: "Stone Idol".into(),
            description: String::new(),
            modifiers: StatModifiers {
                armor: fixed(4),
                ..none()
            },
            grants: vec![],
        },
    ];

    let enemies = vec![
        EnemyData {
            id: "slime".into(),
            name: "Slime".into(),
            stats: block(40, 6, 2, 0.8),
            xp_reward: 8,
            gold_reward: 2,
            grants: vec![],
            tags: vec!["beast".into()],
        },
        EnemyData {
            id: "bandit".into(),
            name: "Bandit".into(),
            stats: block(60, 9, 5, 1.0),
            xp_reward: 12,
            gold_reward: 5,
            grants: vec![on_hit(OnHitStatus::Bleed, 0.2, 1, 2.0, 120)],
            tags: vec!["humanoid".into()],
        },
        EnemyData {
            id: "hexer".into(),
            name: "Hexer".into(),
            stats: block(45, 7, 1, 0.9),
            xp_reward: 15,
            gold_reward: 6,
            grants: vec![on_hit(OnHitStatus::Poison, 0.35, 1, 2.0, 150)],
            tags: vec!["caster".into()],
        },
    ];

    let bosses = vec![BossData {
        id: "warden".into(),
        name: "The Warden".into(),
        stats: block(320, 12, 10, 0.9),
        xp_reward: 80,
        gold_reward: 40,
        grants: vec![],
        phases: vec![
            BossPhase {
                phase: 2,
                hp_threshold: fixed_f(0.6),
                modifiers: StatModifiers {
                    attack: fixed(4),
                    ..none()
                },
            },
            BossPhase {
                phase: 3,
                hp_threshold: fixed_f(0.3),
                modifiers: StatModifiers {
                    attack_speed: fixed_f(0.3),
                    ..none()
                },
            },
        ],
    }];

    let affixes = vec![
        AffixData {
            id: "hulking".into(),
            name: "Hulking".into(),
            modifiers: StatModifiers {
                max_hp_percent: fixed_f(0.5),
                ..none()
            },
            grants: vec![],
        },
        AffixData {
            id: "vicious".into(),
            name: "Vicious".into(),
            modifiers: StatModifiers {
                attack: fixed(4),
                ..none()
            },
            grants: vec![],
        },
        AffixData {
            id: "swift".into(),
            name: "Swift".into(),
            modifiers: StatModifiers {
                attack_speed: fixed_f(0.25),
                ..none()
            },
            grants: vec![],
        },
    ];

    let waves = vec![
        wave(1, &[("slime", 2, false)], None, 40, 10),
        wave(2, &[("slime", 2, false), ("bandit", 1, false)], None, 60, 15),
        wave(3, &[("bandit", 2, true)], None, 80, 20),
        wave(4, &[("bandit", 2, false), ("hexer", 1, false)], None, 100, 25),
        wave(5, &[("slime", 2, false)], Some("warden"), 150, 50),
    ];

    Arc::new(ContentLibrary {
        skills,
        perks,
        items,
        relics,
        enemies,
        bosses,
        affixes,
        waves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_library_is_valid() {
        let content = content_library();
        assert_eq!(content.validate(), Vec::<String>::new());
        assert_eq!(content.max_waves(), 5);
    }

    #[test]
    fn test_stats_helper() {
        let s = stats(100, 12, 4);
        assert_eq!(s.hp, fixed(100));
        assert_eq!(s.max_hp, fixed(100));
        assert_eq!(s.attack, fixed(12));
        assert_eq!(s.armor, fixed(4));
    }

    #[test]
    fn test_duel_session_has_one_enemy() {
        let session = duel_session(1);
        assert_eq!(session.state().enemies.len(), 1);
        assert_eq!(session.state().enemies[0].entity.id, EntityId::enemy(0));
    }
}
