//! Hand-authored RON records parsed into content types.

use arena_core::config::SimConfig;
use arena_core::data::{ContentLibrary, EnemyData, WaveData, WaveSpawn};
use arena_core::effects::{EffectGrant, OnHitStatus};
use arena_core::error::SimError;
use arena_core::math::{ratio, Fixed};

const SLIME: &str = r#"
EnemyData(
    id: "slime",
    name: "Slime",
    stats: StatBlock(max_hp: 40.0, attack: 6.0, attack_speed: 0.8),
    xp_reward: 10,
    gold_reward: 4,
    grants: [
        OnHit(status: Poison, chance: 0.25, stacks: 2, magnitude: 1.5, duration_ticks: 180),
    ],
)
"#;

#[test]
fn sim_config_overrides_keep_defaults() {
    let config: SimConfig =
        ron::from_str("SimConfig(max_ticks_per_wave: 3600, item_pity_waves: 3)").unwrap();

    assert_eq!(
        config,
        SimConfig {
            max_ticks_per_wave: 3600,
            item_pity_waves: 3,
            ..SimConfig::default()
        }
    );
    assert!(config.validate().is_empty());
}

#[test]
fn wave_decimals_and_spawn_defaults() {
    let wave: WaveData = ron::from_str(
        r#"WaveData(
            number: 3,
            name: "Ambush",
            enemies: [
                WaveSpawn(template: "bandit", count: 2, elite: true, affix_count: 1),
                WaveSpawn(template: "slime"),
            ],
            rewards: WaveRewards(xp: 60, gold: 25, item_drop_chance: 0.35),
        )"#,
    )
    .unwrap();

    assert_eq!(wave.rewards.item_drop_chance, Fixed::from_num(0.35));
    assert_eq!(
        wave.enemies[1],
        WaveSpawn {
            template: "slime".to_string(),
            count: 1,
            elite: false,
            affix_count: 0,
        }
    );
    assert_eq!(wave.enemy_count(), 3);
    assert!(!wave.is_boss_wave());
}

#[test]
fn enemy_stat_block_defaults_and_grants() {
    let slime: EnemyData = ron::from_str(SLIME).unwrap();

    assert_eq!(slime.stats.attack_speed, Fixed::from_num(0.8));
    assert_eq!(slime.stats.crit_multiplier, ratio(3, 2));
    assert_eq!(slime.stats.armor, Fixed::ZERO);
    assert_eq!(
        slime.grants,
        vec![EffectGrant::OnHit {
            status: OnHitStatus::Poison,
            chance: Fixed::from_num(0.25),
            stacks: 2,
            magnitude: ratio(3, 2),
            duration_ticks: 180,
        }]
    );
    assert!(slime.stats.validate(&slime.id).is_empty());
}

#[test]
fn out_of_range_decimal_is_rejected() {
    let text = SLIME.replace("max_hp: 40.0", "max_hp: 10000000000.0");
    let err = ron::from_str::<EnemyData>(&text).unwrap_err();
    assert!(err.to_string().contains("out of fixed-point range"));
}

#[test]
fn partial_library_parses_but_fails_validation() {
    let library: ContentLibrary = ron::from_str(&format!("(enemies: [{SLIME}])")).unwrap();
    assert_eq!(library.enemies.len(), 1);
    assert!(library.waves.is_empty());

    match library.validated() {
        Err(SimError::InvalidContent(errors)) => {
            assert!(errors.iter().any(|e| e == "No waves defined"));
        }
        other => panic!("expected invalid content, got {other:?}"),
    }
}

#[test]
fn decimal_fields_survive_ron_round_trip() {
    let slime: EnemyData = ron::from_str(SLIME).unwrap();
    let text = ron::to_string(&slime).unwrap();
    let back: EnemyData = ron::from_str(&text).unwrap();
    assert_eq!(back, slime);
}
