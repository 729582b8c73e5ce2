//! Proptest strategies for simulation testing.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of combat math and determinism.

use arena_core::effects::EffectApplication;
use arena_core::entity::EntityId;
use arena_core::math::Fixed;
use arena_core::stats::Stats;
use proptest::prelude::*;

/// Generate seeds.
pub fn arb_seed() -> impl Strategy<Value = u32> {
    any::<u32>()
}

/// Generate health values (1-1000).
pub fn arb_health() -> impl Strategy<Value = i32> {
    1i32..1000i32
}

/// Generate raw damage values (0-500).
pub fn arb_damage() -> impl Strategy<Value = u32> {
    0u32..500u32
}

/// Generate armor or resistance values (0-300).
pub fn arb_defense() -> impl Strategy<Value = i32> {
    0i32..300i32
}

/// Generate a probability in [0, 1] with 1/1000 resolution.
pub fn arb_probability() -> impl Strategy<Value = Fixed> {
    (0i32..=1000i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(1000))
}

/// Generate attack speeds from 0.2 to 3.0 attacks per second.
pub fn arb_attack_speed() -> impl Strategy<Value = Fixed> {
    (2i32..=30i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(10))
}

/// Generate combat stats for an enemy or player.
pub fn arb_stats() -> impl Strategy<Value = Stats> {
    (
        arb_health(),
        0i32..40i32,
        0i32..40i32,
        arb_attack_speed(),
        (0i32..=50i32),
    )
        .prop_map(|(hp, attack, armor, attack_speed, crit_percent)| {
            let mut stats = Stats::minimal()
                .with_hp(hp)
                .with_attack(attack)
                .with_armor(armor)
                .with_attack_speed(attack_speed);
            stats.crit_chance = Fixed::from_num(crit_percent) / Fixed::from_num(100);
            stats.crit_multiplier = Fixed::from_num(3) / Fixed::from_num(2);
            stats.clamped()
        })
}

/// Generate a bleed, poison or shield application from `source`.
pub fn arb_effect_application(source: EntityId) -> impl Strategy<Value = EffectApplication> {
    let stacks = 1u32..5u32;
    let duration = 1u32..300u32;
    prop_oneof![
        (stacks.clone(), 1i32..6i32, duration.clone())
            .prop_map(move |(s, m, d)| EffectApplication::bleed(source, s, Fixed::from_num(m), d)),
        (stacks, 1i32..6i32, duration.clone())
            .prop_map(move |(s, m, d)| EffectApplication::poison(source, s, Fixed::from_num(m), d)),
        (1u32..200u32, duration).prop_map(move |(a, d)| EffectApplication::shield(source, a, d)),
    ]
}

/// Generate a sequence of effect applications from distinct sources.
pub fn arb_effect_sequence(max_len: usize) -> impl Strategy<Value = Vec<EffectApplication>> {
    proptest::collection::vec(
        (1u32..4u32).prop_flat_map(|source| arb_effect_application(EntityId(source))),
        1..max_len,
    )
}
