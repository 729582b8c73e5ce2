//! Combat tick engine.
//!
//! One call to [`simulate_tick`] advances a [`CombatState`] by exactly one
//! logical tick. The order of work inside a tick is fixed:
//!
//! 1. increment the tick counter
//! 2. resolve bleed and poison on living entities
//! 3. report deaths caused by damage over time, advance boss phases
//! 4. Unbreakable
//! 5. player auto-attack against the first living enemy, Frenzy Loop on crit
//! 6. enemy auto-attacks against the player, in list order
//! 7. report deaths caused by attacks, advance boss phases
//! 8. Hemorrhage Engine free attacks
//! 9. keystone internal cooldowns
//! 10. effect durations
//! 11. terminal conditions
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - All randomness comes from the [`SeededRng`] passed in
//! - Entities are visited in list order
//! - Same inputs always produce the same event log
//!
//! # Example
//!
//! ```
//! use arena_core::config::SimConfig;
//! use arena_core::entity::{Enemy, Entity, EntityId, Player};
//! use arena_core::rng::SeededRng;
//! use arena_core::simulation::{simulate_combat, CombatState, Winner};
//! use arena_core::stats::Stats;
//!
//! let player = Player::new("Hero", Stats::player_default(), 100);
//! let slime = Enemy::new(
//!     Entity::new(EntityId::enemy(0), "Slime", Stats::minimal().with_hp(30).with_attack(2)),
//!     "slime",
//! );
//!
//! let mut state = CombatState::new(player, vec![slime]).unwrap();
//! let winner = simulate_combat(&mut state, &mut SeededRng::new(42), &SimConfig::default());
//! assert_eq!(winner, Winner::Player);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::resolve_attack;
use crate::config::SimConfig;
use crate::effects::{resolve_dots, tick_effects};
use crate::entity::{Enemy, Player};
use crate::error::{Result, SimError};
use crate::events::{event_log_hash, CombatEvent, CombatEventKind};
use crate::keystones::{KeystoneEffect, KeystoneId, KeystoneState, HEMORRHAGE_THRESHOLD};
use crate::rng::SeededRng;

/// Side that won a combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    /// Every enemy died.
    Player,
    /// The player died or the wave timed out.
    Enemies,
}

/// Combat lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatStatus {
    /// Still running.
    #[default]
    Active,
    /// Finished with a winner.
    Complete(Winner),
}

/// Everything one wave of combat mutates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatState {
    /// Ticks simulated so far.
    pub tick: u64,
    /// The player.
    pub player: Player,
    /// Enemies in spawn order.
    pub enemies: Vec<Enemy>,
    /// Every event emitted so far.
    pub events: Vec<CombatEvent>,
    /// Lifecycle state.
    pub status: CombatStatus,
}

impl CombatState {
    /// Start a combat. Opening shields are applied at tick 0.
    ///
    /// # Errors
    /// Returns an error if `enemies` is empty.
    pub fn new(player: Player, enemies: Vec<Enemy>) -> Result<Self> {
        if enemies.is_empty() {
            return Err(SimError::InvalidState(
                "combat needs at least one enemy".to_string(),
            ));
        }

        let mut state = Self {
            tick: 0,
            player,
            enemies,
            events: Vec::new(),
            status: CombatStatus::Active,
        };

        let mut events = state.player.entity.apply_opening_shields(0);
        for enemy in &mut state.enemies {
            events.extend(enemy.entity.apply_opening_shields(0));
        }
        state.events = events;
        Ok(state)
    }

    /// Whether the combat has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, CombatStatus::Complete(_))
    }

    /// The winner, once complete.
    #[must_use]
    pub const fn winner(&self) -> Option<Winner> {
        match self.status {
            CombatStatus::Complete(winner) => Some(winner),
            CombatStatus::Active => None,
        }
    }

    /// Index of the first living enemy.
    #[must_use]
    pub fn first_living_enemy(&self) -> Option<usize> {
        self.enemies.iter().position(|e| e.entity.is_alive())
    }

    /// Number of living enemies.
    #[must_use]
    pub fn living_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.entity.is_alive()).count()
    }

    /// Digest of the event log.
    #[must_use]
    pub fn event_log_hash(&self) -> u64 {
        event_log_hash(&self.events)
    }

    /// Digest of the whole state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    #[cfg(feature = "debug-validation")]
    fn entities(&self) -> impl Iterator<Item = &crate::entity::Entity> {
        std::iter::once(&self.player.entity).chain(self.enemies.iter().map(|e| &e.entity))
    }

    /// Panic if any entity breaks a stat or stacking invariant.
    #[cfg(feature = "debug-validation")]
    pub fn assert_invariants(&self) {
        for entity in self.entities() {
            assert_eq!(
                entity.stats,
                entity.stats.clamped(),
                "stats out of range on {}",
                entity.id
            );
            assert!(
                entity.dead || entity.stats.hp > crate::math::Fixed::ZERO,
                "{} has no HP but is not dead",
                entity.id
            );
            let mut keys: Vec<_> = entity.effects.iter().map(|e| (e.tag(), e.source)).collect();
            let total = keys.len();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), total, "duplicate effect on {}", entity.id);
        }
    }
}

/// Advance `state` by one tick.
///
/// Events are appended to the state's log and returned. A completed
/// combat is left untouched and yields no events.
pub fn simulate_tick(
    state: &mut CombatState,
    rng: &mut SeededRng,
    config: &SimConfig,
    keystones: &mut KeystoneState,
) -> Vec<CombatEvent> {
    if state.is_complete() {
        return Vec::new();
    }

    state.tick += 1;
    let tick = state.tick;
    let mut events = Vec::new();

    // Damage over time
    if state.player.entity.is_alive() {
        events.extend(resolve_dots(&mut state.player.entity, tick, config));
    }
    for enemy in state.enemies.iter_mut().filter(|e| e.entity.is_alive()) {
        events.extend(resolve_dots(&mut enemy.entity, tick, config));
    }
    detect_deaths(state, tick, &mut events);

    events.extend(keystones.unbreakable(&mut state.player, tick));

    // Attacks
    player_attack(state, rng, config, keystones, &mut events);
    enemy_attacks(state, rng, config, &mut events);
    detect_deaths(state, tick, &mut events);

    if hemorrhage_attacks(state, rng, config, keystones, &mut events) {
        detect_deaths(state, tick, &mut events);
    }

    keystones.tick_cooldowns();

    // Effect durations
    if state.player.entity.is_alive() {
        events.extend(tick_effects(&mut state.player.entity, tick));
    }
    for enemy in state.enemies.iter_mut().filter(|e| e.entity.is_alive()) {
        events.extend(tick_effects(&mut enemy.entity, tick));
    }

    update_status(state, config);

    #[cfg(feature = "debug-validation")]
    state.assert_invariants();

    state.events.extend(events.iter().cloned());
    events
}

/// Run `simulate_tick` until the combat completes.
pub fn simulate_combat(state: &mut CombatState, rng: &mut SeededRng, config: &SimConfig) -> Winner {
    let mut keystones = KeystoneState::new();
    loop {
        simulate_tick(state, rng, config, &mut keystones);
        if let Some(winner) = state.winner() {
            return winner;
        }
    }
}

fn player_attack(
    state: &mut CombatState,
    rng: &mut SeededRng,
    config: &SimConfig,
    keystones: &mut KeystoneState,
    events: &mut Vec<CombatEvent>,
) {
    if !state.player.entity.is_alive() || !state.player.entity.advance_attack_cooldown() {
        return;
    }
    let Some(target) = state.first_living_enemy() else {
        return;
    };

    let tick = state.tick;
    let outcome = resolve_attack(
        &mut state.player.entity,
        &mut state.enemies[target].entity,
        rng,
        tick,
        false,
    );
    state.player.entity.attack_cooldown =
        state.player.entity.attack_interval(config.ticks_per_second);
    events.extend(outcome.events);

    if outcome.crit {
        events.extend(keystones.frenzy_loop(&mut state.player, tick, config));
    }
}

fn enemy_attacks(
    state: &mut CombatState,
    rng: &mut SeededRng,
    config: &SimConfig,
    events: &mut Vec<CombatEvent>,
) {
    let tick = state.tick;
    for enemy in &mut state.enemies {
        if !state.player.entity.is_alive() {
            break;
        }
        if !enemy.entity.is_alive() || !enemy.entity.advance_attack_cooldown() {
            continue;
        }

        let outcome = resolve_attack(&mut enemy.entity, &mut state.player.entity, rng, tick, false);
        enemy.entity.attack_cooldown = enemy.entity.attack_interval(config.ticks_per_second);
        events.extend(outcome.events);
    }
}

/// Perform Hemorrhage Engine free attacks. Returns true if any happened.
fn hemorrhage_attacks(
    state: &mut CombatState,
    rng: &mut SeededRng,
    config: &SimConfig,
    keystones: &mut KeystoneState,
    events: &mut Vec<CombatEvent>,
) -> bool {
    let procs = keystones.hemorrhage_engine(&state.player, &state.enemies);
    let tick = state.tick;
    let mut attacked = false;

    for _ in 0..procs {
        if !state.player.entity.is_alive() {
            break;
        }
        let Some(target) = state.first_living_enemy() else {
            break;
        };

        events.push(CombatEvent::new(
            tick,
            CombatEventKind::KeystoneProc {
                entity: state.player.entity.id,
                keystone: KeystoneId::HemorrhageEngine,
                effect: KeystoneEffect::FreeAttack {
                    target: state.enemies[target].entity.id,
                    stacks_consumed: HEMORRHAGE_THRESHOLD,
                },
            },
        ));
        let outcome = resolve_attack(
            &mut state.player.entity,
            &mut state.enemies[target].entity,
            rng,
            tick,
            true,
        );
        events.extend(outcome.events);
        if outcome.crit {
            events.extend(keystones.frenzy_loop(&mut state.player, tick, config));
        }
        attacked = true;
    }

    attacked
}

/// Report new deaths once each and advance boss phases on the living.
fn detect_deaths(state: &mut CombatState, tick: u64, events: &mut Vec<CombatEvent>) {
    let player = &mut state.player.entity;
    if player.dead && !player.death_reported {
        player.death_reported = true;
        events.push(CombatEvent::new(
            tick,
            CombatEventKind::Death {
                entity: player.id,
                killer: player.last_damaged_by,
                xp_reward: 0,
                gold_reward: 0,
            },
        ));
    }

    for enemy in &mut state.enemies {
        if enemy.entity.dead {
            if !enemy.entity.death_reported {
                enemy.entity.death_reported = true;
                events.push(CombatEvent::new(
                    tick,
                    CombatEventKind::Death {
                        entity: enemy.entity.id,
                        killer: enemy.entity.last_damaged_by,
                        xp_reward: enemy.xp_reward,
                        gold_reward: enemy.gold_reward,
                    },
                ));
            }
        } else if enemy.boss {
            events.extend(enemy.advance_phases(tick));
        }
    }
}

fn update_status(state: &mut CombatState, config: &SimConfig) {
    let winner = if !state.player.entity.is_alive() {
        Some(Winner::Enemies)
    } else if state.first_living_enemy().is_none() {
        Some(Winner::Player)
    } else if state.tick >= config.max_ticks_per_wave {
        Some(Winner::Enemies)
    } else {
        None
    };

    if let Some(winner) = winner {
        state.status = CombatStatus::Complete(winner);
        tracing::debug!(
            tick = state.tick,
            ?winner,
            events = state.events.len(),
            "Combat complete"
        );
    }
}

/// A combat bundled with its RNG, keystone state and config.
///
/// This is what the run layer drives one tick at a time.
#[derive(Debug, Clone)]
pub struct CombatSession {
    state: CombatState,
    rng: SeededRng,
    keystones: KeystoneState,
    config: SimConfig,
}

impl CombatSession {
    /// Bundle a fresh combat.
    #[must_use]
    pub fn new(state: CombatState, rng: SeededRng, config: SimConfig) -> Self {
        Self {
            state,
            rng,
            keystones: KeystoneState::new(),
            config,
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> Vec<CombatEvent> {
        simulate_tick(
            &mut self.state,
            &mut self.rng,
            &self.config,
            &mut self.keystones,
        )
    }

    /// Tick until complete.
    pub fn run_to_completion(&mut self) -> Winner {
        loop {
            self.tick();
            if let Some(winner) = self.state.winner() {
                return winner;
            }
        }
    }

    /// Read-only view of the combat.
    #[must_use]
    pub const fn state(&self) -> &CombatState {
        &self.state
    }

    /// Keystone bookkeeping.
    #[must_use]
    pub const fn keystones(&self) -> &KeystoneState {
        &self.keystones
    }

    /// Consume the session, returning the final state.
    #[must_use]
    pub fn into_state(self) -> CombatState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectApplication;
    use crate::entity::{Entity, EntityId};
    use crate::math::Fixed;
    use crate::stats::Stats;

    fn enemy(index: u32, stats: Stats) -> Enemy {
        Enemy::new(Entity::new(EntityId::enemy(index), "Dummy", stats), "dummy").with_rewards(7, 3)
    }

    fn player(stats: Stats) -> Player {
        Player::new("Hero", stats, 100)
    }

    fn run_ticks(state: &mut CombatState, rng: &mut SeededRng, config: &SimConfig, n: usize) {
        let mut keystones = KeystoneState::new();
        for _ in 0..n {
            simulate_tick(state, rng, config, &mut keystones);
        }
    }

    #[test]
    fn test_empty_enemy_list_rejected() {
        assert!(matches!(
            CombatState::new(player(Stats::player_default()), vec![]),
            Err(SimError::InvalidState(_))
        ));
    }

    #[test]
    fn test_tick_counter_and_log() {
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(100)),
            vec![enemy(0, Stats::minimal().with_hp(100))],
        )
        .unwrap();
        let mut rng = SeededRng::new(1);
        let mut keystones = KeystoneState::new();

        let first = simulate_tick(&mut state, &mut rng, &SimConfig::default(), &mut keystones);
        assert_eq!(state.tick, 1);
        assert_eq!(state.events, first);
        assert!(first.iter().all(|e| e.tick == 1));
    }

    #[test]
    fn test_player_targets_first_living_enemy() {
        let mut first = enemy(0, Stats::minimal().with_hp(50));
        first.entity.dead = true;
        first.entity.death_reported = true;
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(100).with_attack(5)),
            vec![first, enemy(1, Stats::minimal().with_hp(50))],
        )
        .unwrap();

        run_ticks(&mut state, &mut SeededRng::new(3), &SimConfig::default(), 1);
        assert!(state.events.iter().any(|e| matches!(
            e.kind,
            CombatEventKind::Attack {
                target: EntityId(2),
                ..
            }
        )));
        assert_eq!(state.enemies[1].entity.stats.hp, Fixed::from_num(45));
    }

    #[test]
    fn test_attack_cadence_follows_attack_speed() {
        let config = SimConfig::default();
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(100).with_attack(1)),
            vec![enemy(0, Stats::minimal().with_hp(1000))],
        )
        .unwrap();

        // One attack per second at 60 tps: ticks 1, 61, 121.
        run_ticks(&mut state, &mut SeededRng::new(9), &config, 130);
        let attack_ticks: Vec<u64> = state
            .events
            .iter()
            .filter(|e| matches!(e.kind, CombatEventKind::Attack { attacker: EntityId(0), .. }))
            .map(|e| e.tick)
            .collect();
        assert_eq!(attack_ticks, vec![1, 61, 121]);
    }

    #[test]
    fn test_kill_reports_death_with_rewards_once() {
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(100).with_attack(50)),
            vec![enemy(0, Stats::minimal().with_hp(10))],
        )
        .unwrap();
        let winner = simulate_combat(&mut state, &mut SeededRng::new(5), &SimConfig::default());

        assert_eq!(winner, Winner::Player);
        let deaths: Vec<_> = state
            .events
            .iter()
            .filter_map(|e| match e.kind {
                CombatEventKind::Death {
                    entity,
                    killer,
                    xp_reward,
                    gold_reward,
                } => Some((entity, killer, xp_reward, gold_reward)),
                _ => None,
            })
            .collect();
        assert_eq!(deaths, vec![(EntityId(1), Some(EntityId(0)), 7, 3)]);
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn test_player_death_ends_combat() {
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(10)),
            vec![enemy(0, Stats::minimal().with_hp(100).with_attack(20))],
        )
        .unwrap();
        let winner = simulate_combat(&mut state, &mut SeededRng::new(5), &SimConfig::default());
        assert_eq!(winner, Winner::Enemies);
        assert!(state.player.entity.dead);
    }

    #[test]
    fn test_completed_combat_is_inert() {
        let mut state = CombatState::new(
            player(Stats::minimal().with_hp(100).with_attack(50)),
            vec![enemy(0, Stats::minimal().with_hp(10))],
        )
        .unwrap();
        let mut rng = SeededRng::new(5);
        simulate_combat(&mut state, &mut rng, &SimConfig::default());
        let snapshot = state.clone();
        let rng_state = rng.state();

        run_ticks(&mut state, &mut rng, &SimConfig::default(), 10);
        assert_eq!(state, snapshot);
        assert_eq!(rng.state(), rng_state);
    }

    #[test]
    fn test_dot_kill_before_attacks() {
        let config = SimConfig {
            bleed_interval_ticks: 1,
            ..SimConfig::default()
        };
        let mut target = enemy(0, Stats::minimal().with_hp(10).with_attack(100));
        target
            .entity
            .effects
            .apply(EffectApplication::bleed(EntityId::PLAYER, 2, Fixed::from_num(5), 60));
        let mut state = CombatState::new(player(Stats::minimal().with_hp(50)), vec![target]).unwrap();

        run_ticks(&mut state, &mut SeededRng::new(2), &config, 1);
        assert!(state.enemies[0].entity.dead);
        // The enemy died to its bleed in step 2, so it never attacked.
        assert_eq!(state.player.entity.stats.hp, Fixed::from_num(50));
        assert_eq!(state.winner(), Some(Winner::Player));
    }

    #[test]
    fn test_session_runs_to_completion() {
        let state = CombatState::new(
            player(Stats::player_default()),
            vec![enemy(0, Stats::minimal().with_hp(40).with_attack(3))],
        )
        .unwrap();
        let mut session = CombatSession::new(state, SeededRng::new(77), SimConfig::default());
        let winner = session.run_to_completion();
        assert_eq!(winner, Winner::Player);
        assert!(session.tick().is_empty());
        assert!(session.state().is_complete());
        assert_ne!(session.into_state().event_log_hash(), 0);
    }
}
