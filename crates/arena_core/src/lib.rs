//! # Arena Core
//!
//! Deterministic combat and run simulation for a wave-based autobattler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO in simulation paths
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch runs
//! - Replay verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Tick engine and combat state
//! - [`combat`] - Damage, mitigation and attack resolution
//! - [`effects`] - Status effects and damage over time
//! - [`keystones`] - Build-defining player abilities
//! - [`run`] - Waves, rewards, leveling and choices
//! - [`data`] - Content record types
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod config;
pub mod data;
pub mod effects;
pub mod entity;
pub mod error;
pub mod events;
pub mod keystones;
pub mod math;
pub mod replay;
pub mod rng;
pub mod run;
pub mod simulation;
pub mod stats;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{resolve_attack, DamageOrigin, DamageType};
    pub use crate::config::SimConfig;
    pub use crate::data::ContentLibrary;
    pub use crate::effects::{EffectApplication, EffectGrant, StatusEffect, StatusTag};
    pub use crate::entity::{Enemy, Entity, EntityId, Player};
    pub use crate::error::{Result, SimError};
    pub use crate::events::{CombatEvent, CombatEventKind};
    pub use crate::keystones::{KeystoneId, KeystoneState};
    pub use crate::math::Fixed;
    pub use crate::replay::RunReplay;
    pub use crate::rng::SeededRng;
    pub use crate::run::{Choice, ChoiceKind, RunEvent, RunManager, RunPhase, RunState, RunSummary};
    pub use crate::simulation::{simulate_combat, simulate_tick, CombatSession, CombatState, Winner};
    pub use crate::stats::{StatModifiers, Stats};
}
