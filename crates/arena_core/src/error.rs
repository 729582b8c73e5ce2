//! Error types for the autobattler simulation.
//!
//! Only construction-time operations fail. Once a wave is running, ticks
//! clamp out-of-range values and skip unmet preconditions instead.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// Content failed validation.
    #[error("Invalid content: {}", .0.join("; "))]
    InvalidContent(Vec<String>),

    /// Wave definition not found.
    #[error("Wave {0} is not defined")]
    UnknownWave(u32),

    /// A wave resolved to zero enemies.
    #[error("Wave {0} has no enemies")]
    EmptyWave(u32),

    /// Enemy template not found.
    #[error("Unknown enemy template: {0}")]
    UnknownEnemy(String),

    /// Boss template not found.
    #[error("Unknown boss template: {0}")]
    UnknownBoss(String),

    /// Relic not found.
    #[error("Unknown relic: {0}")]
    UnknownRelic(String),

    /// Skill, perk or item referenced by a replay or save is missing.
    #[error("Unknown {kind} '{id}'")]
    UnknownRecord {
        /// Record family (skill, perk, item).
        kind: &'static str,
        /// Record identifier.
        id: String,
    },

    /// Invalid run state.
    #[error("Invalid run state: {0}")]
    InvalidState(String),

    /// Encoding or decoding a persisted state failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Replay verification failed.
    #[error("Replay diverged: expected hash {expected:#x}, got {actual:#x}")]
    ReplayDiverged {
        /// Hash recorded in the replay.
        expected: u64,
        /// Hash produced by re-running.
        actual: u64,
    },
}
