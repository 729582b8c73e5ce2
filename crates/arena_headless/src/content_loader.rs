//! Content loading for headless runs.
//!
//! Content is authored as RON files, one record family per file, under a
//! content directory:
//!
//! ```text
//! assets/content/
//!   skills.ron    (skills: [SkillData(..), ..])
//!   perks.ron     (perks: [..])
//!   waves.ron     (waves: [..])
//!   ...
//! ```
//!
//! Every file deserializes as a partial [`ContentLibrary`]; the pieces are
//! merged in file-name order and validated once. Loading fails fast: the
//! first unreadable or malformed file aborts, and validation reports every
//! problem at once.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use serde::Serialize;
use thiserror::Error;

/// Environment variable overriding the content directory.
pub const CONTENT_DIR_ENV: &str = "ARENA_CONTENT_DIR";

/// Errors that can occur while loading content or configuration.
#[derive(Error, Debug)]
pub enum ContentLoadError {
    /// Content directory does not exist.
    #[error("Content directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Failed to read a file or directory.
    #[error("IO error reading '{}': {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON.
    #[error("Parse error in '{}': {source}", path.display())]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error, with line and column.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Parsed data is unusable.
    #[error("Validation failed with {} error(s):\n  {}", .0.len(), .0.join("\n  "))]
    Validation(Vec<String>),
}

impl ContentLoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Record counts of a loaded library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentReport {
    /// Skill tree nodes.
    pub skills: usize,
    /// Perks.
    pub perks: usize,
    /// Items.
    pub items: usize,
    /// Starting relics.
    pub relics: usize,
    /// Enemy templates.
    pub enemies: usize,
    /// Boss templates.
    pub bosses: usize,
    /// Elite affixes.
    pub affixes: usize,
    /// Waves.
    pub waves: usize,
}

impl ContentReport {
    /// Count the records in `content`.
    #[must_use]
    pub fn from_library(content: &ContentLibrary) -> Self {
        Self {
            skills: content.skills.len(),
            perks: content.perks.len(),
            items: content.items.len(),
            relics: content.relics.len(),
            enemies: content.enemies.len(),
            bosses: content.bosses.len(),
            affixes: content.affixes.len(),
            waves: content.waves.len(),
        }
    }

    /// Total records of every family.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.skills
            + self.perks
            + self.items
            + self.relics
            + self.enemies
            + self.bosses
            + self.affixes
            + self.waves
    }
}

/// Parse one RON file as a partial library. No validation.
pub fn load_content_file(path: &Path) -> Result<ContentLibrary, ContentLoadError> {
    let text = fs::read_to_string(path).map_err(|e| ContentLoadError::io(path, e))?;
    ron::from_str(&text).map_err(|source| ContentLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate every `.ron` file in `dir`.
///
/// Files are merged in file-name order so the resulting library, and every
/// run built on it, does not depend on directory iteration order. Other
/// files are skipped with a warning.
pub fn load_content_dir(dir: &Path) -> Result<ContentLibrary, ContentLoadError> {
    if !dir.is_dir() {
        return Err(ContentLoadError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ContentLoadError::io(dir, e))? {
        let path = entry.map_err(|e| ContentLoadError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(path);
        } else {
            tracing::warn!(path = %path.display(), "Skipping non-RON file in content directory");
        }
    }
    paths.sort();

    let mut library = ContentLibrary::default();
    for path in &paths {
        let piece = load_content_file(path)?;
        tracing::debug!(
            path = %path.display(),
            records = ContentReport::from_library(&piece).total(),
            "Loaded content file"
        );
        library.extend(piece);
    }

    let errors = library.validate();
    if !errors.is_empty() {
        return Err(ContentLoadError::Validation(errors));
    }

    tracing::info!(
        dir = %dir.display(),
        files = paths.len(),
        waves = library.waves.len(),
        "Content loaded"
    );
    Ok(library)
}

/// Resolve the default content directory.
///
/// Looks in order at:
/// 1. Environment variable `ARENA_CONTENT_DIR`
/// 2. `./crates/arena_headless/assets/content/` (repo root)
/// 3. `./assets/content/` (running from arena_headless)
/// 4. The directory shipped next to this crate's manifest
pub fn default_content_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONTENT_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
        tracing::warn!(path = %path.display(), "{CONTENT_DIR_ENV} is not a directory, ignoring");
    }

    let candidates = [
        PathBuf::from("crates/arena_headless/assets/content"),
        PathBuf::from("assets/content"),
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/content"),
    ];

    candidates.into_iter().find(|path| path.is_dir())
}

/// Load content from `dir`, or from the default directory when `None`.
pub fn load_content(dir: Option<&Path>) -> Result<Arc<ContentLibrary>, ContentLoadError> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => default_content_dir()
            .ok_or_else(|| ContentLoadError::DirectoryNotFound(PathBuf::from("assets/content")))?,
    };
    load_content_dir(&dir).map(Arc::new)
}

/// Load a [`SimConfig`] from a RON file and validate it.
///
/// Omitted fields keep their defaults.
pub fn load_sim_config(path: &Path) -> Result<SimConfig, ContentLoadError> {
    let text = fs::read_to_string(path).map_err(|e| ContentLoadError::io(path, e))?;
    let config: SimConfig = ron::from_str(&text).map_err(|source| ContentLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let errors = config.validate();
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ContentLoadError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIME_WAVE: &str = r#"(
        enemies: [
            (id: "slime", name: "Slime", stats: (max_hp: 30.0, attack: 4.0, attack_speed: 1.0)),
        ],
        waves: [
            (number: 1, name: "Ooze", enemies: [(template: "slime", count: 2)], rewards: (xp: 20, gold: 5)),
        ],
    )"#;

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn test_load_directory_merges_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a_combat.ron", SLIME_WAVE);
        write(
            dir.path(),
            "b_perks.ron",
            r#"(perks: [(id: "vigor", name: "Vigor", modifiers: (max_hp: 25.0))])"#,
        );
        write(dir.path(), "README.md", "not content");

        let library = load_content_dir(dir.path()).unwrap();
        let report = ContentReport::from_library(&library);
        assert_eq!(report.enemies, 1);
        assert_eq!(report.perks, 1);
        assert_eq!(report.waves, 1);
        assert_eq!(report.total(), 3);
        assert_eq!(library.waves[0].enemy_count(), 2);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            load_content_dir(&missing),
            Err(ContentLoadError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.ron", "(waves: [(number: ])");

        let err = load_content_dir(dir.path()).unwrap_err();
        match &err {
            ContentLoadError::Parse { path, .. } => assert!(path.ends_with("broken.ron")),
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn test_validation_lists_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "waves.ron",
            r#"(waves: [
                (number: 1, name: "Ghosts", enemies: [(template: "ghost")], rewards: (xp: 1, gold: 1)),
                (number: 3, name: "Gap", enemies: [(template: "slime")], rewards: (xp: 1, gold: 1)),
            ])"#,
        );

        let Err(ContentLoadError::Validation(errors)) = load_content_dir(dir.path()) else {
            panic!("expected validation failure");
        };
        assert!(errors.len() >= 3, "{errors:?}");
    }

    #[test]
    fn test_load_sim_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.ron");
        fs::write(&path, "SimConfig(max_ticks_per_wave: 1200, item_pity_waves: 4)").unwrap();

        let config = load_sim_config(&path).unwrap();
        assert_eq!(config.max_ticks_per_wave, 1200);
        assert_eq!(config.item_pity_waves, 4);
        assert_eq!(config.ticks_per_second, SimConfig::default().ticks_per_second);
    }

    #[test]
    fn test_load_sim_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.ron");
        fs::write(&path, "(ticks_per_second: 0)").unwrap();

        assert!(matches!(
            load_sim_config(&path),
            Err(ContentLoadError::Validation(_))
        ));
    }
}
