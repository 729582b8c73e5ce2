//! End-to-end checks against the shipped content directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arena_core::config::SimConfig;
use arena_core::data::ContentLibrary;
use arena_core::replay::RunReplay;
use arena_headless::batch::{run_batch, verify_determinism, BatchConfig};
use arena_headless::content_loader::{
    load_content_dir, load_sim_config, ContentLoadError, ContentReport,
};
use arena_headless::policy::PolicyKind;
use arena_headless::runner::{run_single, RunConfig};

fn assets() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
}

fn shipped_content() -> Arc<ContentLibrary> {
    Arc::new(load_content_dir(&assets().join("content")).unwrap())
}

#[test]
fn shipped_content_is_valid() {
    let content = shipped_content();
    let report = ContentReport::from_library(&content);

    assert_eq!(report.waves, 10);
    assert_eq!(report.bosses, 2);
    assert!(report.skills >= 12);
    assert!(content.validate().is_empty());

    // Every branch ends in a keystone.
    let keystones = content.skills.iter().filter(|s| s.is_keystone()).count();
    assert_eq!(keystones, 3);
}

#[test]
fn shipped_sim_config_matches_defaults() {
    let config = load_sim_config(&assets().join("sim_config.ron")).unwrap();
    assert_eq!(config, SimConfig::default());
}

#[test]
fn every_relic_plays_to_the_end() {
    let content = shipped_content();
    for relic in content.relics.iter().map(|r| r.id.clone()) {
        let config = RunConfig::new(77).with_relic(Some(relic.clone()));
        let output = run_single(&content, &SimConfig::default(), &config).unwrap();
        let m = &output.metrics;

        assert_eq!(m.relic.as_deref(), Some(relic.as_str()));
        assert_eq!(m.max_waves, 10);
        assert!(m.waves_cleared <= 10);
        assert!(m.victory || m.death_wave == Some(m.waves_cleared + 1));
    }
}

#[test]
fn batch_over_shipped_content() {
    let content = shipped_content();
    let config = BatchConfig::new(24)
        .with_seed(1_000)
        .with_policy(PolicyKind::Seeded);
    let results = run_batch(&content, &SimConfig::default(), config);

    assert!(results.errors.is_empty(), "{:?}", results.errors);
    assert_eq!(results.summary.total_runs, 24);
    assert!(results.summary.victory_rate >= 0.0 && results.summary.victory_rate <= 1.0);
    assert!(results.summary.avg_waves_cleared <= 10.0);

    let events: u64 = results.runs.iter().map(|r| r.events_emitted).sum();
    assert_eq!(results.summary.total_events, events);
}

#[test]
fn seed_is_deterministic_over_shipped_content() {
    let content = shipped_content();
    let config = RunConfig::new(2_024).with_policy(PolicyKind::Seeded);
    let report = verify_determinism(&content, &SimConfig::default(), &config, 4).unwrap();
    assert!(report.deterministic, "{:?}", report.hashes);
}

#[test]
fn saved_replay_verifies() {
    let content = shipped_content();
    let config = RunConfig::new(31)
        .with_relic(Some("fang_necklace".into()))
        .with_policy(PolicyKind::Seeded);
    let output = run_single(&content, &SimConfig::default(), &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run31.replay");
    output.replay.save(&path).unwrap();

    let loaded = RunReplay::load(&path).unwrap();
    assert_eq!(loaded, output.replay);
    let summary = loaded.verify(content, SimConfig::default()).unwrap();
    assert_eq!(summary.event_log_hash, output.metrics.event_log_hash);
}

#[test]
fn broken_copy_of_content_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    for entry in fs::read_dir(assets().join("content")).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
    }
    // Drop the bosses both boss waves reference.
    fs::write(dir.path().join("bosses.ron"), "(bosses: [])").unwrap();

    let Err(ContentLoadError::Validation(errors)) = load_content_dir(dir.path()) else {
        panic!("expected validation failure");
    };
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("warden")));
    assert!(errors.iter().any(|e| e.contains("blood_queen")));
}
