// Integration tests for the calcutta app.
//
// Each test stages a throwaway project directory (config/ copied from
// defaults/, data/ copied from the bundled field), runs the pipeline through
// the public API, and inspects the files it wrote.

use std::fs;
use std::path::{Path, PathBuf};

use calcutta_app::config::{ensure_config_files, load_config_from, Config};
use calcutta_app::pipeline;
use calcutta_core::registry::DEFAULT_SEED_SCALE;
use calcutta_core::{build_bracket, ModelRegistry, RegionPairing};

// ===========================================================================
// Test helpers
// ===========================================================================

fn crate_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Stage a project directory with defaults and data, and trim the
/// simulation count so the run stays fast.
fn stage(name: &str) -> PathBuf {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    let root = crate_root();

    fs::create_dir_all(tmp.join("defaults")).unwrap();
    for file in ["tournament.toml", "strategy.toml"] {
        fs::copy(root.join("defaults").join(file), tmp.join("defaults").join(file)).unwrap();
    }
    fs::create_dir_all(tmp.join("data")).unwrap();
    for file in ["teams.csv", "market_bids.csv"] {
        fs::copy(root.join("data").join(file), tmp.join("data").join(file)).unwrap();
    }

    let copied = ensure_config_files(&tmp).unwrap();
    assert_eq!(copied.len(), 2);
    patch(&tmp, "count = 10000", "count = 400");
    tmp
}

fn patch(tmp: &Path, from: &str, to: &str) {
    let path = tmp.join("config/strategy.toml");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains(from), "strategy.toml has no `{from}`");
    fs::write(&path, text.replace(from, to)).unwrap();
}

fn load(tmp: &Path) -> Config {
    load_config_from(tmp).expect("staged config should load")
}

fn registry(config: &Config) -> ModelRegistry {
    ModelRegistry::with_defaults(config.strategy.model.seed_scale)
}

fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

// ===========================================================================
// Pipeline
// ===========================================================================

#[test]
fn default_run_writes_every_export() {
    let tmp = stage("calcutta_it_default_run");
    let config = load(&tmp);
    let report = pipeline::run(&config, &registry(&config)).expect("pipeline should run");

    assert_eq!(report.graph.teams().len(), 68);
    assert_eq!(report.graph.games().len(), 67);
    assert_eq!(report.batch.simulations(), 400);
    assert_eq!(report.allocation.total_spent(), 100);
    let selected = report.allocation.selected().count();
    assert!((3..=10).contains(&selected), "selected {selected} teams");

    for path in &report.outputs {
        assert!(path.exists(), "{} was not written", path.display());
    }
    let out = tmp.join("output");
    assert_eq!(csv_rows(&out.join("outlook.csv")).len(), 68);
    assert_eq!(csv_rows(&out.join("simulations.csv")).len(), 400 * 68);
    assert_eq!(csv_rows(&out.join("bids.csv")).len(), 68);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["tournament"], "Office Calcutta");
    assert_eq!(summary["matchup_source"], "seed_logistic");
    assert_eq!(summary["total_spent"], 100);
    assert_eq!(summary["bids"].as_array().unwrap().len(), selected);
    // Mirrored seeds across regions: the favorites are the four 1 seeds.
    let top_seed = summary["favorites"][0]["seed"].as_u64().unwrap();
    assert_eq!(top_seed, 1);

    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn runs_are_reproducible() {
    let tmp = stage("calcutta_it_reproducible");
    let config = load(&tmp);
    let first = pipeline::run(&config, &registry(&config)).unwrap();
    patch(&tmp, "workers = 4", "workers = 1");
    let config = load(&tmp);
    let second = pipeline::run(&config, &registry(&config)).unwrap();

    assert_eq!(first.batch, second.batch);
    assert_eq!(first.allocation, second.allocation);
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn matchup_file_overrides_the_model() {
    let tmp = stage("calcutta_it_matchup_file");

    // Coin-flip table for every pair that can meet.
    let config = load(&tmp);
    let teams = calcutta_app::ingest::load_teams(&config.resolve("data/teams.csv")).unwrap();
    let graph = build_bracket(teams, &RegionPairing::default()).unwrap();
    let mut writer = csv::Writer::from_path(tmp.join("data/matchups.csv")).unwrap();
    writer.write_record(["game_id", "team_a", "team_b", "probability"]).unwrap();
    for (game, [first, second]) in graph.games().iter().zip(graph.possible_occupants()) {
        for &a in &first {
            for &b in &second {
                writer
                    .write_record([
                        game.id.as_str(),
                        graph.team(a).id.as_str(),
                        graph.team(b).id.as_str(),
                        "0.5",
                    ])
                    .unwrap();
            }
        }
    }
    writer.flush().unwrap();
    drop(writer);

    patch(&tmp, "# matchups = \"data/matchups.csv\"", "matchups = \"data/matchups.csv\"");
    let config = load(&tmp);
    assert!(config.data_paths.matchups.is_some());
    let report = pipeline::run(&config, &registry(&config)).unwrap();
    assert_eq!(report.summary.matchup_source, "table");

    for (index, team) in report.graph.teams().iter().enumerate() {
        let expected = if report.graph.byes(index) == 1 { 1.0 / 64.0 } else { 1.0 / 128.0 };
        let actual = report.propagation.champion_probability(index);
        assert!(
            (actual - expected).abs() < 1e-12,
            "{}: title odds {actual}, expected {expected}",
            team.id
        );
    }
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn missing_market_file_is_an_error() {
    let tmp = stage("calcutta_it_missing_market");
    fs::remove_file(tmp.join("data/market_bids.csv")).unwrap();
    let config = load(&tmp);
    let err = pipeline::run(&config, &registry(&config)).unwrap_err();
    assert!(
        format!("{err:#}").contains("market bids"),
        "unexpected error: {err:#}"
    );
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn unknown_model_is_reported() {
    let tmp = stage("calcutta_it_unknown_model");
    patch(&tmp, "name = \"seed_logistic\"", "name = \"elo\"");
    let config = load(&tmp);
    let err = pipeline::run(&config, &registry(&config)).unwrap_err();
    assert!(
        err.to_string().contains("unknown win model `elo`"),
        "unexpected error: {err:#}"
    );
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn short_field_fails_bracket_build() {
    let tmp = stage("calcutta_it_short_field");
    let teams_path = tmp.join("data/teams.csv");
    let text = fs::read_to_string(&teams_path).unwrap();
    let trimmed: Vec<&str> = text.lines().take(60).collect();
    fs::write(&teams_path, trimmed.join("\n")).unwrap();

    let config = load(&tmp);
    let err = pipeline::run(&config, &registry(&config)).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failed to build bracket"), "unexpected error: {message}");
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn default_registry_matches_configured_scale() {
    let tmp = stage("calcutta_it_scale");
    let config = load(&tmp);
    assert!((config.strategy.model.seed_scale - DEFAULT_SEED_SCALE).abs() < f64::EPSILON);
    let _ = fs::remove_dir_all(&tmp);
}
