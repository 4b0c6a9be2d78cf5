// Configuration loading and parsing (tournament.toml, strategy.toml).

use calcutta_core::{BidConstraints, RegionPairing, ScoringRule, ScoringRules, TOURNAMENT_TEAMS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Files under `config/`, seeded from `defaults/` on first run.
pub const CONFIG_FILES: [&str; 2] = ["tournament.toml", "strategy.toml"];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub tournament: TournamentConfig,
    pub strategy: StrategyConfig,
    pub data_paths: DataPaths,
    pub output: OutputConfig,
    /// Directory the config was loaded from; relative data and output paths
    /// resolve against it.
    pub base_dir: PathBuf,
}

impl Config {
    /// Resolve a configured path against `base_dir` unless it is absolute.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output.dir)
    }
}

// ---------------------------------------------------------------------------
// tournament.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for tournament.toml.
#[derive(Debug, Clone, Deserialize)]
struct TournamentFile {
    tournament: TournamentSection,
    #[serde(default)]
    regions: RegionPairing,
    scoring: Vec<ScoringRule>,
}

#[derive(Debug, Clone, Deserialize)]
struct TournamentSection {
    name: String,
}

#[derive(Debug, Clone)]
pub struct TournamentConfig {
    pub name: String,
    pub pairing: RegionPairing,
    pub scoring: ScoringRules,
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    model: ModelConfig,
    simulation: SimulationSettings,
    optimizer: OptimizerSettings,
    data_paths: DataPaths,
    output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub model: ModelConfig,
    pub simulation: SimulationSettings,
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Registry name of the win model used when no matchup file is given.
    pub name: String,
    #[serde(default = "default_seed_scale")]
    pub seed_scale: f64,
}

fn default_seed_scale() -> f64 {
    calcutta_core::registry::DEFAULT_SEED_SCALE
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    pub count: usize,
    pub seed: u64,
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerSettings {
    pub budget: u32,
    pub min_teams: usize,
    pub max_teams: usize,
    pub min_bid: u32,
    pub max_bid: u32,
}

impl OptimizerSettings {
    pub fn constraints(&self) -> BidConstraints {
        BidConstraints {
            budget: self.budget,
            min_teams: self.min_teams,
            max_teams: self.max_teams,
            min_bid: self.min_bid,
            max_bid: self.max_bid,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub teams: String,
    /// Explicit matchup probabilities. When absent the configured model
    /// fills the table.
    #[serde(default)]
    pub matchups: Option<String>,
    /// Other participants' combined bids per team.
    #[serde(default)]
    pub market_bids: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/tournament.toml` and
/// `config/strategy.toml`, both relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let tournament_path = config_dir.join(CONFIG_FILES[0]);
    let tournament_text = read_file(&tournament_path)?;
    let tournament_file: TournamentFile =
        toml::from_str(&tournament_text).map_err(|e| ConfigError::ParseError {
            path: tournament_path.clone(),
            source: e,
        })?;
    let scoring =
        ScoringRules::new(tournament_file.scoring).map_err(|e| ConfigError::ValidationError {
            field: "scoring".into(),
            message: e.to_string(),
        })?;
    let tournament = TournamentConfig {
        name: tournament_file.tournament.name,
        pairing: tournament_file.regions,
        scoring,
    };

    let strategy_path = config_dir.join(CONFIG_FILES[1]);
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let config = Config {
        tournament,
        strategy: StrategyConfig {
            model: strategy_file.model,
            simulation: strategy_file.simulation,
            optimizer: strategy_file.optimizer,
        },
        data_paths: strategy_file.data_paths,
        output: strategy_file.output,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;

    Ok(config)
}

/// Copy any of `tournament.toml` / `strategy.toml` missing from `config/`
/// out of `defaults/`. Existing files are never touched. Returns the files
/// that were written, in `CONFIG_FILES` order.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let missing: Vec<&str> = CONFIG_FILES
        .iter()
        .copied()
        .filter(|name| !config_dir.join(name).exists())
        .collect();
    if missing.is_empty() {
        return Ok(vec![]);
    }
    if let Some(name) = missing.iter().find(|name| !defaults_dir.join(name).is_file()) {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "config/{name} is missing and there is no defaults/{name} to seed it from in {}",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    let mut copied = Vec::with_capacity(missing.len());
    for name in missing {
        let target = config_dir.join(name);
        std::fs::copy(defaults_dir.join(name), &target).map_err(|e| {
            ConfigError::DefaultsCopyError {
                message: format!("failed to seed {}: {e}", target.display()),
            }
        })?;
        copied.push(target);
    }
    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.tournament.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "tournament.name".into(),
            message: "must not be empty".into(),
        });
    }

    config
        .tournament
        .pairing
        .validate()
        .map_err(|e| ConfigError::ValidationError {
            field: "regions".into(),
            message: e.to_string(),
        })?;

    let model = &config.strategy.model;
    if model.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "model.name".into(),
            message: "must not be empty".into(),
        });
    }
    if !model.seed_scale.is_finite() || model.seed_scale <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "model.seed_scale".into(),
            message: format!("must be finite and > 0, got {}", model.seed_scale),
        });
    }

    let simulation = &config.strategy.simulation;
    let simulation_fields: &[(&str, usize)] = &[
        ("simulation.count", simulation.count),
        ("simulation.workers", simulation.workers),
    ];
    for (name, val) in simulation_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if config.strategy.optimizer.budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "optimizer.budget".into(),
            message: "must be greater than 0".into(),
        });
    }
    config
        .strategy
        .optimizer
        .constraints()
        .validate(TOURNAMENT_TEAMS)
        .map_err(|e| ConfigError::ValidationError {
            field: "optimizer".into(),
            message: e.to_string(),
        })?;

    let paths: &[(&str, &str)] = &[
        ("data_paths.teams", config.data_paths.teams.as_str()),
        ("output.dir", config.output.dir.as_str()),
    ];
    for (name, val) in paths {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
