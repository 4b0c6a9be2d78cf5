// CSV ingest for the team field, matchup probabilities, and market bids.
//
// Rows that fail to parse or carry unusable values are logged and skipped;
// structural problems (wrong team count, duplicate ids) surface later from
// the bracket builder with a precise error.

use calcutta_core::{MatchupTable, Team};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: String,
    seed: u8,
    region: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMatchup {
    game_id: String,
    team_a: String,
    team_b: String,
    probability: f64,
}

#[derive(Debug, Deserialize)]
struct RawMarketBid {
    team_id: String,
    bid: f64,
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<Team>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut teams = Vec::new();
    for result in reader.deserialize::<RawTeam>() {
        match result {
            Ok(raw) => {
                if raw.id.is_empty() || raw.region.is_empty() {
                    warn!("skipping team row with empty id or region: {:?}", raw);
                    continue;
                }
                let name = if raw.name.is_empty() { raw.id.clone() } else { raw.name };
                teams.push(Team::new(raw.id, raw.seed, raw.region, name));
            }
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
            }
        }
    }
    Ok(teams)
}

fn load_matchups_from_reader<R: Read>(rdr: R) -> Result<MatchupTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut table = MatchupTable::new();
    for result in reader.deserialize::<RawMatchup>() {
        match result {
            Ok(raw) => {
                if let Err(e) = table.insert(&raw.game_id, &raw.team_a, &raw.team_b, raw.probability) {
                    warn!("skipping matchup row: {}", e);
                }
            }
            Err(e) => {
                warn!("skipping malformed matchup row: {}", e);
            }
        }
    }
    Ok(table)
}

fn load_market_bids_from_reader<R: Read>(rdr: R) -> Result<HashMap<String, f64>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut bids = HashMap::new();
    for result in reader.deserialize::<RawMarketBid>() {
        match result {
            Ok(raw) => {
                if !raw.bid.is_finite() || raw.bid < 0.0 {
                    warn!("skipping market bid for '{}': {} is not a valid amount", raw.team_id, raw.bid);
                    continue;
                }
                if bids.contains_key(&raw.team_id) {
                    warn!("duplicate market bid for '{}', using latest value", raw.team_id);
                }
                bids.insert(raw.team_id, raw.bid);
            }
            Err(e) => {
                warn!("skipping malformed market bid row: {}", e);
            }
        }
    }
    Ok(bids)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, IngestError> {
    std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> IngestError + '_ {
    move |e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Load the team field (`id,seed,region,name`).
pub fn load_teams(path: &Path) -> Result<Vec<Team>, IngestError> {
    let teams = load_teams_from_reader(open(path)?).map_err(csv_error(path))?;
    if teams.is_empty() {
        return Err(IngestError::Validation(format!(
            "{} produced zero valid team rows",
            path.display()
        )));
    }
    Ok(teams)
}

/// Load explicit matchup probabilities (`game_id,team_a,team_b,probability`).
pub fn load_matchups(path: &Path) -> Result<MatchupTable, IngestError> {
    let table = load_matchups_from_reader(open(path)?).map_err(csv_error(path))?;
    if table.is_empty() {
        return Err(IngestError::Validation(format!(
            "{} produced zero valid matchup rows",
            path.display()
        )));
    }
    Ok(table)
}

/// Load other participants' combined bids (`team_id,bid`).
pub fn load_market_bids(path: &Path) -> Result<HashMap<String, f64>, IngestError> {
    load_market_bids_from_reader(open(path)?).map_err(csv_error(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
