// CSV and JSON export of engine outputs.

use calcutta_core::{BidAllocation, BracketGraph, Propagation, Round, SimulationBatch};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error writing {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

/// One team's analytic outlook. Round columns hold the probability of
/// playing in that round.
#[derive(Debug, Serialize)]
struct OutlookRow<'a> {
    team_id: &'a str,
    name: &'a str,
    seed: u8,
    region: &'a str,
    byes: u32,
    first_four: f64,
    round_of_64: f64,
    round_of_32: f64,
    sweet_16: f64,
    elite_8: f64,
    final_four: f64,
    championship: f64,
    champion: f64,
    expected_points: f64,
}

#[derive(Debug, Serialize)]
struct SimulationRow<'a> {
    simulation: usize,
    team_id: &'a str,
    wins: u32,
    byes: u32,
    eliminated: bool,
}

#[derive(Debug, Serialize)]
struct BidRow<'a> {
    team_id: &'a str,
    predicted_points: f64,
    baseline_bid: f64,
    bid: u32,
    ownership: f64,
    expected_return: f64,
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, ExportError> {
    csv::Writer::from_path(path).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> ExportError + '_ {
    move |e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

fn flush(mut writer: csv::Writer<std::fs::File>, path: &Path) -> Result<(), ExportError> {
    writer.flush().map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// `outlook.csv`: one row per team in graph order.
pub fn write_outlook(path: &Path, graph: &BracketGraph, propagation: &Propagation) -> Result<(), ExportError> {
    let mut writer = csv_writer(path)?;
    for (team, outlook) in graph.teams().iter().zip(propagation.outlooks()) {
        let reach = |round| outlook.round_probability(round);
        writer
            .serialize(OutlookRow {
                team_id: &team.id,
                name: &team.name,
                seed: team.seed,
                region: &team.region,
                byes: outlook.byes,
                first_four: reach(Round::FirstFour),
                round_of_64: reach(Round::RoundOf64),
                round_of_32: reach(Round::RoundOf32),
                sweet_16: reach(Round::Sweet16),
                elite_8: reach(Round::Elite8),
                final_four: reach(Round::FinalFour),
                championship: reach(Round::Championship),
                champion: outlook.champion,
                expected_points: outlook.expected_points,
            })
            .map_err(csv_err(path))?;
    }
    flush(writer, path)
}

/// `simulations.csv`: one row per (simulation, team).
pub fn write_simulations(path: &Path, graph: &BracketGraph, batch: &SimulationBatch) -> Result<(), ExportError> {
    let mut writer = csv_writer(path)?;
    let teams = graph.teams();
    for (simulation, team, result) in batch.rows() {
        writer
            .serialize(SimulationRow {
                simulation,
                team_id: &teams[team].id,
                wins: result.wins,
                byes: result.byes,
                eliminated: result.eliminated,
            })
            .map_err(csv_err(path))?;
    }
    flush(writer, path)
}

/// `bids.csv`: every candidate in input order, selected or not.
pub fn write_bids(path: &Path, allocation: &BidAllocation) -> Result<(), ExportError> {
    let mut writer = csv_writer(path)?;
    for candidate in &allocation.candidates {
        writer
            .serialize(BidRow {
                team_id: &candidate.team_id,
                predicted_points: candidate.predicted_points,
                baseline_bid: candidate.baseline_bid,
                bid: candidate.bid,
                ownership: candidate.ownership(),
                expected_return: candidate.expected_return(),
            })
            .map_err(csv_err(path))?;
    }
    flush(writer, path)
}

/// Pretty-printed JSON of any serializable report.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| ExportError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    std::io::Write::flush(&mut writer).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcutta_core::{optimize_bids, BidCandidate, BidConstraints};
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bids_csv_lists_every_candidate() {
        let dir = temp_dir("calcutta_export_bids");
        let candidates = vec![
            BidCandidate::new("a", 40.0, 10.0),
            BidCandidate::new("b", 5.0, 50.0),
        ];
        let constraints = BidConstraints {
            budget: 10,
            min_teams: 1,
            max_teams: 1,
            min_bid: 1,
            max_bid: 10,
        };
        let allocation = optimize_bids(&candidates, &constraints).unwrap();
        let path = dir.join("bids.csv");
        write_bids(&path, &allocation).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "team_id,predicted_points,baseline_bid,bid,ownership,expected_return"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("a,40.0,10.0,10,0.5,20.0"), "got {}", lines[1]);
        assert!(lines[2].starts_with("b,5.0,50.0,0,0.0,0.0"), "got {}", lines[2]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn json_report_is_pretty_printed() {
        let dir = temp_dir("calcutta_export_json");
        let path = dir.join("summary.json");
        #[derive(Serialize)]
        struct Report {
            name: &'static str,
            spent: u32,
        }
        write_json(&path, &Report { name: "pool", spent: 100 }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "pool");
        assert_eq!(value["spent"], 100);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_path_reports_the_file() {
        let path = std::env::temp_dir()
            .join("calcutta_export_missing_dir")
            .join("nested")
            .join("summary.json");
        let err = write_json(&path, &1u32).unwrap_err();
        match err {
            ExportError::Io { path, .. } => assert!(path.ends_with("summary.json")),
            other => panic!("expected Io, got: {other}"),
        }
    }
}
