// Pairwise win probabilities keyed by (game id, team a, team b).

use std::collections::HashMap;

use thiserror::Error;

use crate::bracket::graph::BracketGraph;
use crate::registry::WinModel;

/// Tolerance for `P(a beats b) + P(b beats a) == 1`.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchupError {
    #[error("no win probability for `{team_a}` vs `{team_b}` in game `{game}`")]
    Missing {
        game: String,
        team_a: String,
        team_b: String,
    },

    #[error("win probability {probability} for `{team_a}` vs `{team_b}` in game `{game}` is outside [0, 1]")]
    OutOfRange {
        game: String,
        team_a: String,
        team_b: String,
        probability: f64,
    },

    #[error("win probabilities for `{team_a}` vs `{team_b}` in game `{game}` sum to {sum}, expected 1")]
    Asymmetric {
        game: String,
        team_a: String,
        team_b: String,
        sum: f64,
    },
}

/// Source of `P(team_a beats team_b)` for a specific game.
///
/// Implementations are shared read-only across simulation workers.
pub trait MatchupSource: Sync {
    fn win_probability(&self, game: &str, team_a: &str, team_b: &str) -> Option<f64>;
}

/// Look up a probability, turning gaps and out-of-range values into errors
/// that name the game and both teams.
pub fn resolve_probability<S: MatchupSource + ?Sized>(
    source: &S,
    game: &str,
    team_a: &str,
    team_b: &str,
) -> Result<f64, MatchupError> {
    let probability = source
        .win_probability(game, team_a, team_b)
        .ok_or_else(|| MatchupError::Missing {
            game: game.to_string(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
        })?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(MatchupError::OutOfRange {
            game: game.to_string(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            probability,
        });
    }
    Ok(probability)
}

// ---------------------------------------------------------------------------
// MatchupTable
// ---------------------------------------------------------------------------

/// In-memory probability table. Every insert stores both orderings.
#[derive(Debug, Clone, Default)]
pub struct MatchupTable {
    // game -> team_a -> team_b -> P(team_a beats team_b)
    games: HashMap<String, HashMap<String, HashMap<String, f64>>>,
    pairs: usize,
}

impl MatchupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `P(team_a beats team_b)` and its complement.
    ///
    /// Re-inserting a pair (in either order) must agree with what is already
    /// stored; a contradicting value is rejected.
    pub fn insert(
        &mut self,
        game: &str,
        team_a: &str,
        team_b: &str,
        probability: f64,
    ) -> Result<(), MatchupError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(MatchupError::OutOfRange {
                game: game.to_string(),
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
                probability,
            });
        }
        if let Some(reverse) = self.win_probability(game, team_b, team_a) {
            let sum = reverse + probability;
            if (sum - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(MatchupError::Asymmetric {
                    game: game.to_string(),
                    team_a: team_a.to_string(),
                    team_b: team_b.to_string(),
                    sum,
                });
            }
        } else {
            self.pairs += 1;
        }

        let by_team = self.games.entry(game.to_string()).or_default();
        by_team
            .entry(team_a.to_string())
            .or_default()
            .insert(team_b.to_string(), probability);
        by_team
            .entry(team_b.to_string())
            .or_default()
            .insert(team_a.to_string(), 1.0 - probability);
        Ok(())
    }

    /// Number of distinct unordered pairs stored.
    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Fill a table from a model for every pair that can meet in each game.
    pub fn from_model(graph: &BracketGraph, model: &dyn WinModel) -> Result<Self, MatchupError> {
        let mut table = MatchupTable::new();
        let occupants = graph.possible_occupants();
        for (game, [first, second]) in graph.games().iter().zip(&occupants) {
            for &a in first {
                for &b in second {
                    let team_a = graph.team(a);
                    let team_b = graph.team(b);
                    let probability = model.win_probability(game, team_a, team_b);
                    table.insert(&game.id, &team_a.id, &team_b.id, probability)?;
                }
            }
        }
        Ok(table)
    }
}

impl MatchupSource for MatchupTable {
    fn win_probability(&self, game: &str, team_a: &str, team_b: &str) -> Option<f64> {
        self.games.get(game)?.get(team_a)?.get(team_b).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_stores_both_orderings() {
        let mut table = MatchupTable::new();
        table.insert("g", "a", "b", 0.7).unwrap();
        assert_eq!(table.win_probability("g", "a", "b"), Some(0.7));
        let reverse = table.win_probability("g", "b", "a").unwrap();
        assert!((reverse - 0.3).abs() < 1e-12);
        assert_eq!(table.win_probability("other", "a", "b"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn consistent_reinsert_is_accepted() {
        let mut table = MatchupTable::new();
        table.insert("g", "a", "b", 0.25).unwrap();
        table.insert("g", "b", "a", 0.75).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn contradicting_reinsert_is_rejected() {
        let mut table = MatchupTable::new();
        table.insert("g", "a", "b", 0.25).unwrap();
        let err = table.insert("g", "b", "a", 0.5).unwrap_err();
        assert!(matches!(err, MatchupError::Asymmetric { .. }), "got {err:?}");
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut table = MatchupTable::new();
        let err = table.insert("g", "a", "b", 1.5).unwrap_err();
        assert!(matches!(err, MatchupError::OutOfRange { .. }), "got {err:?}");
        assert!(table.is_empty());
    }

    #[test]
    fn resolve_names_the_missing_pair() {
        let table = MatchupTable::new();
        let err = resolve_probability(&table, "east-round_of_64-1", "x", "y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "no win probability for `x` vs `y` in game `east-round_of_64-1`"
        );
    }
}
