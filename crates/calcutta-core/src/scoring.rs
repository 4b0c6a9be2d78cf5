// Scoring rules: points earned for tournament progress.
//
// Progress is wins + byes. Each row awards its points once a team's progress
// reaches the row's threshold, so a team's total is the sum over every row it
// has cleared.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("scoring table is empty")]
    Empty,

    #[error("scoring thresholds must be strictly increasing: {previous} then {threshold}")]
    UnorderedThreshold { previous: u32, threshold: u32 },

    #[error("points for threshold {threshold} must be finite and >= 0, got {points}")]
    InvalidPoints { threshold: u32, points: f64 },
}

/// One row of the scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    /// Progress (wins + byes) needed to earn the points.
    pub threshold: u32,
    pub points: f64,
}

/// Validated, threshold-ordered scoring table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    rows: Vec<ScoringRule>,
}

impl ScoringRules {
    pub fn new(rows: Vec<ScoringRule>) -> Result<Self, ScoringError> {
        if rows.is_empty() {
            return Err(ScoringError::Empty);
        }
        for (i, row) in rows.iter().enumerate() {
            if !row.points.is_finite() || row.points < 0.0 {
                return Err(ScoringError::InvalidPoints {
                    threshold: row.threshold,
                    points: row.points,
                });
            }
            if i > 0 && rows[i - 1].threshold >= row.threshold {
                return Err(ScoringError::UnorderedThreshold {
                    previous: rows[i - 1].threshold,
                    threshold: row.threshold,
                });
            }
        }
        Ok(ScoringRules { rows })
    }

    pub fn rows(&self) -> &[ScoringRule] {
        &self.rows
    }

    /// Total points for a team that reached `progress`.
    pub fn points_for_progress(&self, progress: u32) -> f64 {
        self.rows
            .iter()
            .take_while(|row| row.threshold <= progress)
            .map(|row| row.points)
            .sum()
    }

    /// Points earned by winning everything.
    pub fn max_points(&self) -> f64 {
        self.rows.iter().map(|row| row.points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ScoringRules {
        ScoringRules::new(vec![
            ScoringRule { threshold: 2, points: 1.0 },
            ScoringRule { threshold: 3, points: 2.0 },
            ScoringRule { threshold: 4, points: 4.0 },
        ])
        .unwrap()
    }

    #[test]
    fn points_accumulate_over_cleared_rows() {
        let rules = rules();
        assert_eq!(rules.points_for_progress(0), 0.0);
        assert_eq!(rules.points_for_progress(1), 0.0);
        assert_eq!(rules.points_for_progress(2), 1.0);
        assert_eq!(rules.points_for_progress(3), 3.0);
        assert_eq!(rules.points_for_progress(10), 7.0);
        assert_eq!(rules.max_points(), 7.0);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let err = ScoringRules::new(vec![
            ScoringRule { threshold: 3, points: 1.0 },
            ScoringRule { threshold: 3, points: 1.0 },
        ])
        .unwrap_err();
        assert_eq!(err, ScoringError::UnorderedThreshold { previous: 3, threshold: 3 });
    }

    #[test]
    fn rejects_negative_points() {
        let err = ScoringRules::new(vec![ScoringRule { threshold: 1, points: -1.0 }]).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidPoints { threshold: 1, .. }));
    }

    #[test]
    fn rejects_empty_table() {
        assert_eq!(ScoringRules::new(vec![]).unwrap_err(), ScoringError::Empty);
    }
}
