// Budget-constrained bid allocation.
//
// A bid of `x` on a team whose other owners have already staked `baseline`
// buys an ownership share of x / (baseline + x), so the expected return from
// that team is points * x / (baseline + x). The payoff is concave in the bid,
// and every team draws on one shared budget inside a team-count window, so the
// allocation is solved exactly with a dynamic program over
// (teams processed, teams selected, budget spent).

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on DP states, (teams + 1) x (selected + 1) x (budget + 1).
pub const MAX_TABLE_CELLS: usize = 1 << 25;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    #[error("invalid bid constraints: {0}")]
    InvalidConstraints(String),

    #[error("infeasible bounds: {0}")]
    Infeasible(String),

    #[error("invalid candidate `{team_id}`: {message}")]
    InvalidCandidate { team_id: String, message: String },

    #[error("no allocation spends exactly {budget} within the team and bid bounds")]
    NoFeasibleAllocation { budget: u32 },
}

/// A team the optimizer may bid on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidCandidate {
    pub team_id: String,
    pub predicted_points: f64,
    /// Combined stake of the other participants already on this team.
    pub baseline_bid: f64,
    /// Chosen bid; 0 means not selected.
    pub bid: u32,
}

impl BidCandidate {
    pub fn new(team_id: impl Into<String>, predicted_points: f64, baseline_bid: f64) -> Self {
        BidCandidate {
            team_id: team_id.into(),
            predicted_points,
            baseline_bid,
            bid: 0,
        }
    }

    /// Fraction of the team owned at the chosen bid.
    pub fn ownership(&self) -> f64 {
        ownership(self.baseline_bid, self.bid)
    }

    /// Expected points returned at the chosen bid.
    pub fn expected_return(&self) -> f64 {
        self.predicted_points * self.ownership()
    }
}

fn ownership(baseline: f64, bid: u32) -> f64 {
    if bid == 0 {
        return 0.0;
    }
    let bid = f64::from(bid);
    bid / (baseline + bid)
}

/// Budget and bound settings. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidConstraints {
    pub budget: u32,
    pub min_teams: usize,
    pub max_teams: usize,
    /// Applies to selected teams only; must be at least 1.
    pub min_bid: u32,
    pub max_bid: u32,
}

impl BidConstraints {
    /// Check the bounds against each other and against `candidates` teams.
    pub fn validate(&self, candidates: usize) -> Result<(), OptimizerError> {
        if self.min_bid == 0 {
            return Err(OptimizerError::InvalidConstraints(
                "min_bid must be at least 1".into(),
            ));
        }
        if self.min_bid > self.max_bid {
            return Err(OptimizerError::InvalidConstraints(format!(
                "min_bid {} exceeds max_bid {}",
                self.min_bid, self.max_bid
            )));
        }
        if self.min_teams > self.max_teams {
            return Err(OptimizerError::InvalidConstraints(format!(
                "min_teams {} exceeds max_teams {}",
                self.min_teams, self.max_teams
            )));
        }
        if self.min_teams > candidates {
            return Err(OptimizerError::Infeasible(format!(
                "min_teams {} exceeds the {candidates} available teams",
                self.min_teams
            )));
        }
        let budget = u64::from(self.budget);
        let floor = self.min_teams as u64 * u64::from(self.min_bid);
        if budget < floor {
            return Err(OptimizerError::Infeasible(format!(
                "budget {budget} is below min_teams x min_bid = {floor}"
            )));
        }
        let ceiling = self.max_teams as u64 * u64::from(self.max_bid);
        if budget > ceiling {
            return Err(OptimizerError::Infeasible(format!(
                "budget {budget} exceeds max_teams x max_bid = {ceiling}"
            )));
        }
        let cells = table_cells(candidates, self.max_teams.min(candidates), self.budget);
        match cells {
            Some(cells) if cells <= MAX_TABLE_CELLS => Ok(()),
            _ => Err(OptimizerError::InvalidConstraints(format!(
                "budget {} over {candidates} teams needs more than {MAX_TABLE_CELLS} table cells",
                self.budget
            ))),
        }
    }
}

/// Optimizer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidAllocation {
    /// Input candidates in input order with `bid` filled in.
    pub candidates: Vec<BidCandidate>,
    pub expected_return: f64,
}

impl BidAllocation {
    pub fn total_spent(&self) -> u64 {
        self.candidates.iter().map(|c| u64::from(c.bid)).sum()
    }

    pub fn selected(&self) -> impl Iterator<Item = &BidCandidate> + '_ {
        self.candidates.iter().filter(|c| c.bid > 0)
    }

    pub fn bids(&self) -> Vec<u32> {
        self.candidates.iter().map(|c| c.bid).collect()
    }
}

// ---------------------------------------------------------------------------
// Dynamic program
// ---------------------------------------------------------------------------

/// Flat (teams + 1) x (max_selected + 1) x (budget + 1) table.
struct Layers {
    selected: usize,
    budget: usize,
}

fn table_cells(teams: usize, selected: usize, budget: u32) -> Option<usize> {
    (teams + 1)
        .checked_mul(selected + 1)?
        .checked_mul(usize::try_from(budget).ok()?.checked_add(1)?)
}

impl Layers {
    fn at(&self, team: usize, selected: usize, spent: usize) -> usize {
        (team * (self.selected + 1) + selected) * (self.budget + 1) + spent
    }
}

/// Choose integer bids maximizing total expected return.
///
/// The result spends exactly `budget`, selects between `min_teams` and
/// `max_teams` teams, and keeps every selected bid in `[min_bid, max_bid]`.
/// Ties keep the first transition found in scan order (teams in input order,
/// skip before bid, smaller bids first), so the output is deterministic.
pub fn optimize_bids(
    candidates: &[BidCandidate],
    constraints: &BidConstraints,
) -> Result<BidAllocation, OptimizerError> {
    constraints.validate(candidates.len())?;
    for candidate in candidates {
        if !candidate.predicted_points.is_finite() {
            return Err(OptimizerError::InvalidCandidate {
                team_id: candidate.team_id.clone(),
                message: format!("predicted points {} is not finite", candidate.predicted_points),
            });
        }
        if !candidate.baseline_bid.is_finite() || candidate.baseline_bid < 0.0 {
            return Err(OptimizerError::InvalidCandidate {
                team_id: candidate.team_id.clone(),
                message: format!("baseline bid {} must be finite and >= 0", candidate.baseline_bid),
            });
        }
    }

    let teams = candidates.len();
    let max_selected = constraints.max_teams.min(teams);
    let budget = constraints.budget as usize;
    let min_bid = constraints.min_bid as usize;
    let max_bid = constraints.max_bid as usize;
    let layers = Layers {
        selected: max_selected,
        budget,
    };

    let cells = table_cells(teams, max_selected, constraints.budget).ok_or_else(|| {
        OptimizerError::InvalidConstraints(format!("budget {budget} is too large"))
    })?;
    let mut value = vec![f64::NEG_INFINITY; cells];
    // choice[at(i + 1, k, b)]: bid placed on team i to reach that state.
    let mut choice = vec![0u32; cells];
    value[layers.at(0, 0, 0)] = 0.0;

    for (i, candidate) in candidates.iter().enumerate() {
        for k in 0..=max_selected.min(i) {
            for spent in 0..=budget {
                let current = value[layers.at(i, k, spent)];
                if current == f64::NEG_INFINITY {
                    continue;
                }

                let skip = layers.at(i + 1, k, spent);
                if current > value[skip] {
                    value[skip] = current;
                    choice[skip] = 0;
                }

                if k == max_selected {
                    continue;
                }
                let top = max_bid.min(budget - spent);
                for bid in min_bid..=top {
                    let payoff = candidate.predicted_points
                        * ownership(candidate.baseline_bid, bid as u32);
                    let next = layers.at(i + 1, k + 1, spent + bid);
                    if current + payoff > value[next] {
                        value[next] = current + payoff;
                        choice[next] = bid as u32;
                    }
                }
            }
        }
    }

    let best = (constraints.min_teams..=max_selected)
        .filter_map(|k| {
            let v = value[layers.at(teams, k, budget)];
            (v > f64::NEG_INFINITY).then_some((k, v))
        })
        .fold(None, |best: Option<(usize, f64)>, (k, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((k, v)),
        });
    let Some((mut k, expected_return)) = best else {
        return Err(OptimizerError::NoFeasibleAllocation {
            budget: constraints.budget,
        });
    };

    let mut allocation = candidates.to_vec();
    let mut spent = budget;
    for i in (0..teams).rev() {
        let bid = choice[layers.at(i + 1, k, spent)];
        allocation[i].bid = bid;
        if bid > 0 {
            k -= 1;
            spent -= bid as usize;
        }
    }
    debug_assert_eq!((k, spent), (0, 0));

    debug!("bid table: {} states", cells);
    info!(
        "allocated {} across {} teams, expected return {:.3}",
        constraints.budget,
        allocation.iter().filter(|c| c.bid > 0).count(),
        expected_return
    );

    Ok(BidAllocation {
        candidates: allocation,
        expected_return,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
