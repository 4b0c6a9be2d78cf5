// Analytic win-probability propagation.
//
// Walks the bracket in topological order. Each slot's incoming distribution is
// either a certainty (fixed team) or the winner distribution of its feeding
// game; combining the two slots pairwise with the matchup probabilities gives
// the game's winner distribution. Slot masses are recorded per team before
// resolution, which yields each team's probability of reaching every game on
// its path.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::bracket::game::{Occupant, Round};
use crate::bracket::graph::BracketGraph;
use crate::matchup::{resolve_probability, MatchupError, MatchupSource};
use crate::scoring::ScoringRules;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error(transparent)]
    Matchup(#[from] MatchupError),

    #[error("bracket graph is inconsistent: {0}")]
    Inconsistent(String),
}

// ---------------------------------------------------------------------------
// WinDistribution
// ---------------------------------------------------------------------------

/// Probability mass over teams (by graph team index) for one game.
///
/// Every team that can structurally reach the game is present, including
/// teams whose mass has dropped to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WinDistribution {
    masses: BTreeMap<usize, f64>,
}

impl WinDistribution {
    pub fn certain(team: usize) -> Self {
        let mut masses = BTreeMap::new();
        masses.insert(team, 1.0);
        WinDistribution { masses }
    }

    pub fn probability(&self, team: usize) -> f64 {
        self.masses.get(&team).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.masses.values().sum()
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.masses.iter().map(|(&team, &mass)| (team, mass))
    }

    fn add(&mut self, team: usize, mass: f64) {
        *self.masses.entry(team).or_insert(0.0) += mass;
    }
}

// ---------------------------------------------------------------------------
// Per-team outlook
// ---------------------------------------------------------------------------

/// Probability that a team occupies one game on its path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundReach {
    pub game: usize,
    pub round: Round,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamOutlook {
    pub team: usize,
    pub byes: u32,
    /// Entry `k` is the probability of playing the k-th game on the team's
    /// path, i.e. of having won at least `k` games.
    pub reach: Vec<RoundReach>,
    pub champion: f64,
    pub expected_points: f64,
}

impl TeamOutlook {
    /// P(wins >= `wins`).
    pub fn wins_at_least(&self, wins: usize) -> f64 {
        match wins.cmp(&self.reach.len()) {
            std::cmp::Ordering::Less => self.reach[wins].probability,
            std::cmp::Ordering::Equal => self.champion,
            std::cmp::Ordering::Greater => 0.0,
        }
    }

    /// P(wins + byes >= `threshold`).
    pub fn progress_probability(&self, threshold: u32) -> f64 {
        if threshold <= self.byes {
            return 1.0;
        }
        self.wins_at_least((threshold - self.byes) as usize)
    }

    /// Probability of playing in `round` (0 if the round is not on the path).
    pub fn round_probability(&self, round: Round) -> f64 {
        self.reach
            .iter()
            .find(|r| r.round == round)
            .map_or(0.0, |r| r.probability)
    }
}

// ---------------------------------------------------------------------------
// Propagation result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Propagation {
    distributions: Vec<WinDistribution>,
    outlooks: Vec<TeamOutlook>,
}

impl Propagation {
    /// Winner distribution of a game (by graph game index).
    pub fn distribution(&self, game: usize) -> &WinDistribution {
        &self.distributions[game]
    }

    pub fn distributions(&self) -> &[WinDistribution] {
        &self.distributions
    }

    pub fn outlook(&self, team: usize) -> &TeamOutlook {
        &self.outlooks[team]
    }

    pub fn outlooks(&self) -> &[TeamOutlook] {
        &self.outlooks
    }

    pub fn champion_probability(&self, team: usize) -> f64 {
        self.outlooks[team].champion
    }

    pub fn expected_points(&self, team: usize) -> f64 {
        self.outlooks[team].expected_points
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Propagate win probabilities through the bracket.
///
/// Pairs whose joint mass is zero never meet and are not looked up. Any other
/// pair missing from `source` aborts with an error naming the game and teams.
pub fn propagate<S: MatchupSource + ?Sized>(
    graph: &BracketGraph,
    source: &S,
    scoring: &ScoringRules,
) -> Result<Propagation, PropagationError> {
    let teams = graph.teams();
    let mut outlooks: Vec<TeamOutlook> = (0..teams.len())
        .map(|team| TeamOutlook {
            team,
            byes: graph.byes(team),
            reach: Vec::new(),
            champion: 0.0,
            expected_points: 0.0,
        })
        .collect();
    let mut distributions: Vec<WinDistribution> = Vec::with_capacity(graph.games().len());

    for (index, game) in graph.games().iter().enumerate() {
        let mut incoming: [WinDistribution; 2] = Default::default();
        for (slot, occupant) in game.slots.iter().enumerate() {
            incoming[slot] = match *occupant {
                Occupant::Team(team) => WinDistribution::certain(team),
                Occupant::WinnerOf(feeder) if feeder < index => distributions[feeder].clone(),
                Occupant::WinnerOf(feeder) => {
                    return Err(PropagationError::Inconsistent(format!(
                        "game `{}` is fed by game index {feeder}, which is not resolved yet",
                        game.id
                    )));
                }
            };
        }

        for (team, mass) in incoming.iter().flat_map(WinDistribution::iter) {
            outlooks[team].reach.push(RoundReach {
                game: index,
                round: game.round,
                probability: mass,
            });
        }

        let [first, second] = &incoming;
        let mut winners = WinDistribution::default();
        for (a, mass_a) in first.iter() {
            for (b, mass_b) in second.iter() {
                let joint = mass_a * mass_b;
                if joint == 0.0 {
                    winners.add(a, 0.0);
                    winners.add(b, 0.0);
                    continue;
                }
                let p = resolve_probability(source, &game.id, &teams[a].id, &teams[b].id)?;
                winners.add(a, joint * p);
                winners.add(b, joint * (1.0 - p));
            }
        }
        distributions.push(winners);
    }

    let championship = graph.championship();
    let final_distribution = distributions.get(championship).ok_or_else(|| {
        PropagationError::Inconsistent("championship game was never resolved".into())
    })?;
    for (team, mass) in final_distribution.iter() {
        outlooks[team].champion = mass;
    }

    for outlook in outlooks.iter_mut() {
        outlook.expected_points = scoring
            .rows()
            .iter()
            .map(|row| row.points * outlook.progress_probability(row.threshold))
            .sum();
    }

    debug!(
        "propagated {} games; championship mass {:.12}",
        distributions.len(),
        final_distribution.total()
    );

    Ok(Propagation {
        distributions,
        outlooks,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
