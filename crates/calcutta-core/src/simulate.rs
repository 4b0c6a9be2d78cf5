// Parallel Monte Carlo bracket simulation.
//
// A rayon pool with exactly `workers` threads pulls simulation indices from
// its shared work queue. Each simulation seeds its own RNG from
// (base seed, simulation index), so outcomes do not depend on the worker count
// or on scheduling. Each simulation owns one disjoint row of the pre-sized
// result buffer (`simulation * team_count ..`), so workers never share a write
// location and no locking is needed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::bracket::game::Occupant;
use crate::bracket::graph::BracketGraph;
use crate::matchup::{resolve_probability, MatchupError, MatchupSource};
use crate::scoring::ScoringRules;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("simulation count must be greater than 0")]
    NoSimulations,

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("{simulations} simulations x {teams} teams does not fit in memory")]
    TooLarge { simulations: usize, teams: usize },

    #[error("failed to start simulation workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("simulation {simulation}: {source}")]
    Matchup {
        simulation: usize,
        source: MatchupError,
    },

    #[error("simulation {simulation}: game `{game}` has an unresolved slot")]
    UnresolvedSlot { simulation: usize, game: String },

    #[error("simulation index {index} is out of range for a batch of {simulations}")]
    IndexOutOfRange { index: usize, simulations: usize },
}

/// Batch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub simulations: usize,
    pub seed: u64,
    pub workers: usize,
}

/// One team's outcome in one simulated bracket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub wins: u32,
    /// 1 if the team skipped the First Four.
    pub byes: u32,
    pub eliminated: bool,
}

impl SimulationResult {
    /// wins + byes, the quantity scoring thresholds are written against.
    pub fn progress(&self) -> u32 {
        self.wins + self.byes
    }
}

// ---------------------------------------------------------------------------
// SimulationBatch
// ---------------------------------------------------------------------------

/// N x |teams| results, row-major by simulation index.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBatch {
    simulations: usize,
    team_count: usize,
    results: Vec<SimulationResult>,
}

/// Per-team aggregate over a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSimulationSummary {
    pub team: usize,
    pub mean_wins: f64,
    pub champion_rate: f64,
    pub mean_points: f64,
}

impl SimulationBatch {
    pub fn simulations(&self) -> usize {
        self.simulations
    }

    pub fn team_count(&self) -> usize {
        self.team_count
    }

    pub fn results(&self) -> &[SimulationResult] {
        &self.results
    }

    /// Results for one simulated bracket, indexed by graph team index.
    pub fn row(&self, simulation: usize) -> Result<&[SimulationResult], SimulationError> {
        if simulation >= self.simulations {
            return Err(SimulationError::IndexOutOfRange {
                index: simulation,
                simulations: self.simulations,
            });
        }
        let start = simulation * self.team_count;
        Ok(&self.results[start..start + self.team_count])
    }

    /// Every (simulation index, team index, result) in buffer order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, usize, &SimulationResult)> + '_ {
        let team_count = self.team_count;
        self.results
            .iter()
            .enumerate()
            .map(move |(i, result)| (i / team_count, i % team_count, result))
    }

    /// Total wins per team across all simulations.
    pub fn win_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.team_count];
        for row in self.results.chunks(self.team_count) {
            for (team, result) in row.iter().enumerate() {
                totals[team] += u64::from(result.wins);
            }
        }
        totals
    }

    pub fn summarize(&self, scoring: &ScoringRules) -> Vec<TeamSimulationSummary> {
        let mut wins = vec![0u64; self.team_count];
        let mut titles = vec![0u64; self.team_count];
        let mut points = vec![0.0f64; self.team_count];
        for row in self.results.chunks(self.team_count) {
            for (team, result) in row.iter().enumerate() {
                wins[team] += u64::from(result.wins);
                if !result.eliminated {
                    titles[team] += 1;
                }
                points[team] += scoring.points_for_progress(result.progress());
            }
        }
        let n = self.simulations as f64;
        (0..self.team_count)
            .map(|team| TeamSimulationSummary {
                team,
                mean_wins: wins[team] as f64 / n,
                champion_rate: titles[team] as f64 / n,
                mean_points: points[team] / n,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Seed for one simulation: a pure function of the base seed and index.
fn simulation_seed(base: u64, simulation: usize) -> u64 {
    base ^ (simulation as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Run `config.simulations` independent brackets across `config.workers`
/// threads.
///
/// The first error stops new simulations from being dispatched; simulations
/// already running finish, and the whole batch is discarded.
pub fn simulate<S: MatchupSource + ?Sized>(
    graph: &BracketGraph,
    source: &S,
    config: &SimulationConfig,
) -> Result<SimulationBatch, SimulationError> {
    if config.simulations == 0 {
        return Err(SimulationError::NoSimulations);
    }
    if config.workers == 0 {
        return Err(SimulationError::NoWorkers);
    }
    let team_count = graph.teams().len();
    let game_count = graph.games().len();
    let too_large = || SimulationError::TooLarge {
        simulations: config.simulations,
        teams: team_count,
    };
    let cells = config.simulations.checked_mul(team_count).ok_or_else(too_large)?;
    let mut results: Vec<SimulationResult> = Vec::new();
    results.try_reserve_exact(cells).map_err(|_| too_large())?;
    results.resize(cells, SimulationResult::default());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("calcutta-sim-{i}"))
        .build()?;

    info!(
        "simulating {} brackets on {} workers (seed {})",
        config.simulations, config.workers, config.seed
    );

    pool.install(|| {
        results
            .par_chunks_mut(team_count)
            .enumerate()
            .try_for_each_init(
                || vec![None::<usize>; game_count],
                |winners, (simulation, row)| {
                    simulate_one(graph, source, config.seed, simulation, winners, row)
                },
            )
    })?;

    debug!("simulation batch complete: {} rows", results.len());

    Ok(SimulationBatch {
        simulations: config.simulations,
        team_count,
        results,
    })
}

/// Play one bracket into `row`. `winners` is worker-owned scratch.
fn simulate_one<S: MatchupSource + ?Sized>(
    graph: &BracketGraph,
    source: &S,
    base_seed: u64,
    simulation: usize,
    winners: &mut [Option<usize>],
    row: &mut [SimulationResult],
) -> Result<(), SimulationError> {
    let mut rng = StdRng::seed_from_u64(simulation_seed(base_seed, simulation));
    winners.fill(None);
    for (team, result) in row.iter_mut().enumerate() {
        *result = SimulationResult {
            wins: 0,
            byes: graph.byes(team),
            eliminated: false,
        };
    }

    let teams = graph.teams();
    for (index, game) in graph.games().iter().enumerate() {
        let mut occupants = [0usize; 2];
        for (slot, occupant) in game.slots.iter().enumerate() {
            occupants[slot] = match *occupant {
                Occupant::Team(team) => team,
                Occupant::WinnerOf(feeder) => winners
                    .get(feeder)
                    .copied()
                    .flatten()
                    .ok_or_else(|| SimulationError::UnresolvedSlot {
                        simulation,
                        game: game.id.clone(),
                    })?,
            };
        }
        let [a, b] = occupants;
        let p = resolve_probability(source, &game.id, &teams[a].id, &teams[b].id)
            .map_err(|source| SimulationError::Matchup { simulation, source })?;
        let (winner, loser) = if rng.gen_bool(p) { (a, b) } else { (b, a) };
        winners[index] = Some(winner);
        row[winner].wins += 1;
        row[loser].eliminated = true;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::game::Round;
    use crate::bracket::graph::GraphAssembler;
    use crate::matchup::MatchupTable;
    use crate::scoring::ScoringRule;
    use crate::team::Team;

    fn toy_graph() -> BracketGraph {
        let teams = vec![
            Team::new("t1", 1, "East", "Team 1"),
            Team::new("t2", 1, "West", "Team 2"),
            Team::new("t3", 2, "East", "Team 3"),
            Team::new("t4", 2, "West", "Team 4"),
        ];
        let mut asm = GraphAssembler::new(teams).unwrap();
        let semi_1 = asm
            .add_game("final_four-1", Round::FinalFour, None, [Occupant::Team(0), Occupant::Team(2)])
            .unwrap();
        let semi_2 = asm
            .add_game("final_four-2", Round::FinalFour, None, [Occupant::Team(1), Occupant::Team(3)])
            .unwrap();
        asm.add_game(
            "championship",
            Round::Championship,
            None,
            [Occupant::WinnerOf(semi_1), Occupant::WinnerOf(semi_2)],
        )
        .unwrap();
        asm.finish().unwrap()
    }

    fn toy_table() -> MatchupTable {
        let mut table = MatchupTable::new();
        table.insert("final_four-1", "t1", "t3", 0.6).unwrap();
        table.insert("final_four-2", "t2", "t4", 0.7).unwrap();
        for a in ["t1", "t3"] {
            for b in ["t2", "t4"] {
                table.insert("championship", a, b, 0.5).unwrap();
            }
        }
        table
    }

    fn config(simulations: usize, workers: usize) -> SimulationConfig {
        SimulationConfig {
            simulations,
            seed: 42,
            workers,
        }
    }

    #[test]
    fn every_bracket_has_one_champion() {
        let graph = toy_graph();
        let batch = simulate(&graph, &toy_table(), &config(500, 2)).unwrap();
        assert_eq!(batch.results().len(), 500 * 4);
        for simulation in 0..batch.simulations() {
            let row = batch.row(simulation).unwrap();
            let champions: Vec<&SimulationResult> = row.iter().filter(|r| !r.eliminated).collect();
            assert_eq!(champions.len(), 1, "simulation {simulation} has {} champions", champions.len());
            assert_eq!(champions[0].wins, 2);
            let total_wins: u32 = row.iter().map(|r| r.wins).sum();
            assert_eq!(total_wins, 3, "three games are played per bracket");
            assert!(row.iter().all(|r| r.byes == 1));
        }
    }

    #[test]
    fn results_do_not_depend_on_worker_count() {
        let graph = toy_graph();
        let table = toy_table();
        let single = simulate(&graph, &table, &config(2_000, 1)).unwrap();
        let several = simulate(&graph, &table, &config(2_000, 4)).unwrap();
        assert_eq!(single.win_totals(), several.win_totals());
        assert_eq!(single, several);
    }

    #[test]
    fn different_seeds_give_different_batches() {
        let graph = toy_graph();
        let table = toy_table();
        let a = simulate(&graph, &table, &config(1_000, 2)).unwrap();
        let mut other = config(1_000, 2);
        other.seed = 7;
        let b = simulate(&graph, &table, &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn converges_to_analytic_title_odds() {
        let graph = toy_graph();
        let batch = simulate(&graph, &toy_table(), &config(100_000, 4)).unwrap();
        let scoring = ScoringRules::new(vec![ScoringRule { threshold: 3, points: 1.0 }]).unwrap();
        let summary = batch.summarize(&scoring);
        let t1 = graph.team_index("t1").unwrap();
        let rate = summary[t1].champion_rate;
        assert!((rate - 0.3).abs() < 0.01, "t1 title rate should be ~0.3, got {rate}");
        // Threshold 3 = two wins plus the bye, i.e. the title.
        assert!((summary[t1].mean_points - rate).abs() < 1e-12);
        let t2 = graph.team_index("t2").unwrap();
        assert!((summary[t2].champion_rate - 0.35).abs() < 0.01);
    }

    #[test]
    fn rejects_empty_batches_and_zero_workers() {
        let graph = toy_graph();
        let table = toy_table();
        assert!(matches!(
            simulate(&graph, &table, &config(0, 1)),
            Err(SimulationError::NoSimulations)
        ));
        assert!(matches!(
            simulate(&graph, &table, &config(10, 0)),
            Err(SimulationError::NoWorkers)
        ));
    }

    #[test]
    fn missing_matchup_discards_the_batch() {
        let graph = toy_graph();
        let mut table = MatchupTable::new();
        table.insert("final_four-1", "t1", "t3", 0.6).unwrap();
        table.insert("final_four-2", "t2", "t4", 0.7).unwrap();
        let err = simulate(&graph, &table, &config(100, 3)).unwrap_err();
        match err {
            SimulationError::Matchup { source: MatchupError::Missing { game, .. }, .. } => {
                assert_eq!(game, "championship");
            }
            other => panic!("expected missing matchup, got: {other}"),
        }
    }

    #[test]
    fn row_index_out_of_range() {
        let graph = toy_graph();
        let batch = simulate(&graph, &toy_table(), &config(3, 1)).unwrap();
        assert!(batch.row(2).is_ok());
        assert!(matches!(
            batch.row(3),
            Err(SimulationError::IndexOutOfRange { index: 3, simulations: 3 })
        ));
        let last = batch.rows().last().unwrap();
        assert_eq!((last.0, last.1), (2, 3));
    }

    /// Answers `probability` for every lookup.
    struct Constant(f64);

    impl MatchupSource for Constant {
        fn win_probability(&self, _game: &str, _team_a: &str, _team_b: &str) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn unusable_source_probability_fails_instead_of_sampling() {
        let graph = toy_graph();
        for probability in [1.5, f64::NAN] {
            let err = simulate(&graph, &Constant(probability), &config(50, 2)).unwrap_err();
            match err {
                SimulationError::Matchup {
                    source: MatchupError::OutOfRange { game, team_a, team_b, .. },
                    ..
                } => {
                    assert_eq!(game, "final_four-1");
                    assert_eq!(team_a, "t1");
                    assert_eq!(team_b, "t3");
                }
                other => panic!("expected out-of-range matchup for {probability}, got: {other}"),
            }
        }
    }

    #[test]
    fn oversized_batch_is_rejected_before_allocating() {
        let graph = toy_graph();
        let err = simulate(&graph, &toy_table(), &config(usize::MAX, 1)).unwrap_err();
        assert!(
            matches!(err, SimulationError::TooLarge { simulations: usize::MAX, teams: 4 }),
            "got: {err}"
        );
    }
}
