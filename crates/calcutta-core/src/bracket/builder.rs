// 68-team tournament bracket construction.
//
// Teams are grouped by region. A seed line holding two teams becomes a First
// Four game; every other team gets a bye into the Round of 64. Regional rounds
// pair games whose best reachable seed lines sum to a fixed target, so the
// layout (and every game id) follows from seeds alone.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::game::{Occupant, Round};
use super::graph::{BracketGraph, GraphAssembler};
use super::BracketError;
use crate::team::{Team, MAX_SEED};

/// Number of entrants in a full tournament (64 plus four play-in duplicates).
pub const TOURNAMENT_TEAMS: usize = 68;

/// Round of 64 opponents' seeds sum to this (1v16, 8v9, ...).
const ROUND_OF_64_SEED_SUM: u8 = 17;

/// Top seed of each Round of 64 game, in bracket order.
const ROUND_OF_64_TOP_SEEDS: [u8; 8] = [1, 8, 5, 4, 6, 3, 7, 2];

/// Later regional rounds and the lowest-seed sum that pairs their feeders.
const REGIONAL_ROUNDS: [(Round, u8); 3] = [
    (Round::RoundOf32, 9),
    (Round::Sweet16, 5),
    (Round::Elite8, 3),
];

pub const FINAL_FOUR_1_ID: &str = "final_four-1";
pub const FINAL_FOUR_2_ID: &str = "final_four-2";
pub const CHAMPIONSHIP_ID: &str = "championship";

// ---------------------------------------------------------------------------
// Region pairing
// ---------------------------------------------------------------------------

/// Which regional champions meet in each Final Four semifinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPairing {
    pub semifinal_1: [String; 2],
    pub semifinal_2: [String; 2],
}

impl Default for RegionPairing {
    fn default() -> Self {
        RegionPairing {
            semifinal_1: ["East".into(), "West".into()],
            semifinal_2: ["South".into(), "Midwest".into()],
        }
    }
}

impl RegionPairing {
    /// The four regions in bracket order.
    pub fn regions(&self) -> [&str; 4] {
        [
            self.semifinal_1[0].as_str(),
            self.semifinal_1[1].as_str(),
            self.semifinal_2[0].as_str(),
            self.semifinal_2[1].as_str(),
        ]
    }

    pub fn validate(&self) -> Result<(), BracketError> {
        let regions = self.regions();
        for (i, region) in regions.iter().enumerate() {
            if region.trim().is_empty() {
                return Err(BracketError::InvalidPairing("region names must not be empty".into()));
            }
            if regions[..i].iter().any(|r| r.eq_ignore_ascii_case(region)) {
                return Err(BracketError::InvalidPairing(format!(
                    "region `{region}` is listed more than once"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Game ids
// ---------------------------------------------------------------------------

/// Deterministic id for a regional game: `{region}-{round}-{lowest seed}`.
pub fn regional_game_id(region: &str, round: Round, lowest_seed: u8) -> String {
    let region: String = region
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c.to_ascii_lowercase() })
        .collect();
    format!("{region}-{}-{lowest_seed}", round.id_fragment())
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build the full bracket graph for a 68-team field.
///
/// Fails if the team count is not 68, a team's region is not in the pairing,
/// a seed is out of range, or a region does not hold every seed line exactly
/// once or twice.
pub fn build_bracket(teams: Vec<Team>, pairing: &RegionPairing) -> Result<BracketGraph, BracketError> {
    if teams.len() != TOURNAMENT_TEAMS {
        return Err(BracketError::TeamCount {
            expected: TOURNAMENT_TEAMS,
            actual: teams.len(),
        });
    }
    pairing.validate()?;
    let regions = pairing.regions();

    // seed_lines[region][seed] -> team indices on that line
    let mut seed_lines: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); MAX_SEED as usize + 1]; 4];
    for (index, team) in teams.iter().enumerate() {
        if !team.has_valid_seed() {
            return Err(BracketError::SeedOutOfRange {
                team: team.id.clone(),
                seed: team.seed,
            });
        }
        let region = regions
            .iter()
            .position(|r| r.eq_ignore_ascii_case(team.region.trim()))
            .ok_or_else(|| BracketError::UnknownRegion {
                team: team.id.clone(),
                region: team.region.clone(),
            })?;
        seed_lines[region][team.seed as usize].push(index);
    }
    for (region, lines) in regions.iter().zip(seed_lines.iter_mut()) {
        for (seed, line) in lines.iter_mut().enumerate().skip(1) {
            if line.is_empty() || line.len() > 2 {
                return Err(BracketError::SeedDuplication {
                    region: region.to_string(),
                    seed: seed as u8,
                    count: line.len(),
                });
            }
            // Play-in order must not depend on input order.
            line.sort_by(|&a, &b| teams[a].id.cmp(&teams[b].id));
        }
    }

    let mut asm = GraphAssembler::new(teams)?;

    // First Four, then the Round of 64 entrants for every seed line.
    let mut entrants: Vec<Vec<Occupant>> = Vec::with_capacity(4);
    for (region, lines) in regions.iter().zip(&seed_lines) {
        let mut region_entrants = vec![Occupant::Team(0); MAX_SEED as usize + 1];
        for seed in 1..=MAX_SEED {
            let line = &lines[seed as usize];
            region_entrants[seed as usize] = match line.as_slice() {
                [team] => Occupant::Team(*team),
                [a, b] => {
                    let game = asm.add_game(
                        regional_game_id(region, Round::FirstFour, seed),
                        Round::FirstFour,
                        Some(region.to_string()),
                        [Occupant::Team(*a), Occupant::Team(*b)],
                    )?;
                    Occupant::WinnerOf(game)
                }
                other => {
                    return Err(BracketError::SeedDuplication {
                        region: region.to_string(),
                        seed,
                        count: other.len(),
                    })
                }
            };
        }
        entrants.push(region_entrants);
    }

    // frontier[region] holds (lowest seed, game index) in bracket order.
    let mut frontier: Vec<Vec<(u8, usize)>> = Vec::with_capacity(4);
    for (region, region_entrants) in regions.iter().zip(&entrants) {
        let mut games = Vec::with_capacity(ROUND_OF_64_TOP_SEEDS.len());
        for top in ROUND_OF_64_TOP_SEEDS {
            let bottom = ROUND_OF_64_SEED_SUM - top;
            let game = asm.add_game(
                regional_game_id(region, Round::RoundOf64, top),
                Round::RoundOf64,
                Some(region.to_string()),
                [region_entrants[top as usize], region_entrants[bottom as usize]],
            )?;
            games.push((top, game));
        }
        frontier.push(games);
    }

    for (round, target) in REGIONAL_ROUNDS {
        for (region, games) in regions.iter().zip(frontier.iter_mut()) {
            let mut next = Vec::with_capacity(games.len() / 2);
            for ((high_seed, high), (_, low)) in pair_by_seed_sum(games, target, region, round)? {
                let game = asm.add_game(
                    regional_game_id(region, round, high_seed),
                    round,
                    Some(region.to_string()),
                    [Occupant::WinnerOf(high), Occupant::WinnerOf(low)],
                )?;
                next.push((high_seed, game));
            }
            *games = next;
        }
    }

    let champion_of = |region: usize| -> Result<Occupant, BracketError> {
        match frontier[region].as_slice() {
            [(_, game)] => Ok(Occupant::WinnerOf(*game)),
            other => Err(BracketError::Malformed(format!(
                "region `{}` resolved to {} regional finals",
                regions[region],
                other.len()
            ))),
        }
    };
    let semifinal_1 = asm.add_game(
        FINAL_FOUR_1_ID,
        Round::FinalFour,
        None,
        [champion_of(0)?, champion_of(1)?],
    )?;
    let semifinal_2 = asm.add_game(
        FINAL_FOUR_2_ID,
        Round::FinalFour,
        None,
        [champion_of(2)?, champion_of(3)?],
    )?;
    asm.add_game(
        CHAMPIONSHIP_ID,
        Round::Championship,
        None,
        [Occupant::WinnerOf(semifinal_1), Occupant::WinnerOf(semifinal_2)],
    )?;

    let graph = asm.finish()?;
    debug!(
        "built bracket graph: {} teams, {} games",
        graph.teams().len(),
        graph.games().len()
    );
    Ok(graph)
}

/// Pair games whose lowest seeds sum to `target`, keeping bracket order.
/// Each pair is returned better seed first.
fn pair_by_seed_sum(
    games: &[(u8, usize)],
    target: u8,
    region: &str,
    round: Round,
) -> Result<Vec<((u8, usize), (u8, usize))>, BracketError> {
    let mut used = vec![false; games.len()];
    let mut pairs = Vec::with_capacity(games.len() / 2);
    for i in 0..games.len() {
        if used[i] {
            continue;
        }
        let (seed, _) = games[i];
        let partner = (i + 1..games.len())
            .find(|&j| !used[j] && games[j].0.checked_add(seed) == Some(target))
            .ok_or_else(|| {
                BracketError::Malformed(format!(
                    "region `{region}`: no {round} partner for seed line {seed}"
                ))
            })?;
        used[i] = true;
        used[partner] = true;
        let (a, b) = (games[i], games[partner]);
        pairs.push(if a.0 <= b.0 { (a, b) } else { (b, a) });
    }
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
