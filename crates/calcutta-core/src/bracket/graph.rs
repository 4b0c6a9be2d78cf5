// Immutable bracket graph stored as an arena of games.
//
// Games are kept sorted by (round, sort_order), which is a topological order:
// every game that feeds another sits at a lower index than the game it feeds.
// Propagation and simulation both rely on this and simply walk the arena.

use std::collections::HashMap;

use super::game::{BracketGame, GameLink, Occupant, Round, Slot};
use super::BracketError;
use crate::team::Team;

// ---------------------------------------------------------------------------
// BracketGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BracketGraph {
    teams: Vec<Team>,
    games: Vec<BracketGame>,
    team_index: HashMap<String, usize>,
    game_index: HashMap<String, usize>,
    /// Game in which each team appears as a fixed occupant.
    entry_games: Vec<usize>,
    championship: usize,
}

impl BracketGraph {
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, index: usize) -> &Team {
        &self.teams[index]
    }

    pub fn team_index(&self, id: &str) -> Option<usize> {
        self.team_index.get(id).copied()
    }

    /// All games in topological (round, sort_order) order.
    pub fn games(&self) -> &[BracketGame] {
        &self.games
    }

    pub fn game(&self, index: usize) -> &BracketGame {
        &self.games[index]
    }

    pub fn game_index(&self, id: &str) -> Option<usize> {
        self.game_index.get(id).copied()
    }

    pub fn game_by_id(&self, id: &str) -> Option<&BracketGame> {
        self.game_index(id).map(|i| &self.games[i])
    }

    pub fn championship(&self) -> usize {
        self.championship
    }

    pub fn games_in_round(&self, round: Round) -> impl Iterator<Item = &BracketGame> + '_ {
        self.games.iter().filter(move |g| g.round == round)
    }

    /// Id and slot of the game this game's winner advances to.
    pub fn next_game(&self, index: usize) -> Option<(&str, Slot)> {
        self.games[index]
            .next
            .map(|link| (self.games[link.game].id.as_str(), link.slot))
    }

    pub fn entry_game(&self, team: usize) -> usize {
        self.entry_games[team]
    }

    /// 1 if the team skips the First Four, 0 otherwise.
    pub fn byes(&self, team: usize) -> u32 {
        if self.games[self.entry_games[team]].round == Round::FirstFour {
            0
        } else {
            1
        }
    }

    /// Games a team would play if it kept winning, entry game first.
    pub fn path(&self, team: usize) -> Vec<usize> {
        let mut path = vec![self.entry_games[team]];
        let mut current = self.entry_games[team];
        while let Some(link) = self.games[current].next {
            path.push(link.game);
            current = link.game;
        }
        path
    }

    /// For every game, the teams that can structurally occupy each slot.
    pub fn possible_occupants(&self) -> Vec<[Vec<usize>; 2]> {
        let mut occupants: Vec<[Vec<usize>; 2]> = Vec::with_capacity(self.games.len());
        for game in &self.games {
            let slot_teams = game.slots.map(|occupant| match occupant {
                Occupant::Team(team) => vec![team],
                Occupant::WinnerOf(feeder) => {
                    let [first, second] = &occupants[feeder];
                    first.iter().chain(second.iter()).copied().collect()
                }
            });
            occupants.push(slot_teams);
        }
        occupants
    }
}

// ---------------------------------------------------------------------------
// GraphAssembler
// ---------------------------------------------------------------------------

/// Validated, incremental construction of a `BracketGraph`.
///
/// Games must be added after every game they reference, so a `WinnerOf`
/// occupant always points at an existing game. Each game may feed exactly one
/// later slot; the link is recorded on the feeding game as the reference is
/// added. `finish` checks the remaining whole-graph invariants and sorts the
/// arena into (round, sort_order) order.
#[derive(Debug)]
pub struct GraphAssembler {
    teams: Vec<Team>,
    team_index: HashMap<String, usize>,
    games: Vec<BracketGame>,
    game_index: HashMap<String, usize>,
}

impl GraphAssembler {
    pub fn new(teams: Vec<Team>) -> Result<Self, BracketError> {
        let mut team_index = HashMap::with_capacity(teams.len());
        for (i, team) in teams.iter().enumerate() {
            if team_index.insert(team.id.clone(), i).is_some() {
                return Err(BracketError::DuplicateTeam(team.id.clone()));
            }
        }
        Ok(GraphAssembler {
            teams,
            team_index,
            games: Vec::new(),
            game_index: HashMap::new(),
        })
    }

    pub fn team_index(&self, id: &str) -> Option<usize> {
        self.team_index.get(id).copied()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Add a game and return its assembly index (the index `WinnerOf`
    /// occupants of later games should use). The sort order is the insertion
    /// sequence.
    pub fn add_game(
        &mut self,
        id: impl Into<String>,
        round: Round,
        region: Option<String>,
        slots: [Occupant; 2],
    ) -> Result<usize, BracketError> {
        let id = id.into();
        if self.game_index.contains_key(&id) {
            return Err(BracketError::DuplicateGame(id));
        }
        let index = self.games.len();

        let mut lowest_seed = u8::MAX;
        for occupant in slots {
            let seed = match occupant {
                Occupant::Team(team) => {
                    self.teams
                        .get(team)
                        .ok_or_else(|| {
                            BracketError::Malformed(format!(
                                "game `{id}` references unknown team index {team}"
                            ))
                        })?
                        .seed
                }
                Occupant::WinnerOf(feeder) => {
                    let feeding = self.games.get(feeder).ok_or_else(|| {
                        BracketError::Malformed(format!(
                            "game `{id}` references game index {feeder} before it was added"
                        ))
                    })?;
                    if feeding.round >= round {
                        return Err(BracketError::Malformed(format!(
                            "game `{}` ({}) cannot feed game `{id}` ({round})",
                            feeding.id, feeding.round
                        )));
                    }
                    feeding.lowest_seed
                }
            };
            lowest_seed = lowest_seed.min(seed);
        }

        if slots[0] == slots[1] {
            return Err(BracketError::Malformed(format!(
                "game `{id}` has the same occupant in both slots"
            )));
        }

        // Record forward links only once every occupant has been checked so a
        // rejected game leaves the assembler untouched.
        for slot in Slot::BOTH {
            if let Occupant::WinnerOf(feeder) = slots[slot.index()] {
                if self.games[feeder].next.is_some() {
                    return Err(BracketError::Malformed(format!(
                        "game `{}` already feeds a later game",
                        self.games[feeder].id
                    )));
                }
            }
        }
        for slot in Slot::BOTH {
            if let Occupant::WinnerOf(feeder) = slots[slot.index()] {
                self.games[feeder].next = Some(GameLink { game: index, slot });
            }
        }

        self.game_index.insert(id.clone(), index);
        self.games.push(BracketGame {
            id,
            round,
            region,
            slots,
            next: None,
            sort_order: index as u32,
            lowest_seed,
        });
        Ok(index)
    }

    /// Check whole-graph invariants and produce the immutable graph.
    pub fn finish(self) -> Result<BracketGraph, BracketError> {
        let GraphAssembler {
            teams, mut games, ..
        } = self;

        let championships: Vec<usize> = games
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_championship())
            .map(|(i, _)| i)
            .collect();
        if championships.len() != 1 {
            return Err(BracketError::Malformed(format!(
                "expected exactly one championship game, found {}",
                championships.len()
            )));
        }
        for game in &games {
            match (game.is_championship(), game.next) {
                (true, Some(_)) => {
                    return Err(BracketError::Malformed(format!(
                        "championship game `{}` must not feed another game",
                        game.id
                    )));
                }
                (false, None) => {
                    return Err(BracketError::Malformed(format!(
                        "game `{}` does not feed any later game",
                        game.id
                    )));
                }
                _ => {}
            }
        }

        // Sort into (round, sort_order) order and remap every index.
        let mut order: Vec<usize> = (0..games.len()).collect();
        order.sort_by_key(|&i| (games[i].round, games[i].sort_order));
        let mut remap = vec![0usize; games.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }
        for game in games.iter_mut() {
            for occupant in game.slots.iter_mut() {
                if let Occupant::WinnerOf(feeder) = occupant {
                    *feeder = remap[*feeder];
                }
            }
            if let Some(link) = game.next.as_mut() {
                link.game = remap[link.game];
            }
        }
        let mut pending: Vec<Option<BracketGame>> = games.into_iter().map(Some).collect();
        let games: Vec<BracketGame> = order
            .iter()
            .filter_map(|&old| pending[old].take())
            .collect();

        // Every team must be a fixed occupant of exactly one game.
        let mut entry_games: Vec<Option<usize>> = vec![None; teams.len()];
        for (index, game) in games.iter().enumerate() {
            for occupant in game.slots {
                if let Occupant::Team(team) = occupant {
                    if entry_games[team].replace(index).is_some() {
                        return Err(BracketError::Malformed(format!(
                            "team `{}` appears as a fixed occupant more than once",
                            teams[team].id
                        )));
                    }
                }
            }
        }
        let entry_games = entry_games
            .into_iter()
            .enumerate()
            .map(|(team, entry)| {
                entry.ok_or_else(|| {
                    BracketError::Malformed(format!(
                        "team `{}` does not appear in any game",
                        teams[team].id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let team_index = teams
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        let game_index: HashMap<String, usize> = games
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.clone(), i))
            .collect();
        let championship = remap[championships[0]];

        Ok(BracketGraph {
            teams,
            games,
            team_index,
            game_index,
            entry_games,
            championship,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
