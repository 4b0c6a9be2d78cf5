// Bracket games, rounds, and slot occupancy.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// Tournament rounds in play order. The derived `Ord` follows declaration
/// order, so `FirstFour < RoundOf64 < ... < Championship`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    FirstFour,
    RoundOf64,
    RoundOf32,
    Sweet16,
    Elite8,
    FinalFour,
    Championship,
}

impl Round {
    pub const ALL: [Round; 7] = [
        Round::FirstFour,
        Round::RoundOf64,
        Round::RoundOf32,
        Round::Sweet16,
        Round::Elite8,
        Round::FinalFour,
        Round::Championship,
    ];

    /// Zero-based position in play order (FirstFour = 0, Championship = 6).
    pub fn index(self) -> usize {
        match self {
            Round::FirstFour => 0,
            Round::RoundOf64 => 1,
            Round::RoundOf32 => 2,
            Round::Sweet16 => 3,
            Round::Elite8 => 4,
            Round::FinalFour => 5,
            Round::Championship => 6,
        }
    }

    /// Snake-case name used inside game ids and export headers.
    pub fn id_fragment(self) -> &'static str {
        match self {
            Round::FirstFour => "first_four",
            Round::RoundOf64 => "round_of_64",
            Round::RoundOf32 => "round_of_32",
            Round::Sweet16 => "sweet_16",
            Round::Elite8 => "elite_8",
            Round::FinalFour => "final_four",
            Round::Championship => "championship",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id_fragment())
    }
}

// ---------------------------------------------------------------------------
// Slots and links
// ---------------------------------------------------------------------------

/// One of the two positions in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::First, Slot::Second];

    /// Array index into `BracketGame::slots`.
    pub fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }
}

/// Who sits in a slot: a fixed team, or whoever wins an earlier game.
/// Both variants carry arena indices into the owning `BracketGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Team(usize),
    WinnerOf(usize),
}

/// Where a game's winner goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLink {
    pub game: usize,
    pub slot: Slot,
}

// ---------------------------------------------------------------------------
// BracketGame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BracketGame {
    /// Deterministic id, stable across rebuilds from identical input.
    pub id: String,
    pub round: Round,
    /// `None` for the national rounds (Final Four, Championship).
    pub region: Option<String>,
    pub slots: [Occupant; 2],
    /// `None` only for the Championship.
    pub next: Option<GameLink>,
    /// Tie-breaker within a round; games are visited by (round, sort_order).
    pub sort_order: u32,
    /// Best seed line that can reach this game.
    pub lowest_seed: u8,
}

impl BracketGame {
    pub fn is_championship(&self) -> bool {
        self.round == Round::Championship
    }
}
