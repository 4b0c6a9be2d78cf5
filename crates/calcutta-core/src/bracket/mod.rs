// Bracket graph: game arena, low-level assembly, and the 68-team builder.

pub mod builder;
pub mod game;
pub mod graph;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    #[error("expected {expected} teams, got {actual}")]
    TeamCount { expected: usize, actual: usize },

    #[error("team `{team}` has seed {seed}, expected 1..=16")]
    SeedOutOfRange { team: String, seed: u8 },

    #[error("team `{team}` is in region `{region}`, which is not part of the region pairing")]
    UnknownRegion { team: String, region: String },

    #[error("invalid region pairing: {0}")]
    InvalidPairing(String),

    #[error("region `{region}` has {count} teams on seed line {seed}")]
    SeedDuplication {
        region: String,
        seed: u8,
        count: usize,
    },

    #[error("duplicate team id `{0}`")]
    DuplicateTeam(String),

    #[error("duplicate game id `{0}`")]
    DuplicateGame(String),

    #[error("malformed bracket: {0}")]
    Malformed(String),
}
