// Tournament entrants.

use serde::{Deserialize, Serialize};

/// Best seed line within a region.
pub const MIN_SEED: u8 = 1;
/// Worst seed line within a region.
pub const MAX_SEED: u8 = 16;

/// A tournament entrant. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    /// Seed line within the region (1 = best).
    pub seed: u8,
    pub region: String,
    pub name: String,
}

impl Team {
    pub fn new(
        id: impl Into<String>,
        seed: u8,
        region: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Team {
            id: id.into(),
            seed,
            region: region.into(),
            name: name.into(),
        }
    }

    /// Whether the seed lies on a valid seed line.
    pub fn has_valid_seed(&self) -> bool {
        (MIN_SEED..=MAX_SEED).contains(&self.seed)
    }
}
