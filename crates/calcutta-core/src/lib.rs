// Library root: the bracket simulation and bid optimization engine.
//
// Leaf-first: `bracket` builds the immutable game graph, `propagate` walks it
// analytically, `simulate` draws concrete outcomes in parallel, and `optimize`
// turns predicted points into a budget-constrained bid vector.

pub mod bracket;
pub mod matchup;
pub mod optimize;
pub mod propagate;
pub mod registry;
pub mod scoring;
pub mod simulate;
pub mod team;

pub use bracket::builder::{build_bracket, RegionPairing, TOURNAMENT_TEAMS};
pub use bracket::game::{BracketGame, GameLink, Occupant, Round, Slot};
pub use bracket::graph::{BracketGraph, GraphAssembler};
pub use bracket::BracketError;
pub use matchup::{MatchupError, MatchupSource, MatchupTable};
pub use optimize::{optimize_bids, BidAllocation, BidCandidate, BidConstraints, OptimizerError};
pub use propagate::{propagate, Propagation, PropagationError, TeamOutlook, WinDistribution};
pub use registry::{ModelRegistry, RegistryError, WinModel};
pub use scoring::{ScoringError, ScoringRule, ScoringRules};
pub use simulate::{
    simulate, SimulationBatch, SimulationConfig, SimulationError, SimulationResult,
    TeamSimulationSummary,
};
pub use team::Team;
