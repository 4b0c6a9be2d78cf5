// Named win-probability models.
//
// The registry is an ordinary value: build it once at startup, register any
// extra models, and pass it by reference to whatever needs a lookup by name.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::bracket::game::BracketGame;
use crate::team::Team;

/// Default logistic slope per seed line of difference.
pub const DEFAULT_SEED_SCALE: f64 = 0.17;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown win model `{name}` (available: {available})")]
    UnknownModel { name: String, available: String },
}

/// Computes `P(team_a beats team_b)` when they meet in `game`.
pub trait WinModel: Send + Sync {
    fn win_probability(&self, game: &BracketGame, team_a: &Team, team_b: &Team) -> f64;
}

/// Logistic curve in the seed difference: equal seeds are a coin flip and a
/// better (smaller) seed is favored.
#[derive(Debug, Clone, Copy)]
pub struct SeedLogistic {
    pub scale: f64,
}

impl WinModel for SeedLogistic {
    fn win_probability(&self, _game: &BracketGame, team_a: &Team, team_b: &Team) -> f64 {
        let diff = f64::from(team_b.seed) - f64::from(team_a.seed);
        1.0 / (1.0 + (-self.scale * diff).exp())
    }
}

/// Every game is 50/50.
#[derive(Debug, Clone, Copy)]
pub struct CoinFlip;

impl WinModel for CoinFlip {
    fn win_probability(&self, _game: &BracketGame, _team_a: &Team, _team_b: &Team) -> f64 {
        0.5
    }
}

// ---------------------------------------------------------------------------
// ModelRegistry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn WinModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `seed_logistic` and `coin_flip` models.
    pub fn with_defaults(seed_scale: f64) -> Self {
        let mut registry = Self::new();
        registry.register("seed_logistic", Box::new(SeedLogistic { scale: seed_scale }));
        registry.register("coin_flip", Box::new(CoinFlip));
        registry
    }

    /// Add or replace a model, returning the one it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        model: Box<dyn WinModel>,
    ) -> Option<Box<dyn WinModel>> {
        self.models.insert(name.into(), model)
    }

    pub fn get(&self, name: &str) -> Option<&dyn WinModel> {
        self.models.get(name).map(|m| m.as_ref())
    }

    pub fn require(&self, name: &str) -> Result<&dyn WinModel, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::UnknownModel {
            name: name.to_string(),
            available: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.models.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::game::{Occupant, Round};

    fn game() -> BracketGame {
        BracketGame {
            id: "east-round_of_64-1".into(),
            round: Round::RoundOf64,
            region: Some("East".into()),
            slots: [Occupant::Team(0), Occupant::Team(1)],
            next: None,
            sort_order: 0,
            lowest_seed: 1,
        }
    }

    #[test]
    fn seed_logistic_favors_better_seed() {
        let model = SeedLogistic { scale: DEFAULT_SEED_SCALE };
        let one = Team::new("a", 1, "East", "A");
        let sixteen = Team::new("b", 16, "East", "B");
        let p = model.win_probability(&game(), &one, &sixteen);
        let q = model.win_probability(&game(), &sixteen, &one);
        assert!(p > 0.9, "1 seed should be a heavy favorite, got {p}");
        assert!((p + q - 1.0).abs() < 1e-12);

        let even = model.win_probability(&game(), &one, &Team::new("c", 1, "West", "C"));
        assert!((even - 0.5).abs() < 1e-12);
    }

    #[test]
    fn registry_lookup_by_name() {
        let registry = ModelRegistry::with_defaults(DEFAULT_SEED_SCALE);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["coin_flip", "seed_logistic"]);
        let coin = registry.require("coin_flip").unwrap();
        let a = Team::new("a", 1, "East", "A");
        let b = Team::new("b", 16, "East", "B");
        assert_eq!(coin.win_probability(&game(), &a, &b), 0.5);
    }

    #[test]
    fn unknown_model_lists_alternatives() {
        let registry = ModelRegistry::with_defaults(DEFAULT_SEED_SCALE);
        let err = registry.require("kenpom").err().unwrap();
        assert_eq!(
            err.to_string(),
            "unknown win model `kenpom` (available: coin_flip, seed_logistic)"
        );
    }

    #[test]
    fn register_replaces_existing_model() {
        let mut registry = ModelRegistry::new();
        assert!(registry.register("m", Box::new(CoinFlip)).is_none());
        assert!(registry.register("m", Box::new(SeedLogistic { scale: 1.0 })).is_some());
        assert_eq!(registry.names().count(), 1);
    }
}
