// End-to-end run: ingest, build, propagate, simulate, optimize, export.

use std::path::PathBuf;

use anyhow::Context;
use calcutta_core::{
    build_bracket, optimize_bids, propagate, simulate, BidAllocation, BidCandidate, BracketGraph,
    MatchupTable, ModelRegistry, Propagation, SimulationBatch, SimulationConfig,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::{export, ingest};

/// How many title favorites the summary lists.
const SUMMARY_FAVORITES: usize = 8;

/// Everything one run produced, plus where it was written.
#[derive(Debug)]
pub struct RunReport {
    pub graph: BracketGraph,
    pub propagation: Propagation,
    pub batch: SimulationBatch,
    pub allocation: BidAllocation,
    pub summary: RunSummary,
    pub outputs: Vec<PathBuf>,
}

/// Serializable digest written to `summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tournament: String,
    /// Registered model name, or "table" when matchups came from a file.
    pub matchup_source: String,
    pub simulations: usize,
    pub seed: u64,
    pub workers: usize,
    pub budget: u32,
    pub total_spent: u64,
    pub expected_return: f64,
    pub favorites: Vec<FavoriteSummary>,
    pub bids: Vec<BidSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteSummary {
    pub team_id: String,
    pub seed: u8,
    pub champion_probability: f64,
    pub simulated_champion_rate: f64,
    pub expected_points: f64,
    pub simulated_points: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BidSummary {
    pub team_id: String,
    pub bid: u32,
    pub ownership: f64,
    pub expected_return: f64,
}

/// Run the whole engine against `config`, writing every export into the
/// configured output directory.
pub fn run(config: &Config, registry: &ModelRegistry) -> anyhow::Result<RunReport> {
    let teams_path = config.resolve(&config.data_paths.teams);
    let teams = ingest::load_teams(&teams_path).context("failed to load teams")?;
    info!("loaded {} teams from {}", teams.len(), teams_path.display());

    let graph = build_bracket(teams, &config.tournament.pairing).context("failed to build bracket")?;
    info!("bracket built: {} games", graph.games().len());

    let (table, matchup_source) = match &config.data_paths.matchups {
        Some(path) => {
            let path = config.resolve(path);
            let table = ingest::load_matchups(&path).context("failed to load matchups")?;
            info!("loaded {} matchups from {}", table.len(), path.display());
            (table, "table".to_string())
        }
        None => {
            let name = &config.strategy.model.name;
            let model = registry.require(name)?;
            let table = MatchupTable::from_model(&graph, model)
                .with_context(|| format!("model `{name}` produced an invalid matchup table"))?;
            info!("model `{}` filled {} matchups", name, table.len());
            (table, name.clone())
        }
    };

    let scoring = &config.tournament.scoring;
    let propagation = propagate(&graph, &table, scoring).context("win propagation failed")?;

    let settings = &config.strategy.simulation;
    let batch = simulate(
        &graph,
        &table,
        &SimulationConfig {
            simulations: settings.count,
            seed: settings.seed,
            workers: settings.workers,
        },
    )
    .context("simulation failed")?;
    let simulated = batch.summarize(scoring);

    let market = match &config.data_paths.market_bids {
        Some(path) => {
            let path = config.resolve(path);
            ingest::load_market_bids(&path).context("failed to load market bids")?
        }
        None => Default::default(),
    };
    let candidates: Vec<BidCandidate> = graph
        .teams()
        .iter()
        .enumerate()
        .map(|(index, team)| {
            let baseline = market.get(&team.id).copied().unwrap_or_else(|| {
                if config.data_paths.market_bids.is_some() {
                    warn!("no market bid for '{}', assuming 0", team.id);
                }
                0.0
            });
            BidCandidate::new(team.id.clone(), propagation.expected_points(index), baseline)
        })
        .collect();
    for id in market.keys() {
        if graph.team_index(id).is_none() {
            warn!("market bid for unknown team '{}' ignored", id);
        }
    }

    let constraints = config.strategy.optimizer.constraints();
    let allocation = optimize_bids(&candidates, &constraints).context("bid optimization failed")?;

    let mut favorites: Vec<FavoriteSummary> = graph
        .teams()
        .iter()
        .enumerate()
        .map(|(index, team)| FavoriteSummary {
            team_id: team.id.clone(),
            seed: team.seed,
            champion_probability: propagation.champion_probability(index),
            simulated_champion_rate: simulated[index].champion_rate,
            expected_points: propagation.expected_points(index),
            simulated_points: simulated[index].mean_points,
        })
        .collect();
    favorites.sort_by(|a, b| {
        b.champion_probability
            .total_cmp(&a.champion_probability)
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    favorites.truncate(SUMMARY_FAVORITES);

    let summary = RunSummary {
        tournament: config.tournament.name.clone(),
        matchup_source,
        simulations: batch.simulations(),
        seed: settings.seed,
        workers: settings.workers,
        budget: constraints.budget,
        total_spent: allocation.total_spent(),
        expected_return: allocation.expected_return,
        favorites,
        bids: allocation
            .selected()
            .map(|c| BidSummary {
                team_id: c.team_id.clone(),
                bid: c.bid,
                ownership: c.ownership(),
                expected_return: c.expected_return(),
            })
            .collect(),
    };

    let out_dir = config.output_dir();
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let outlook_path = out_dir.join("outlook.csv");
    let simulations_path = out_dir.join("simulations.csv");
    let bids_path = out_dir.join("bids.csv");
    let summary_path = out_dir.join("summary.json");
    export::write_outlook(&outlook_path, &graph, &propagation)?;
    export::write_simulations(&simulations_path, &graph, &batch)?;
    export::write_bids(&bids_path, &allocation)?;
    export::write_json(&summary_path, &summary)?;
    info!("wrote results to {}", out_dir.display());

    Ok(RunReport {
        graph,
        propagation,
        batch,
        allocation,
        summary,
        outputs: vec![outlook_path, simulations_path, bids_path, summary_path],
    })
}
