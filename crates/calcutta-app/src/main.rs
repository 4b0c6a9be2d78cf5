// Calcutta entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr; stdout carries the bid sheet)
// 2. Load config (copying defaults on first run)
// 3. Build the model registry
// 4. Run the pipeline and write exports
// 5. Print the recommended bids

use anyhow::Context;
use calcutta_app::{config, pipeline};
use calcutta_core::ModelRegistry;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("calcutta starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "config loaded: {}, {} simulations on {} workers, budget {}",
        config.tournament.name,
        config.strategy.simulation.count,
        config.strategy.simulation.workers,
        config.strategy.optimizer.budget
    );

    let registry = ModelRegistry::with_defaults(config.strategy.model.seed_scale);
    let report = pipeline::run(&config, &registry)?;

    println!("{} - recommended bids", report.summary.tournament);
    println!("{:<20} {:>6} {:>10} {:>10}", "team", "bid", "ownership", "return");
    for bid in &report.summary.bids {
        println!(
            "{:<20} {:>6} {:>9.1}% {:>10.2}",
            bid.team_id,
            bid.bid,
            bid.ownership * 100.0,
            bid.expected_return
        );
    }
    println!(
        "spent {} of {}, expected return {:.2} points",
        report.summary.total_spent, report.summary.budget, report.summary.expected_return
    );
    for path in &report.outputs {
        println!("wrote {}", path.display());
    }

    info!("calcutta finished");
    Ok(())
}

/// Initialize tracing to stderr, filtered by `RUST_LOG`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("calcutta_core=info,calcutta_app=info,calcutta=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
