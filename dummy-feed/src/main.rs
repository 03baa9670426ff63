//! Writes a synthetic market snapshot for the configured universe into the
//! data directory, where the trader's file feed picks it up.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dummy_feed::RandomWalkFeed;
use log::info;
use trading::MarketDataProvider;
use trading_core::args::CommonArgs;
use trading_core::config::AppConfig;
use trading_core::fs::{save_state, PathManager};

#[derive(Parser, Debug)]
#[command(version, about = "Generate a synthetic market snapshot")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Seed of the random walks
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Constant per-step drift (0.002 = +0.2% per step)
    #[arg(long, default_value_t = 0.0)]
    drift: f64,

    /// Maximum absolute step as a fraction of price
    #[arg(long, default_value_t = 0.01)]
    step: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AppConfig::load(args.common.get_config_file().as_deref())
        .context("loading configuration")?
        .with_data_dir(args.common.get_data_dir());
    if config.universe.is_empty() {
        bail!("the configured universe is empty; nothing to generate");
    }

    let feed = RandomWalkFeed::new(args.seed)
        .with_drift(args.drift)
        .with_step(args.step);
    let snapshot = feed
        .fetch_snapshot(&config.universe, config.strategy.lookback_window)
        .await
        .context("generating snapshot")?;

    let paths = PathManager::new(&config.data_dir);
    paths.ensure_dirs().context("creating data directory")?;
    save_state(&paths.snapshot_file(), &snapshot)?;
    info!(
        "Wrote {} instruments x {} points to {}",
        snapshot.len(),
        config.strategy.lookback_window,
        paths.snapshot_file().display()
    );
    Ok(())
}
