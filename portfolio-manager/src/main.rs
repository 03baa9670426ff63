use anyhow::{Context, Result};
use broker_gateway::{DryRunExecutor, PaperExecutor};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use dummy_feed::{FileFeed, RandomWalkFeed};
use log::{error, info};
use portfolio_manager::{Collaborators, TradingCycle};
use trading::{MarketDataProvider, OrderExecutor};
use trading_core::args::CommonArgs;
use trading_core::config::AppConfig;
use trading_core::fs::{JsonLedgerStore, PathManager};
use trading_core::report::{CompositeReportSink, JsonReportSink, LogReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FeedKind {
    /// The snapshot file in the data directory
    File,
    /// Seeded random walks
    Synthetic,
}

#[derive(Parser, Debug)]
#[command(version, about = "Run one weekly-momentum trading cycle")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Where market data comes from
    #[arg(long, value_enum, default_value_t = FeedKind::File)]
    feed: FeedKind,

    /// Seed for the synthetic feed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Log the final plan without filling any order
    #[arg(long)]
    dry_run: bool,

    /// Cycle clock as RFC 3339 (defaults to now)
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AppConfig::load(args.common.get_config_file().as_deref())
        .context("loading configuration")?
        .with_data_dir(args.common.get_data_dir());
    let paths = PathManager::new(&config.data_dir);
    paths.ensure_dirs().context("creating data directory")?;

    let market_data: Box<dyn MarketDataProvider> = match args.feed {
        FeedKind::File => Box::new(FileFeed::new(paths.snapshot_file())),
        FeedKind::Synthetic => Box::new(RandomWalkFeed::new(args.seed)),
    };
    let executor: Box<dyn OrderExecutor> = if args.dry_run {
        info!("Dry run: orders will be logged, not filled");
        Box::new(DryRunExecutor)
    } else {
        Box::new(PaperExecutor::new(config.fees))
    };
    let mut reports = CompositeReportSink::new();
    reports.add_sink(Box::new(LogReportSink));
    reports.add_sink(Box::new(JsonReportSink::new(paths.report_file())));

    let collaborators = Collaborators {
        market_data,
        executor,
        ledger: Box::new(JsonLedgerStore::new(paths.ledger_file(), config.opening_cash)),
        reports: Box::new(reports),
    };
    let mut cycle = TradingCycle::new(config, collaborators);

    let now = args.now.unwrap_or_else(Utc::now);
    match cycle.run_cycle(now).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!("Cycle aborted: {}", e);
            Err(e.into())
        }
    }
}
