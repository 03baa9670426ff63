use async_trait::async_trait;
use broker_gateway::{DryRunExecutor, PaperExecutor};
use chrono::{DateTime, TimeZone, Utc};
use portfolio_manager::{Collaborators, CycleError, CycleResult, TradingCycle};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trading::{
    CycleSummary, ExecutorError, Instrument, InstrumentId, LedgerStore, MarketDataProvider, MarketSnapshot,
    OrderExecutor, OrderOutcome, OrderPlan, OrderRationale, Portfolio, ProviderError, ReportError, ReportSink,
    Side, TradeLedgerEntry,
};
use trading_core::config::AppConfig;
use trading_core::fs::JsonLedgerStore;
use uuid::Uuid;

// 2024-06-10 is a Monday; the week runs until Monday 2024-06-17 00:00 UTC.
fn tuesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 11, 9, 30, 0).unwrap()
}

fn thursday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 13, 9, 30, 0).unwrap()
}

fn config(universe: &[&str]) -> AppConfig {
    AppConfig {
        universe: universe.iter().map(|s| InstrumentId::new(*s)).collect(),
        opening_cash: 100_000.0,
        ..AppConfig::default()
    }
}

/// `points` prices growing by `step` per point, ending at the quote.
fn trending(id: &str, start: f64, step: f64, points: usize) -> Instrument {
    let mut series: Vec<f64> = (0..points).map(|i| start * (1.0 + step).powi(i as i32)).collect();
    let last = series.pop().unwrap();
    Instrument::new(id, last, series, 1_000_000.0)
}

struct StaticFeed {
    snapshot: MarketSnapshot,
    delay: Option<Duration>,
    fail: bool,
}

impl StaticFeed {
    fn new(instruments: Vec<Instrument>) -> Self {
        let mut snapshot = MarketSnapshot::new(tuesday());
        for instrument in instruments {
            snapshot.insert(instrument);
        }
        Self {
            snapshot,
            delay: None,
            fail: false,
        }
    }
}

#[async_trait]
impl MarketDataProvider for StaticFeed {
    async fn fetch_snapshot(
        &self,
        instrument_ids: &[InstrumentId],
        _lookback_window: usize,
    ) -> Result<MarketSnapshot, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::DataUnavailable("vendor down".into()));
        }
        let mut snapshot = self.snapshot.clone();
        snapshot.retain_ids(instrument_ids);
        Ok(snapshot)
    }
}

struct SlowExecutor;

#[async_trait]
impl OrderExecutor for SlowExecutor {
    async fn submit(&mut self, _plan: &OrderPlan) -> Result<Vec<OrderOutcome>, ExecutorError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
struct CollectingSink {
    published: Arc<Mutex<Vec<CycleSummary>>>,
}

impl ReportSink for CollectingSink {
    fn publish(&mut self, summary: &CycleSummary) -> Result<(), ReportError> {
        self.published.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

struct BrokenSink;

impl ReportSink for BrokenSink {
    fn publish(&mut self, _summary: &CycleSummary) -> Result<(), ReportError> {
        Err(ReportError::Publish(anyhow::anyhow!("mail relay down")))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    ledger_path: PathBuf,
    opening_cash: f64,
}

impl Harness {
    fn new(opening_cash: f64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("ledger.json");
        Self {
            _dir: dir,
            ledger_path,
            opening_cash,
        }
    }

    fn ledger(&self) -> JsonLedgerStore {
        JsonLedgerStore::new(self.ledger_path.clone(), self.opening_cash)
    }

    fn entries(&self) -> Vec<TradeLedgerEntry> {
        self.ledger().load_history().unwrap().entries
    }

    fn cycle(
        &self,
        config: AppConfig,
        feed: impl MarketDataProvider + 'static,
        executor: impl OrderExecutor + 'static,
        reports: impl ReportSink + 'static,
    ) -> TradingCycle {
        TradingCycle::new(
            config,
            Collaborators {
                market_data: Box::new(feed),
                executor: Box::new(executor),
                ledger: Box::new(self.ledger()),
                reports: Box::new(reports),
            },
        )
    }
}

fn rising_universe() -> Vec<Instrument> {
    vec![
        trending("AAA", 100.0, 0.010, 8),
        trending("BBB", 50.0, 0.008, 8),
        trending("CCC", 20.0, 0.006, 8),
        trending("DDD", 80.0, 0.004, 8),
    ]
}

fn assert_valuation_identity(result: &CycleResult, snapshot: &[Instrument]) {
    let p = &result.portfolio;
    let marked: f64 = p
        .positions()
        .map(|pos| {
            let quote = snapshot
                .iter()
                .find(|i| i.id() == pos.instrument_id())
                .map(|i| i.last_price())
                .unwrap();
            pos.quantity() as f64 * quote
        })
        .sum();
    assert_eq!(result.valuation, p.cash() + marked);
    assert_eq!(result.valuation, p.total_valuation());
}

#[tokio::test]
async fn test_first_cycle_buys_and_satisfies_the_week() {
    let harness = Harness::new(100_000.0);
    let sink = CollectingSink::default();
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()),
        sink.clone(),
    );

    let result = cycle.run_cycle(tuesday()).await.unwrap();

    assert!(!result.plan.is_empty());
    assert!(result.plan.iter().all(|o| o.side() == Side::Buy));
    assert_eq!(result.fills.len(), result.plan.len());
    assert!(result.weekly_target.trade_already_satisfied());
    assert!(!result.guarantee_unmet);
    assert!(result.portfolio.cash() >= 0.0);
    for position in result.portfolio.positions() {
        assert!(position.market_value() <= 0.25 * 100_000.0);
    }
    assert_valuation_identity(&result, &rising_universe());

    let entries = harness.entries();
    assert_eq!(entries.len(), result.fills.len());
    assert!(entries.iter().all(|e| e.cycle_id == result.cycle_id));

    let published = sink.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert!(published[0].guarantee_met);
    assert_eq!(published[0].orders_executed, result.fills.len());
}

#[tokio::test]
async fn test_same_day_rerun_without_new_entries_plans_identically() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        DryRunExecutor,
        CollectingSink::default(),
    );

    let first = cycle.run_cycle(tuesday()).await.unwrap();
    let second = cycle.run_cycle(tuesday()).await.unwrap();

    assert!(!first.plan.is_empty());
    assert_eq!(first.plan, second.plan);
    assert_eq!(first.portfolio, second.portfolio);
    assert!(harness.entries().is_empty());
    assert!(!second.weekly_target.trade_already_satisfied());
}

#[tokio::test]
async fn test_rerun_after_fills_reloads_state_from_ledger() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let first = cycle.run_cycle(tuesday()).await.unwrap();
    let second = cycle.run_cycle(tuesday()).await.unwrap();

    assert!(second.weekly_target.trade_already_satisfied());
    assert!(second.portfolio.cash() >= 0.0);
    assert!(second.portfolio.cash() <= first.portfolio.cash());
    for position in second.portfolio.positions() {
        assert!(position.market_value() <= 0.25 * 100_000.0);
    }
    assert_eq!(harness.entries().len(), first.fills.len() + second.fills.len());
}

#[tokio::test]
async fn test_no_usable_history_on_closing_day_reports_guarantee_unmet() {
    let harness = Harness::new(100_000.0);
    let short = vec![trending("AAA", 100.0, 0.01, 2), trending("BBB", 50.0, 0.01, 3)];
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB"]),
        StaticFeed::new(short),
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(thursday()).await.unwrap();

    assert!(result.guarantee_unmet);
    assert!(result.plan.is_empty());
    assert_eq!(result.portfolio, Portfolio::new(100_000.0));
    assert_eq!(
        result.excluded_instruments,
        vec![InstrumentId::new("AAA"), InstrumentId::new("BBB")]
    );
    assert!(!result.summary().guarantee_met);
    assert!(!harness.ledger_path.exists());
}

#[tokio::test]
async fn test_guarantee_forces_minimal_trade_on_closing_day() {
    let harness = Harness::new(100_000.0);
    let flat = vec![trending("AAA", 100.0, 0.0, 8), trending("BBB", 100.0, 0.0, 8)];
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB"]),
        StaticFeed::new(flat),
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(thursday()).await.unwrap();

    assert_eq!(result.plan.len(), 1);
    let order = &result.plan.orders()[0];
    assert_eq!(order.rationale(), OrderRationale::WeeklyGuarantee);
    assert_eq!(order.instrument_id().as_str(), "AAA");
    // Smallest lot whose 29 + 0.055% commission stays within 1%: 31 units at 100.
    assert_eq!(order.quantity(), 31);
    assert!(!result.guarantee_unmet);
    assert!(result.weekly_target.trade_already_satisfied());
    assert_eq!(harness.entries().len(), 1);
}

#[tokio::test]
async fn test_guarantee_never_fires_once_the_week_has_traded() {
    let harness = Harness::new(100_000.0);
    harness
        .ledger()
        .append(&[TradeLedgerEntry {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 10, 15, 0, 0).unwrap(),
            instrument_id: InstrumentId::new("AAA"),
            side: Side::Buy,
            quantity: 40,
            price: 100.0,
            commission: 31.2,
            resulting_valuation: 99_968.8,
        }])
        .unwrap();
    let flat = vec![trending("AAA", 100.0, 0.0, 8), trending("BBB", 100.0, 0.0, 8)];
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB"]),
        StaticFeed::new(flat),
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(thursday()).await.unwrap();

    assert!(result.plan.is_empty());
    assert!(!result.guarantee_unmet);
    assert!(result.weekly_target.trade_already_satisfied());
    assert_eq!(result.portfolio.quantity(&InstrumentId::new("AAA")), 40);
    assert_eq!(harness.entries().len(), 1);
}

#[tokio::test]
async fn test_partial_fills_are_booked_at_filled_quantity() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()).with_fill_ratio(0.5),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(tuesday()).await.unwrap();

    assert!(!result.fills.is_empty());
    for (order, entry) in result.plan.iter().zip(harness.entries()) {
        assert_eq!(entry.quantity, order.quantity() / 2);
        assert_eq!(result.portfolio.quantity(order.instrument_id()), order.quantity() / 2);
    }
    assert!(result.weekly_target.trade_already_satisfied());
}

#[tokio::test]
async fn test_rejected_orders_leave_the_rest_of_the_plan_in_place() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()).with_halted("AAA"),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(tuesday()).await.unwrap();

    assert_eq!(result.rejections.len(), 1);
    assert_eq!(result.rejections[0].instrument, InstrumentId::new("AAA"));
    assert_eq!(result.portfolio.quantity(&InstrumentId::new("AAA")), 0);
    assert_eq!(result.fills.len(), result.plan.len() - 1);
    assert_eq!(result.summary().rejected_orders, 1);
}

#[tokio::test]
async fn test_halted_sell_never_overdraws_cash() {
    let harness = Harness::new(100_000.0);
    // Last week's buy spent all opening cash.
    harness
        .ledger()
        .append(&[TradeLedgerEntry {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 4, 15, 0, 0).unwrap(),
            instrument_id: InstrumentId::new("XXX"),
            side: Side::Buy,
            quantity: 1_000,
            price: 100.0,
            commission: 0.0,
            resulting_valuation: 100_000.0,
        }])
        .unwrap();
    let mut instruments = rising_universe();
    instruments.push(trending("XXX", 120.0, -0.02, 8));
    let config = config(&["AAA", "BBB", "CCC", "DDD"]);
    let weekly = config.weekly;
    let mut cycle = harness.cycle(
        config,
        StaticFeed::new(instruments),
        PaperExecutor::new(Default::default()).with_halted("XXX"),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(tuesday()).await.unwrap();

    let sell = &result.plan.orders()[0];
    assert_eq!(sell.instrument_id().as_str(), "XXX");
    assert_eq!(sell.side(), Side::Sell);
    assert!(result.plan.len() > 1);
    // The sell was refused, so none of the buys it was meant to fund are booked.
    assert!(result.fills.is_empty());
    assert_eq!(result.rejections.len(), result.plan.len());
    assert_eq!(result.portfolio.cash(), 0.0);
    assert_eq!(result.portfolio.quantity(&InstrumentId::new("XXX")), 1_000);
    assert!(!result.weekly_target.trade_already_satisfied());

    let (reloaded, _) = harness.ledger().load_state(tuesday(), &weekly).unwrap();
    assert!(reloaded.cash() >= 0.0);
    assert_eq!(harness.entries().len(), 1);
}

#[tokio::test]
async fn test_refused_forced_trade_misses_the_guarantee() {
    let harness = Harness::new(100_000.0);
    let flat = vec![trending("AAA", 100.0, 0.0, 8), trending("BBB", 100.0, 0.0, 8)];
    let sink = CollectingSink::default();
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB"]),
        StaticFeed::new(flat),
        PaperExecutor::new(Default::default()).with_halted("AAA"),
        sink.clone(),
    );

    let result = cycle.run_cycle(thursday()).await.unwrap();

    assert_eq!(result.plan.len(), 1);
    assert_eq!(result.plan.orders()[0].rationale(), OrderRationale::WeeklyGuarantee);
    assert_eq!(result.rejections.len(), 1);
    assert!(!result.guarantee_unmet);
    assert!(!result.guarantee_met);
    assert!(!result.summary().guarantee_met);
    assert!(!sink.published.lock().unwrap()[0].guarantee_met);
    assert!(harness.entries().is_empty());
}

#[tokio::test]
async fn test_unreachable_venue_fills_nothing() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()).offline(),
        CollectingSink::default(),
    );

    let result = cycle.run_cycle(tuesday()).await.unwrap();

    assert!(result.fills.is_empty());
    assert_eq!(result.rejections.len(), result.plan.len());
    assert!(!result.weekly_target.trade_already_satisfied());
    assert_eq!(result.portfolio, Portfolio::new(100_000.0));
    assert!(!harness.ledger_path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_market_data_timeout_aborts_the_cycle() {
    let harness = Harness::new(100_000.0);
    let mut feed = StaticFeed::new(rising_universe());
    feed.delay = Some(Duration::from_secs(3_600));
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        feed,
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let err = cycle.run_cycle(tuesday()).await.unwrap_err();
    assert!(matches!(
        err,
        CycleError::ExternalUnavailable {
            operation: "market data fetch",
            ..
        }
    ));
    assert!(!harness.ledger_path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_execution_timeout_aborts_without_logging() {
    let harness = Harness::new(100_000.0);
    let sink = CollectingSink::default();
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        SlowExecutor,
        sink.clone(),
    );

    let err = cycle.run_cycle(tuesday()).await.unwrap_err();
    assert!(matches!(
        err,
        CycleError::ExternalUnavailable {
            operation: "order submission",
            ..
        }
    ));
    assert!(!harness.ledger_path.exists());
    assert!(sink.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_failure_is_data_unavailable() {
    let harness = Harness::new(100_000.0);
    let mut feed = StaticFeed::new(rising_universe());
    feed.fail = true;
    let mut cycle = harness.cycle(
        config(&["AAA"]),
        feed,
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );
    assert!(matches!(
        cycle.run_cycle(tuesday()).await,
        Err(CycleError::DataUnavailable(_))
    ));
}

#[tokio::test]
async fn test_held_instrument_without_quote_aborts() {
    let harness = Harness::new(100_000.0);
    harness
        .ledger()
        .append(&[TradeLedgerEntry {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap(),
            instrument_id: InstrumentId::new("GONE"),
            side: Side::Buy,
            quantity: 10,
            price: 10.0,
            commission: 29.0,
            resulting_valuation: 99_971.0,
        }])
        .unwrap();
    let mut cycle = harness.cycle(
        config(&["AAA"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()),
        CollectingSink::default(),
    );

    let err = cycle.run_cycle(tuesday()).await.unwrap_err();
    assert!(matches!(err, CycleError::DataUnavailable(ref msg) if msg.contains("GONE")));
    assert_eq!(harness.entries().len(), 1);
}

#[tokio::test]
async fn test_report_failure_does_not_fail_the_cycle() {
    let harness = Harness::new(100_000.0);
    let mut cycle = harness.cycle(
        config(&["AAA", "BBB", "CCC", "DDD"]),
        StaticFeed::new(rising_universe()),
        PaperExecutor::new(Default::default()),
        BrokenSink,
    );
    let result = cycle.run_cycle(tuesday()).await.unwrap();
    assert!(!result.fills.is_empty());
    assert_eq!(harness.entries().len(), result.fills.len());
}
