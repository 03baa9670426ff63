//! The `run_cycle` entry point.
//!
//! Every invocation rebuilds the portfolio and the weekly target from the
//! ledger, so running it several times on the same day never double counts a
//! trade or double spends cash.

use crate::error::CycleError;
use crate::manager::{DroppedOrder, FallbackSizing, MinimalCommissionLot, PortfolioManager};
use crate::risk_guard;
use crate::strategy::MomentumStrategy;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use trading::{
    CycleSummary, ExecutionRejected, Fill, InstrumentId, LedgerStore, MarketDataProvider, MarketSnapshot,
    OrderExecutor, OrderOutcome, OrderPlan, Portfolio, ProviderError, ReportSink, TradeLedgerEntry,
    WeeklyTarget,
};
use trading_core::config::AppConfig;
use uuid::Uuid;

/// Everything one cycle decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// The final plan handed to the executor.
    pub plan: OrderPlan,
    /// Portfolio after fills, marked at this cycle's prices.
    pub portfolio: Portfolio,
    pub weekly_target: WeeklyTarget,
    /// The weekly guarantee had to fire and no candidate could carry it.
    pub guarantee_unmet: bool,
    /// False when the window is closing and the week still has no booked trade.
    pub guarantee_met: bool,
    pub excluded_instruments: Vec<InstrumentId>,
    pub dropped_orders: Vec<DroppedOrder>,
    pub rejections: Vec<ExecutionRejected>,
    pub fills: Vec<Fill>,
    pub ledger_entries: Vec<TradeLedgerEntry>,
    pub valuation: f64,
    pub diversification: f64,
    pub portfolio_volatility: f64,
    /// Market value per sector; unclassified holdings fall under "unknown".
    pub sector_exposure: BTreeMap<String, f64>,
}

impl CycleResult {
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            cycle_id: self.cycle_id,
            date: self.timestamp,
            orders_executed: self.fills.len(),
            portfolio_valuation: self.valuation,
            guarantee_met: self.guarantee_met,
            trade_satisfied_this_week: self.weekly_target.trade_already_satisfied(),
            excluded_instruments: self.excluded_instruments.clone(),
            rejected_orders: self.rejections.len(),
            diversification: self.diversification,
            portfolio_volatility: self.portfolio_volatility,
        }
    }
}

/// The external collaborators of a cycle.
pub struct Collaborators {
    pub market_data: Box<dyn MarketDataProvider>,
    pub executor: Box<dyn OrderExecutor>,
    pub ledger: Box<dyn LedgerStore>,
    pub reports: Box<dyn ReportSink>,
}

pub struct TradingCycle {
    config: AppConfig,
    strategy: MomentumStrategy,
    fallback: Arc<dyn FallbackSizing>,
    market_data: Box<dyn MarketDataProvider>,
    executor: Box<dyn OrderExecutor>,
    ledger: Box<dyn LedgerStore>,
    reports: Box<dyn ReportSink>,
}

impl TradingCycle {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let strategy = MomentumStrategy::new(config.strategy, config.limits, config.fees);
        info!("Scoring with {}", strategy.model_name());
        Self {
            config,
            strategy,
            fallback: Arc::new(MinimalCommissionLot),
            market_data: collaborators.market_data,
            executor: collaborators.executor,
            ledger: collaborators.ledger,
            reports: collaborators.reports,
        }
    }

    pub fn with_strategy(mut self, strategy: MomentumStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackSizing>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Runs one complete cycle as of `now`.
    ///
    /// # Returns
    ///
    /// * `Ok(CycleResult)` - The cycle reached `Logged`. A `GuaranteeUnmet`
    ///   week, or a forced order the venue refused, is reported through
    ///   `guarantee_met`, not as an error.
    /// * `Err(CycleError)` - The cycle aborted; neither the ledger nor any
    ///   persisted state was changed.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleResult, CycleError> {
        let cycle_id = Uuid::new_v4();
        info!("Starting cycle {} at {}", cycle_id, now);

        let (mut portfolio, target) = self.ledger.load_state(now, &self.config.weekly)?;
        info!(
            "Loaded portfolio: cash {:.2}, {} positions; week {} .. {}, traded: {}",
            portfolio.cash(),
            portfolio.distinct_holdings(),
            target.window_start(),
            target.window_end(),
            target.trade_already_satisfied()
        );

        let ids = self.instrument_ids(&portfolio);
        let mut snapshot = self.fetch_snapshot(&ids).await?;
        snapshot.retain_ids(&ids);

        if let Err(missing) = portfolio.mark_to_market(&snapshot) {
            let names: Vec<&str> = missing.iter().map(|id| id.as_str()).collect();
            return Err(CycleError::DataUnavailable(format!(
                "no quote for held instruments: {}",
                names.join(", ")
            )));
        }

        let universe = self.strategy.score_snapshot(&snapshot);
        let excluded_instruments = universe.excluded_ids();
        let volatilities = universe.volatilities();
        let ranked = MomentumStrategy::rank_candidates(universe.scores);
        let proposal = self
            .strategy
            .propose_trades(&ranked, &portfolio, &target, &self.config.limits);

        let mut manager = PortfolioManager::new(portfolio, target, self.config.limits, self.config.fees)
            .with_fallback(Arc::clone(&self.fallback));
        manager.receive_proposal(proposal, ranked)?;
        manager.constrain()?;
        manager.enforce_guarantee(now)?;
        let plan = manager.ready_to_execute()?.clone();

        let outcomes = self.submit(&plan).await?;
        manager.apply_fills(&outcomes, cycle_id, now)?;
        manager.record(&mut *self.ledger)?;

        let portfolio = manager.portfolio().clone();
        let result = CycleResult {
            cycle_id,
            timestamp: now,
            plan,
            valuation: portfolio.total_valuation(),
            diversification: risk_guard::diversification_score(&portfolio),
            portfolio_volatility: risk_guard::portfolio_volatility(&portfolio, &volatilities),
            sector_exposure: risk_guard::exposure_by_sector(&portfolio, &snapshot.sectors()),
            portfolio,
            weekly_target: *manager.target(),
            guarantee_unmet: manager.guarantee_unmet(),
            guarantee_met: manager.guarantee_met(now),
            excluded_instruments,
            dropped_orders: manager.dropped().to_vec(),
            rejections: manager.rejections().to_vec(),
            fills: manager.fills().to_vec(),
            ledger_entries: manager.entries().to_vec(),
        };

        info!(
            "Cycle {} complete: {} fills, valuation {:.2}, guarantee met: {}",
            cycle_id,
            result.fills.len(),
            result.valuation,
            result.guarantee_met
        );
        if !result.guarantee_met {
            warn!(
                "Weekly guarantee missed: window closes {} without a booked trade",
                result.weekly_target.window_end()
            );
        }
        if let Err(e) = self.reports.publish(&result.summary()) {
            warn!("{}", e);
        }
        Ok(result)
    }

    /// The configured universe plus everything currently held.
    fn instrument_ids(&self, portfolio: &Portfolio) -> Vec<InstrumentId> {
        let mut ids: BTreeSet<InstrumentId> = self.config.universe.iter().cloned().collect();
        ids.extend(portfolio.holding_ids());
        ids.into_iter().collect()
    }

    async fn fetch_snapshot(&self, ids: &[InstrumentId]) -> Result<MarketSnapshot, CycleError> {
        let timeout = self.config.timeouts.market_data();
        let fetch = self
            .market_data
            .fetch_snapshot(ids, self.config.strategy.lookback_window);
        match tokio::time::timeout(timeout, fetch).await {
            Err(_) => Err(CycleError::ExternalUnavailable {
                operation: "market data fetch",
                timeout,
            }),
            Ok(Err(ProviderError::DataUnavailable(reason))) => Err(CycleError::DataUnavailable(reason)),
            Ok(Ok(snapshot)) => {
                info!("Fetched snapshot of {} instruments", snapshot.len());
                Ok(snapshot)
            }
        }
    }

    /// Submits a non-empty plan. A venue that cannot be reached at all means no
    /// order filled; only a timeout aborts the cycle.
    async fn submit(&mut self, plan: &OrderPlan) -> Result<Vec<OrderOutcome>, CycleError> {
        if plan.is_empty() {
            info!("Nothing to submit");
            return Ok(Vec::new());
        }
        let timeout = self.config.timeouts.execution();
        match tokio::time::timeout(timeout, self.executor.submit(plan)).await {
            Err(_) => Err(CycleError::ExternalUnavailable {
                operation: "order submission",
                timeout,
            }),
            Ok(Ok(outcomes)) => Ok(outcomes),
            Ok(Err(e)) => {
                warn!("{}; no order of this cycle filled", e);
                let reason = e.to_string();
                Ok(plan
                    .iter()
                    .map(|order| {
                        OrderOutcome::Rejected(ExecutionRejected {
                            instrument: order.instrument_id().clone(),
                            reason: reason.clone(),
                        })
                    })
                    .collect())
            }
        }
    }
}
