//! The constraint-resolution core.
//!
//! One `PortfolioManager` lives for exactly one cycle and walks
//! `Idle -> Scored -> Constrained -> (Guaranteed) -> ReadyToExecute -> Executed -> Logged`.
//! Calling a step out of order is an `IllegalTransition` and leaves the
//! manager untouched.

use crate::error::CycleError;
use crate::risk_guard::{sector_map, RiskContext, RiskDecision, RiskGuard};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trading::{
    CandidateScore, ExecutionRejected, FeeSchedule, Fill, LedgerStore, OrderOutcome, OrderPlan,
    OrderRationale, PlannedOrder, Portfolio, RiskLimits, Side, TradeLedgerEntry, WeeklyTarget,
};
use uuid::Uuid;

pub mod fallback;

pub use fallback::{FallbackSizing, MinimalCommissionLot};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleState {
    Idle,
    Scored,
    Constrained,
    Guaranteed,
    ReadyToExecute,
    Executed,
    Logged,
}

/// An order removed from the plan by the hard constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedOrder {
    pub order: PlannedOrder,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuaranteeOutcome {
    /// The plan already trades, the week is satisfied, or the window is not closing yet.
    NotRequired,
    /// A minimal fallback order was added to the plan.
    Forced(PlannedOrder),
    /// No candidate could carry even a minimal trade.
    Unmet,
}

pub struct PortfolioManager {
    state: CycleState,
    portfolio: Portfolio,
    target: WeeklyTarget,
    limits: RiskLimits,
    fees: FeeSchedule,
    fallback: Arc<dyn FallbackSizing>,
    valuation: f64,
    ranking: Vec<CandidateScore>,
    plan: OrderPlan,
    dropped: Vec<DroppedOrder>,
    guarantee_checked: bool,
    guarantee_unmet: bool,
    fills: Vec<Fill>,
    rejections: Vec<ExecutionRejected>,
    entries: Vec<TradeLedgerEntry>,
}

impl PortfolioManager {
    /// `portfolio` must already be marked against this cycle's snapshot.
    pub fn new(portfolio: Portfolio, target: WeeklyTarget, limits: RiskLimits, fees: FeeSchedule) -> Self {
        Self {
            state: CycleState::Idle,
            valuation: portfolio.total_valuation(),
            portfolio,
            target,
            limits,
            fees,
            fallback: Arc::new(MinimalCommissionLot),
            ranking: Vec::new(),
            plan: OrderPlan::default(),
            dropped: Vec::new(),
            guarantee_checked: false,
            guarantee_unmet: false,
            fills: Vec::new(),
            rejections: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackSizing>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn target(&self) -> &WeeklyTarget {
        &self.target
    }

    pub fn plan(&self) -> &OrderPlan {
        &self.plan
    }

    pub fn dropped(&self) -> &[DroppedOrder] {
        &self.dropped
    }

    pub fn guarantee_unmet(&self) -> bool {
        self.guarantee_unmet
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn rejections(&self) -> &[ExecutionRejected] {
        &self.rejections
    }

    pub fn entries(&self) -> &[TradeLedgerEntry] {
        &self.entries
    }

    /// Valuation at cycle start, the base of every exposure cap.
    pub fn starting_valuation(&self) -> f64 {
        self.valuation
    }

    fn advance(&mut self, allowed: &[CycleState], to: CycleState) -> Result<(), CycleError> {
        if !allowed.contains(&self.state) {
            return Err(CycleError::IllegalTransition { from: self.state, to });
        }
        debug!("Cycle state {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// `Idle -> Scored`: takes the strategy's tentative plan and the full ranking
    /// it was built from.
    pub fn receive_proposal(&mut self, plan: OrderPlan, ranking: Vec<CandidateScore>) -> Result<(), CycleError> {
        self.advance(&[CycleState::Idle], CycleState::Scored)?;
        info!("Received proposal with {} orders over {} ranked candidates", plan.len(), ranking.len());
        self.plan = plan;
        self.ranking = ranking;
        Ok(())
    }

    /// `Scored -> Constrained`: drops orders that are not worth their commission
    /// and orders the running cash balance cannot cover. Orders are dropped,
    /// never shrunk. Sells run first in the plan, so their proceeds count.
    pub fn constrain(&mut self) -> Result<&OrderPlan, CycleError> {
        self.advance(&[CycleState::Scored], CycleState::Constrained)?;

        let mut cash = self.portfolio.cash();
        let proposed = std::mem::take(&mut self.plan);
        for order in proposed.into_orders() {
            let notional = order.notional();
            let commission = order.estimated_commission();
            if !self.fees.within_commission_ratio(notional, commission) {
                self.drop_order(
                    order,
                    format!(
                        "commission {:.2} exceeds {:.2}% of trade value {:.2}",
                        commission,
                        self.fees.max_commission_ratio * 100.0,
                        notional
                    ),
                );
                continue;
            }
            let after = cash + order.cash_delta();
            if after < 0.0 {
                self.drop_order(order, format!("would take cash from {:.2} to {:.2}", cash, after));
                continue;
            }
            cash = after;
            self.plan.push(order);
        }

        info!(
            "Constrained plan: {} orders kept, {} dropped",
            self.plan.len(),
            self.dropped.len()
        );
        Ok(&self.plan)
    }

    fn drop_order(&mut self, order: PlannedOrder, reason: String) {
        warn!(
            "Dropping {} {} x{}: {}",
            order.side(),
            order.instrument_id(),
            order.quantity(),
            reason
        );
        self.dropped.push(DroppedOrder { order, reason });
    }

    /// `Constrained -> Guaranteed` when the weekly guarantee has to fire.
    ///
    /// Fires only if the constrained plan is empty, nothing traded this week,
    /// and at most one business day of the window remains after today. It then
    /// walks the original ranking and adds one minimal buy for the first
    /// eligible candidate that passes the exposure, diversification, sector,
    /// commission and cash checks. The weekly capital cap does not apply.
    pub fn enforce_guarantee(&mut self, now: DateTime<Utc>) -> Result<GuaranteeOutcome, CycleError> {
        if self.state != CycleState::Constrained || self.guarantee_checked {
            return Err(CycleError::IllegalTransition {
                from: self.state,
                to: CycleState::Guaranteed,
            });
        }
        self.guarantee_checked = true;

        if !self.plan.is_empty() {
            debug!("Weekly guarantee not needed: plan already trades");
            return Ok(GuaranteeOutcome::NotRequired);
        }
        if self.target.trade_already_satisfied() {
            debug!("Weekly guarantee not needed: already traded this week");
            return Ok(GuaranteeOutcome::NotRequired);
        }
        if !self.target.closes_within_one_business_day(now) {
            debug!(
                "Weekly guarantee not needed yet: {} business days left",
                self.target.business_days_remaining(now)
            );
            return Ok(GuaranteeOutcome::NotRequired);
        }

        self.advance(&[CycleState::Constrained], CycleState::Guaranteed)?;
        info!(
            "Weekly window closes {} without a trade; forcing a minimal trade",
            self.target.window_end()
        );

        let guard = RiskGuard::for_limits(&self.limits);
        let sectors = sector_map(&self.ranking);
        for candidate in self.ranking.iter().filter(|c| c.eligible) {
            let id = &candidate.instrument_id;
            let price = candidate.price;
            let Some(quantity) = self.fallback.quantity(price, &self.fees) else {
                debug!("{} cannot size a minimal lot for {} at {:.2}", self.fallback.name(), id, price);
                continue;
            };
            let notional = quantity as f64 * price;
            let commission = self.fees.commission(notional);
            if !self.fees.within_commission_ratio(notional, commission) {
                continue;
            }
            if notional + commission > self.portfolio.cash() {
                debug!(
                    "Minimal lot of {} costs {:.2}, cash is {:.2}",
                    id,
                    notional + commission,
                    self.portfolio.cash()
                );
                continue;
            }

            let order = PlannedOrder::new(
                id.clone(),
                Side::Buy,
                quantity,
                price,
                commission,
                OrderRationale::WeeklyGuarantee,
            );
            let ctx = RiskContext {
                portfolio: &self.portfolio,
                limits: &self.limits,
                valuation: self.valuation,
                sectors: &sectors,
            };
            if let RiskDecision::Rejected(reason) = guard.check(&order, &ctx) {
                debug!("Minimal lot of {} rejected: {}", id, reason);
                continue;
            }

            info!("Weekly guarantee: BUY {} x{} @ {:.2}", id, quantity, price);
            self.plan.push(order.clone());
            return Ok(GuaranteeOutcome::Forced(order));
        }

        warn!("GuaranteeUnmet: no candidate can carry a minimal trade this week");
        self.guarantee_unmet = true;
        Ok(GuaranteeOutcome::Unmet)
    }

    /// `Constrained | Guaranteed -> ReadyToExecute`. The guarantee must have been evaluated.
    pub fn ready_to_execute(&mut self) -> Result<&OrderPlan, CycleError> {
        if self.state == CycleState::Constrained && !self.guarantee_checked {
            return Err(CycleError::IllegalTransition {
                from: self.state,
                to: CycleState::ReadyToExecute,
            });
        }
        self.advance(
            &[CycleState::Constrained, CycleState::Guaranteed],
            CycleState::ReadyToExecute,
        )?;
        info!(
            "Final plan: {} orders, estimated commission {:.2}",
            self.plan.len(),
            self.plan.total_commission()
        );
        Ok(&self.plan)
    }

    /// `ReadyToExecute -> Executed`: books confirmed fills.
    ///
    /// Sell fills are booked before buy fills, so a buy only spends proceeds
    /// that actually arrived. Each fill is clamped to what is left of its plan
    /// order, which also bounds split fills. A buy is further capped at what
    /// the cash balance covers; the uncovered part is recorded as a rejection.
    /// Rejected orders leave the portfolio untouched. Any booked fill
    /// satisfies the week. One ledger entry is prepared per booked fill.
    pub fn apply_fills(
        &mut self,
        outcomes: &[OrderOutcome],
        cycle_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<&[TradeLedgerEntry], CycleError> {
        self.advance(&[CycleState::ReadyToExecute], CycleState::Executed)?;

        let mut fills = Vec::new();
        for outcome in outcomes {
            match outcome {
                OrderOutcome::Rejected(rejection) => {
                    warn!("{}", rejection);
                    self.rejections.push(rejection.clone());
                }
                OrderOutcome::Filled(fill) => fills.push(fill),
            }
        }
        fills.sort_by_key(|fill| fill.side == Side::Buy);

        let mut booked_per_order = vec![0u64; self.plan.len()];
        for fill in fills {
            let Some(index) = self
                .plan
                .iter()
                .position(|o| o.instrument_id() == &fill.instrument_id && o.side() == fill.side)
            else {
                warn!("Ignoring fill for {} {}: not in the plan", fill.side, fill.instrument_id);
                continue;
            };
            if fill.filled_quantity == 0 {
                debug!("Zero fill for {} {}", fill.side, fill.instrument_id);
                continue;
            }
            if !fill.fill_price.is_finite() || fill.fill_price <= 0.0 {
                warn!("Ignoring fill for {} at invalid price {}", fill.instrument_id, fill.fill_price);
                continue;
            }

            let ordered = self.plan.orders()[index].quantity();
            let open = ordered - booked_per_order[index];
            if open == 0 {
                warn!("Ignoring fill for {} {}: order already filled", fill.side, fill.instrument_id);
                continue;
            }
            let mut quantity = fill.filled_quantity.min(open);
            let mut commission = fill.commission_charged;
            if fill.side == Side::Buy {
                let cash = self.portfolio.cash();
                if quantity as f64 * fill.fill_price + commission > cash {
                    let covered = self.fees.max_affordable_quantity(fill.fill_price, cash).min(quantity);
                    self.rejections.push(ExecutionRejected {
                        instrument: fill.instrument_id.clone(),
                        reason: format!(
                            "cash {:.2} covers {} of {} filled units",
                            cash, covered, quantity
                        ),
                    });
                    warn!(
                        "Booking {} of {} filled units of {}: cash {:.2}",
                        covered, quantity, fill.instrument_id, cash
                    );
                    quantity = covered;
                    commission = self.fees.commission(covered as f64 * fill.fill_price);
                }
            }
            if quantity < ordered {
                info!(
                    "Partial fill: {} {} {}/{}",
                    fill.side, fill.instrument_id, quantity, ordered
                );
            }

            let booked = self.portfolio.apply_fill(
                &fill.instrument_id,
                fill.side,
                quantity,
                fill.fill_price,
                commission,
            );
            if booked == 0 {
                continue;
            }
            booked_per_order[index] += booked;

            info!(
                "Filled {} {} x{} @ {:.2} (commission {:.2})",
                fill.side, fill.instrument_id, booked, fill.fill_price, commission
            );
            self.entries.push(TradeLedgerEntry {
                id: Uuid::new_v4(),
                cycle_id,
                timestamp: now,
                instrument_id: fill.instrument_id.clone(),
                side: fill.side,
                quantity: booked,
                price: fill.fill_price,
                commission,
                resulting_valuation: self.portfolio.total_valuation(),
            });
            self.fills.push(Fill {
                filled_quantity: booked,
                commission_charged: commission,
                ..fill.clone()
            });
        }

        if !self.entries.is_empty() {
            self.target.mark_satisfied();
        }
        Ok(&self.entries)
    }

    /// True once the week has traded, or while the window is not yet closing.
    /// A closing window without a booked fill misses the weekly guarantee,
    /// whether no candidate qualified or the venue refused the orders.
    pub fn guarantee_met(&self, now: DateTime<Utc>) -> bool {
        self.target.trade_already_satisfied() || !self.target.closes_within_one_business_day(now)
    }

    /// `Executed -> Logged`: appends the cycle's entries in one atomic batch.
    ///
    /// On failure the state stays `Executed` and the error is returned; the
    /// next invocation rebuilds everything from the unchanged ledger.
    pub fn record(&mut self, ledger: &mut dyn LedgerStore) -> Result<&[TradeLedgerEntry], CycleError> {
        if self.state != CycleState::Executed {
            return Err(CycleError::IllegalTransition {
                from: self.state,
                to: CycleState::Logged,
            });
        }
        ledger.append(&self.entries)?;
        self.advance(&[CycleState::Executed], CycleState::Logged)?;
        info!("Logged {} ledger entries", self.entries.len());
        Ok(&self.entries)
    }
}
