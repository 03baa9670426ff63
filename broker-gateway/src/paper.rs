use async_trait::async_trait;
use log::{info, warn};
use std::collections::BTreeSet;
use trading::{
    ExecutionRejected, ExecutorError, FeeSchedule, Fill, InstrumentId, OrderExecutor, OrderOutcome, OrderPlan,
};

/// Simulated venue. Every order fills at its reference price unless configured otherwise.
pub struct PaperExecutor {
    fees: FeeSchedule,
    fill_ratio: f64,
    halted: BTreeSet<InstrumentId>,
    offline: bool,
    submissions: usize,
}

impl PaperExecutor {
    pub fn new(fees: FeeSchedule) -> Self {
        Self {
            fees,
            fill_ratio: 1.0,
            halted: BTreeSet::new(),
            offline: false,
            submissions: 0,
        }
    }

    /// Fills only this fraction of each order, rounded down.
    pub fn with_fill_ratio(mut self, ratio: f64) -> Self {
        self.fill_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Rejects every order for `instrument`.
    pub fn with_halted(mut self, instrument: impl Into<InstrumentId>) -> Self {
        self.halted.insert(instrument.into());
        self
    }

    /// Fails whole submissions as if the venue could not be reached.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Number of plans submitted so far.
    pub fn submissions(&self) -> usize {
        self.submissions
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn submit(&mut self, plan: &OrderPlan) -> Result<Vec<OrderOutcome>, ExecutorError> {
        self.submissions += 1;
        if self.offline {
            return Err(ExecutorError::Unavailable("paper venue is offline".to_string()));
        }

        let mut outcomes = Vec::with_capacity(plan.len());
        for order in plan.iter() {
            let id = order.instrument_id();
            if self.halted.contains(id) {
                warn!("Paper venue rejects {} {}: halted", order.side(), id);
                outcomes.push(OrderOutcome::Rejected(ExecutionRejected {
                    instrument: id.clone(),
                    reason: "instrument halted".to_string(),
                }));
                continue;
            }

            let filled = ((order.quantity() as f64 * self.fill_ratio).floor() as u64).min(order.quantity());
            if filled == 0 {
                outcomes.push(OrderOutcome::Rejected(ExecutionRejected {
                    instrument: id.clone(),
                    reason: "no liquidity".to_string(),
                }));
                continue;
            }

            let price = order.reference_price();
            let commission = self.fees.commission(filled as f64 * price);
            info!(
                "Paper fill {} {} {}/{} @ {:.2} (commission {:.2})",
                order.side(),
                id,
                filled,
                order.quantity(),
                price,
                commission
            );
            outcomes.push(OrderOutcome::Filled(Fill {
                instrument_id: id.clone(),
                side: order.side(),
                requested_quantity: order.quantity(),
                filled_quantity: filled,
                fill_price: price,
                commission_charged: commission,
            }));
        }
        Ok(outcomes)
    }
}
