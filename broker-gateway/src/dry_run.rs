use async_trait::async_trait;
use log::info;
use trading::{ExecutionRejected, ExecutorError, OrderExecutor, OrderOutcome, OrderPlan};

/// Logs the plan and rejects every order, so a dry run never books a trade.
#[derive(Debug, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl OrderExecutor for DryRunExecutor {
    async fn submit(&mut self, plan: &OrderPlan) -> Result<Vec<OrderOutcome>, ExecutorError> {
        Ok(plan
            .iter()
            .map(|order| {
                info!(
                    "[dry run] {} {} x{} @ {:.2} ({:?}, est. commission {:.2})",
                    order.side(),
                    order.instrument_id(),
                    order.quantity(),
                    order.reference_price(),
                    order.rationale(),
                    order.estimated_commission()
                );
                OrderOutcome::Rejected(ExecutionRejected {
                    instrument: order.instrument_id().clone(),
                    reason: "dry run".to_string(),
                })
            })
            .collect())
    }
}
