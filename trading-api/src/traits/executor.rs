use crate::error::ExecutorError;
use crate::model::{execution::OrderOutcome, order::OrderPlan};
use async_trait::async_trait;

#[async_trait]
pub trait OrderExecutor: Send {
    /// Submits every order of a final plan.
    ///
    /// # Arguments
    ///
    /// * `plan` - The approved plan. Orders are submitted in plan order.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<OrderOutcome>)` - One outcome per order, in plan order. Orders
    ///   may fill partially or be rejected individually.
    /// * `Err(ExecutorError)` - The venue could not be reached at all.
    async fn submit(&mut self, plan: &OrderPlan) -> Result<Vec<OrderOutcome>, ExecutorError>;
}

#[async_trait]
impl OrderExecutor for Box<dyn OrderExecutor> {
    async fn submit(&mut self, plan: &OrderPlan) -> Result<Vec<OrderOutcome>, ExecutorError> {
        (**self).submit(plan).await
    }
}
