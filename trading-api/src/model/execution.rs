use super::ids::InstrumentId;
use super::order::Side;
use crate::error::ExecutionRejected;
use serde::{Deserialize, Serialize};

/// A confirmed (possibly partial) fill reported by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub instrument_id: InstrumentId,
    pub side: Side,
    /// Requested quantity of the originating order.
    pub requested_quantity: u64,
    pub filled_quantity: u64,
    pub fill_price: f64,
    pub commission_charged: f64,
}

impl Fill {
    pub fn is_partial(&self) -> bool {
        self.filled_quantity < self.requested_quantity
    }
}

/// Outcome of one order of a submitted plan. Plans may fill partially: some
/// orders fill while others are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderOutcome {
    Filled(Fill),
    Rejected(ExecutionRejected),
}

impl OrderOutcome {
    pub fn instrument_id(&self) -> &InstrumentId {
        match self {
            OrderOutcome::Filled(fill) => &fill.instrument_id,
            OrderOutcome::Rejected(rejection) => &rejection.instrument,
        }
    }

    pub fn filled_quantity(&self) -> u64 {
        match self {
            OrderOutcome::Filled(fill) => fill.filled_quantity,
            OrderOutcome::Rejected(_) => 0,
        }
    }
}
