use super::ids::InstrumentId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Why an order was put into the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRationale {
    /// Buy allocation toward the weekly growth target.
    Momentum,
    /// Held instrument whose momentum decayed past the threshold.
    MomentumDecay,
    /// Held instrument whose unrealized return reached the weekly target.
    TargetReached,
    /// Minimal trade forced by the weekly guarantee.
    WeeklyGuarantee,
}

/// One order of a plan, priced at the snapshot quote it was sized against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOrder {
    instrument_id: InstrumentId,
    side: Side,
    quantity: u64,
    reference_price: f64,
    estimated_commission: f64,
    rationale: OrderRationale,
}

impl PlannedOrder {
    pub fn new(
        instrument_id: InstrumentId,
        side: Side,
        quantity: u64,
        reference_price: f64,
        estimated_commission: f64,
        rationale: OrderRationale,
    ) -> Self {
        Self {
            instrument_id,
            side,
            quantity,
            reference_price,
            estimated_commission,
            rationale,
        }
    }

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn reference_price(&self) -> f64 {
        self.reference_price
    }

    pub fn estimated_commission(&self) -> f64 {
        self.estimated_commission
    }

    pub fn rationale(&self) -> OrderRationale {
        self.rationale
    }

    /// Expected traded value at the reference price.
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.reference_price
    }

    /// Signed cash impact: negative for buys, positive for sells.
    pub fn cash_delta(&self) -> f64 {
        match self.side {
            Side::Buy => -(self.notional() + self.estimated_commission),
            Side::Sell => self.notional() - self.estimated_commission,
        }
    }
}

/// Ordered list of orders for one cycle. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    orders: Vec<PlannedOrder>,
}

impl OrderPlan {
    pub fn new(orders: Vec<PlannedOrder>) -> Self {
        Self { orders }
    }

    pub fn push(&mut self, order: PlannedOrder) {
        self.orders.push(order);
    }

    pub fn orders(&self) -> &[PlannedOrder] {
        &self.orders
    }

    pub fn into_orders(self) -> Vec<PlannedOrder> {
        self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedOrder> {
        self.orders.iter()
    }

    pub fn total_commission(&self) -> f64 {
        self.orders.iter().map(|o| o.estimated_commission).sum()
    }
}
