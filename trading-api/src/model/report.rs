use super::ids::InstrumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Structured activity record handed to the report sink after each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub date: DateTime<Utc>,
    pub orders_executed: usize,
    pub portfolio_valuation: f64,
    /// True once the week has traded, or while its window is not yet closing.
    pub guarantee_met: bool,
    pub trade_satisfied_this_week: bool,
    pub excluded_instruments: Vec<InstrumentId>,
    pub rejected_orders: usize,
    pub diversification: f64,
    pub portfolio_volatility: f64,
}
