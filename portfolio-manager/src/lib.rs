//! Weekly momentum decision engine.
//!
//! `risk_guard` holds the pure risk model, `strategy` scores and proposes,
//! `manager` resolves constraints and books fills, and `cycle` wires them to
//! the market data, execution, ledger and report collaborators.

pub mod cycle;
pub mod error;
pub mod manager;
pub mod risk_guard;
pub mod strategy;

pub use cycle::{Collaborators, CycleResult, TradingCycle};
pub use error::CycleError;
pub use manager::{CycleState, GuaranteeOutcome, PortfolioManager};
pub use strategy::MomentumStrategy;
