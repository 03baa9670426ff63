//! Error taxonomy of the decision engine.
//!
//! Instrument-level failures (`RiskError`) are absorbed by the caller and only
//! shrink the candidate set. Provider and executor failures are cycle-level.
//! `ExecutionRejected` is per order: the rest of the plan still applies.

use crate::model::ids::InstrumentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the pure risk computations for a single instrument.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Not enough price points in the lookback window to estimate volatility.
    #[error("insufficient history for {instrument}: {available} price points, {required} required")]
    InsufficientHistory {
        instrument: InstrumentId,
        required: usize,
        available: usize,
    },

    /// A zero, negative or non-finite price makes returns undefined.
    #[error("invalid price {price} in history of {instrument}")]
    InvalidPrice { instrument: InstrumentId, price: f64 },
}

impl RiskError {
    pub fn instrument(&self) -> &InstrumentId {
        match self {
            RiskError::InsufficientHistory { instrument, .. } => instrument,
            RiskError::InvalidPrice { instrument, .. } => instrument,
        }
    }
}

/// Failures of the market data collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The snapshot could not be produced at all.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),
}

/// A single order refused by the venue.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("order for {instrument} rejected: {reason}")]
pub struct ExecutionRejected {
    pub instrument: InstrumentId,
    pub reason: String,
}

/// Failures of the order executor as a whole (as opposed to per-order rejections).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("order executor unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the durable ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading or writing the backing store failed.
    #[error("ledger storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    /// The stored history is internally inconsistent.
    #[error("corrupt ledger: {0}")]
    Corrupt(String),
}

/// Failures of the report sink. Never fatal to a cycle.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report could not be published: {0:#}")]
    Publish(#[from] anyhow::Error),
}
