use crate::manager::CycleState;
use std::time::Duration;
use thiserror::Error;
use trading::LedgerError;

/// Cycle-level failures. Every variant aborts the cycle before the portfolio
/// or the ledger is touched.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Market data could not be obtained, or a held instrument has no price.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// A collaborator did not answer within its timeout.
    #[error("{operation} did not complete within {timeout:?}")]
    ExternalUnavailable {
        operation: &'static str,
        timeout: Duration,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("illegal transition from {from:?} to {to:?}")]
    IllegalTransition { from: CycleState, to: CycleState },
}
