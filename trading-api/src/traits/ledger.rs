use crate::error::LedgerError;
use crate::model::{
    ledger::{LedgerHistory, TradeLedgerEntry},
    portfolio::Portfolio,
    weekly::{WeeklySchedule, WeeklyTarget},
};
use chrono::{DateTime, Utc};

/// Durable, append-only trade history.
///
/// Implementations must make `append` crash-atomic: after a crash either every
/// entry of the batch is visible or none is.
pub trait LedgerStore: Send {
    /// Loads the full persisted history.
    fn load_history(&self) -> Result<LedgerHistory, LedgerError>;

    /// Appends a batch of entries atomically.
    fn append(&mut self, entries: &[TradeLedgerEntry]) -> Result<(), LedgerError>;

    /// Rebuilds the portfolio and the current week's target from history.
    ///
    /// # Arguments
    ///
    /// * `now` - Cycle clock; selects the weekly window.
    /// * `schedule` - Growth target and window anchor.
    fn load_state(
        &self,
        now: DateTime<Utc>,
        schedule: &WeeklySchedule,
    ) -> Result<(Portfolio, WeeklyTarget), LedgerError> {
        self.load_history()?.replay(now, schedule)
    }
}
