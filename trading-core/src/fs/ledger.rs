use super::persistence::{load_state_if_exists, save_state};
use log::{debug, info};
use std::path::PathBuf;
use trading::{LedgerError, LedgerHistory, LedgerStore, TradeLedgerEntry};

/// Ledger kept as one JSON document and rewritten atomically on every append.
///
/// A missing file means "no trades yet": the history starts from the
/// configured opening cash.
pub struct JsonLedgerStore {
    file_path: PathBuf,
    opening_cash: f64,
}

impl JsonLedgerStore {
    pub fn new(file_path: PathBuf, opening_cash: f64) -> Self {
        Self {
            file_path,
            opening_cash,
        }
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load_history(&self) -> Result<LedgerHistory, LedgerError> {
        match load_state_if_exists::<LedgerHistory>(&self.file_path)? {
            Some(history) => {
                debug!(
                    "Loaded ledger {} with {} entries",
                    self.file_path.display(),
                    history.entries.len()
                );
                Ok(history)
            }
            None => {
                info!(
                    "No ledger at {}, starting from opening cash {:.2}",
                    self.file_path.display(),
                    self.opening_cash
                );
                Ok(LedgerHistory::new(self.opening_cash))
            }
        }
    }

    fn append(&mut self, entries: &[TradeLedgerEntry]) -> Result<(), LedgerError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut history = self.load_history()?;
        history.entries.extend_from_slice(entries);
        save_state(&self.file_path, &history)?;
        info!(
            "Appended {} entries to ledger ({} total)",
            entries.len(),
            history.entries.len()
        );
        Ok(())
    }
}
