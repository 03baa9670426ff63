use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;
use trading::{InstrumentId, MarketDataProvider, MarketSnapshot, ProviderError};
use trading_core::fs::load_state;

/// Serves the snapshot stored at `path`, restricted to the requested ids and
/// trimmed to the lookback window.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MarketDataProvider for FileFeed {
    async fn fetch_snapshot(
        &self,
        instrument_ids: &[InstrumentId],
        lookback_window: usize,
    ) -> Result<MarketSnapshot, ProviderError> {
        let stored: MarketSnapshot =
            load_state(&self.path).map_err(|e| ProviderError::DataUnavailable(format!("{:#}", e)))?;

        let mut snapshot = match stored.taken_at() {
            Some(taken_at) => MarketSnapshot::new(taken_at),
            None => MarketSnapshot::default(),
        };
        for instrument in stored.iter().filter(|i| instrument_ids.contains(i.id())) {
            snapshot.insert(instrument.clone().truncated(lookback_window));
        }
        debug!(
            "Read {} of {} requested instruments from {}",
            snapshot.len(),
            instrument_ids.len(),
            self.path.display()
        );
        Ok(snapshot)
    }
}
