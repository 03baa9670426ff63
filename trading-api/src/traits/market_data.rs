//! Defines the `MarketDataProvider` trait for snapshot ingestion.
//!
//! The decision engine works on one discrete snapshot per invocation. Adapters
//! (a JSON file, a synthetic generator, a vendor API) only need to turn a list
//! of instrument ids into price histories.

use crate::error::ProviderError;
use crate::model::{ids::InstrumentId, instrument::MarketSnapshot};
use async_trait::async_trait;

/// A source of per-cycle market snapshots.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the current quote and trailing history for `instrument_ids`.
    ///
    /// # Arguments
    ///
    /// * `instrument_ids` - The instruments to fetch, in no particular order.
    /// * `lookback_window` - Number of price points requested per instrument.
    ///
    /// # Returns
    ///
    /// * `Ok(MarketSnapshot)` - Instruments the provider knows about. Ids it
    ///   does not know are simply absent.
    /// * `Err(ProviderError::DataUnavailable)` - The snapshot cannot be produced.
    async fn fetch_snapshot(
        &self,
        instrument_ids: &[InstrumentId],
        lookback_window: usize,
    ) -> Result<MarketSnapshot, ProviderError>;
}
