//! Market data snapshot models.
//!
//! One `MarketSnapshot` is fetched per cycle and is immutable for the rest of it.

use super::ids::InstrumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of a single instrument for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    id: InstrumentId,
    /// The current quote.
    last_price: f64,
    /// Trailing closes, oldest first. Does not include `last_price`.
    #[serde(default)]
    history: Vec<f64>,
    /// Traded volume over the last session.
    #[serde(default)]
    volume: f64,
    /// Industry classification, when the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sector: Option<String>,
}

impl Instrument {
    pub fn new(id: impl Into<InstrumentId>, last_price: f64, history: Vec<f64>, volume: f64) -> Self {
        Self {
            id: id.into(),
            last_price,
            history,
            volume,
            sector: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn id(&self) -> &InstrumentId {
        &self.id
    }

    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    /// Full price series used by the risk and momentum models: the trailing
    /// history followed by the current quote.
    pub fn price_series(&self) -> Vec<f64> {
        let mut series = Vec::with_capacity(self.history.len() + 1);
        series.extend_from_slice(&self.history);
        series.push(self.last_price);
        series
    }

    /// Keeps only the most recent `lookback` points of the price series.
    pub fn truncated(mut self, lookback: usize) -> Self {
        let keep = lookback.saturating_sub(1);
        if self.history.len() > keep {
            let drop = self.history.len() - keep;
            self.history.drain(..drop);
        }
        self
    }
}

/// All instruments fetched for one cycle, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    taken_at: Option<DateTime<Utc>>,
    instruments: BTreeMap<InstrumentId, Instrument>,
}

impl MarketSnapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at: Some(taken_at),
            instruments: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.id().clone(), instrument);
    }

    pub fn with(mut self, instrument: Instrument) -> Self {
        self.insert(instrument);
        self
    }

    pub fn get(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id)
    }

    pub fn price(&self, id: &InstrumentId) -> Option<f64> {
        self.instruments.get(id).map(|i| i.last_price())
    }

    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Iterates in instrument id order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    /// Sector of every instrument that has one.
    pub fn sectors(&self) -> BTreeMap<InstrumentId, String> {
        self.instruments
            .values()
            .filter_map(|i| i.sector().map(|s| (i.id().clone(), s.to_string())))
            .collect()
    }

    /// Restricts the snapshot to the requested ids.
    pub fn retain_ids(&mut self, ids: &[InstrumentId]) {
        self.instruments.retain(|id, _| ids.contains(id));
    }
}
