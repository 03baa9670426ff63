use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trading::{Instrument, InstrumentId, MarketDataProvider, MarketSnapshot, ProviderError};

/// Synthetic feed: each instrument follows its own seeded random walk, so the
/// same seed and ids always produce the same snapshot.
pub struct RandomWalkFeed {
    seed: u64,
    start_price: f64,
    /// Maximum absolute step, as a fraction of price.
    step: f64,
    /// Constant per-step drift.
    drift: f64,
    volume: f64,
    taken_at: Option<DateTime<Utc>>,
}

impl RandomWalkFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: 100.0,
            step: 0.01,
            drift: 0.0,
            volume: 100_000.0,
            taken_at: None,
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step.abs();
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }

    /// Stamps generated snapshots with a fixed time instead of the wall clock.
    pub fn taken_at(mut self, at: DateTime<Utc>) -> Self {
        self.taken_at = Some(at);
        self
    }

    fn instrument_seed(&self, id: &InstrumentId) -> u64 {
        // FNV-1a over the id keeps walks stable across runs and platforms.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in id.as_str().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash ^ self.seed
    }

    /// Generates `points` prices ending at the current quote.
    pub fn walk(&self, id: &InstrumentId, points: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.instrument_seed(id));
        let mut price = self.start_price;
        let mut series = Vec::with_capacity(points);
        for _ in 0..points {
            let change = if self.step > 0.0 {
                rng.gen_range(-self.step..self.step)
            } else {
                0.0
            };
            price = (price * (1.0 + self.drift + change)).max(0.01);
            series.push(price);
        }
        series
    }
}

#[async_trait]
impl MarketDataProvider for RandomWalkFeed {
    async fn fetch_snapshot(
        &self,
        instrument_ids: &[InstrumentId],
        lookback_window: usize,
    ) -> Result<MarketSnapshot, ProviderError> {
        let mut snapshot = MarketSnapshot::new(self.taken_at.unwrap_or_else(Utc::now));
        for id in instrument_ids {
            let mut series = self.walk(id, lookback_window.max(1));
            let Some(last) = series.pop() else {
                continue;
            };
            snapshot.insert(Instrument::new(id.clone(), last, series, self.volume));
        }
        Ok(snapshot)
    }
}
