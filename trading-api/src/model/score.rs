use super::ids::InstrumentId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Momentum assessment of one instrument for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub instrument_id: InstrumentId,
    /// Signed, risk-adjusted momentum. Read as an expected weekly return.
    pub score: f64,
    /// Volatility the instrument would bring into the portfolio.
    pub volatility: f64,
    /// Quote the score was computed at.
    pub price: f64,
    pub eligible: bool,
    #[serde(default)]
    pub sector: Option<String>,
}

impl CandidateScore {
    /// Ranking order: higher score first, then lower volatility, then id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.volatility.total_cmp(&other.volatility))
            .then_with(|| self.instrument_id.cmp(&other.instrument_id))
    }
}
