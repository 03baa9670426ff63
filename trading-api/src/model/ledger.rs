//! Append-only trade ledger.
//!
//! The ledger is the single source of truth: `Portfolio` and `WeeklyTarget`
//! are derived from it at the start of every invocation.

use super::ids::InstrumentId;
use super::order::Side;
use super::portfolio::Portfolio;
use super::weekly::{WeeklySchedule, WeeklyTarget};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one executed fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLedgerEntry {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub commission: f64,
    /// Portfolio valuation immediately after this fill was booked.
    pub resulting_valuation: f64,
}

/// Everything persisted by a ledger store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerHistory {
    pub opening_cash: f64,
    #[serde(default)]
    pub entries: Vec<TradeLedgerEntry>,
}

impl LedgerHistory {
    pub fn new(opening_cash: f64) -> Self {
        Self {
            opening_cash,
            entries: Vec::new(),
        }
    }

    /// Replays every entry on top of the opening cash.
    ///
    /// Positions are marked at their last traded price; callers must re-mark
    /// against a fresh snapshot before taking a valuation.
    pub fn replay_portfolio(&self) -> Result<Portfolio, LedgerError> {
        let mut portfolio = Portfolio::new(self.opening_cash);
        for entry in &self.entries {
            if !entry.price.is_finite() || entry.price <= 0.0 || !entry.commission.is_finite() {
                return Err(LedgerError::Corrupt(format!(
                    "entry {} has price {} and commission {}",
                    entry.id, entry.price, entry.commission
                )));
            }
            if entry.side == Side::Sell && portfolio.quantity(&entry.instrument_id) < entry.quantity {
                return Err(LedgerError::Corrupt(format!(
                    "entry {} sells {} {} but only {} held",
                    entry.id,
                    entry.quantity,
                    entry.instrument_id,
                    portfolio.quantity(&entry.instrument_id)
                )));
            }
            portfolio.apply_fill(
                &entry.instrument_id,
                entry.side,
                entry.quantity,
                entry.price,
                entry.commission,
            );
            if portfolio.cash() < 0.0 {
                return Err(LedgerError::Corrupt(format!(
                    "entry {} leaves cash at {:.2}",
                    entry.id,
                    portfolio.cash()
                )));
            }
        }
        Ok(portfolio)
    }

    /// True if any fill was booked inside the window of `target`.
    pub fn traded_within(&self, target: &WeeklyTarget) -> bool {
        self.entries
            .iter()
            .any(|e| e.quantity > 0 && target.contains(e.timestamp))
    }

    /// Rebuilds `(Portfolio, WeeklyTarget)` as of `now`.
    pub fn replay(
        &self,
        now: DateTime<Utc>,
        schedule: &WeeklySchedule,
    ) -> Result<(Portfolio, WeeklyTarget), LedgerError> {
        let portfolio = self.replay_portfolio()?;
        let unflagged = WeeklyTarget::derive(now, schedule, false);
        let target = WeeklyTarget::derive(now, schedule, self.traded_within(&unflagged));
        Ok((portfolio, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(ts: DateTime<Utc>, id: &str, side: Side, qty: u64, price: f64) -> TradeLedgerEntry {
        TradeLedgerEntry {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            timestamp: ts,
            instrument_id: InstrumentId::new(id),
            side,
            quantity: qty,
            price,
            commission: 1.0,
            resulting_valuation: 0.0,
        }
    }

    #[test]
    fn test_replay_rebuilds_cash_and_positions() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let history = LedgerHistory {
            opening_cash: 10_000.0,
            entries: vec![
                entry(ts, "A", Side::Buy, 10, 100.0),
                entry(ts, "B", Side::Buy, 5, 200.0),
                entry(ts, "A", Side::Sell, 4, 110.0),
            ],
        };
        let p = history.replay_portfolio().unwrap();
        assert_eq!(p.quantity(&InstrumentId::new("A")), 6);
        assert_eq!(p.quantity(&InstrumentId::new("B")), 5);
        let expected_cash = 10_000.0 - 1_001.0 - 1_001.0 + 439.0;
        assert!((p.cash() - expected_cash).abs() < 1e-9);
    }

    #[test]
    fn test_replay_flags_trades_only_inside_current_window() {
        let schedule = WeeklySchedule::default();
        let last_week = Utc.with_ymd_and_hms(2024, 6, 5, 10, 0, 0).unwrap();
        let history = LedgerHistory {
            opening_cash: 1_000.0,
            entries: vec![entry(last_week, "A", Side::Buy, 1, 100.0)],
        };

        let same_week = Utc.with_ymd_and_hms(2024, 6, 7, 10, 0, 0).unwrap();
        let (_, target) = history.replay(same_week, &schedule).unwrap();
        assert!(target.trade_already_satisfied());

        let next_week = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let (_, target) = history.replay(next_week, &schedule).unwrap();
        assert!(!target.trade_already_satisfied());
    }

    #[test]
    fn test_replay_rejects_overdrawn_cash() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let history = LedgerHistory {
            opening_cash: 1_000.0,
            entries: vec![entry(ts, "A", Side::Buy, 10, 100.0)],
        };
        // 1000 notional plus 1 commission on 1000 cash.
        assert!(matches!(history.replay_portfolio(), Err(LedgerError::Corrupt(_))));
    }

    #[test]
    fn test_replay_rejects_oversell() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let history = LedgerHistory {
            opening_cash: 0.0,
            entries: vec![entry(ts, "A", Side::Sell, 1, 10.0)],
        };
        assert!(matches!(history.replay_portfolio(), Err(LedgerError::Corrupt(_))));
    }
}
