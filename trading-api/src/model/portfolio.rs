use super::ids::InstrumentId;
use super::instrument::MarketSnapshot;
use super::order::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A holding in a single instrument. Owned exclusively by `Portfolio`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    instrument_id: InstrumentId,
    quantity: u64,
    average_cost: f64,
    /// Price the position was last marked at.
    mark_price: f64,
}

impl Position {
    pub fn new(instrument_id: InstrumentId, quantity: u64, average_cost: f64) -> Self {
        Self {
            instrument_id,
            quantity,
            average_cost,
            mark_price: average_cost,
        }
    }

    pub fn instrument_id(&self) -> &InstrumentId {
        &self.instrument_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn average_cost(&self) -> f64 {
        self.average_cost
    }

    pub fn mark_price(&self) -> f64 {
        self.mark_price
    }

    pub fn market_value(&self) -> f64 {
        self.quantity as f64 * self.mark_price
    }

    pub fn unrealized_return(&self) -> f64 {
        if self.average_cost <= 0.0 {
            return 0.0;
        }
        (self.mark_price - self.average_cost) / self.average_cost
    }
}

/// Cash plus positions. Rebuilt from the ledger at the start of every cycle and
/// marked against that cycle's snapshot before any valuation is taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    positions: BTreeMap<InstrumentId, Position>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            positions: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position(&self, id: &InstrumentId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn quantity(&self, id: &InstrumentId) -> u64 {
        self.positions.get(id).map(|p| p.quantity).unwrap_or(0)
    }

    pub fn holding_ids(&self) -> Vec<InstrumentId> {
        self.positions.keys().cloned().collect()
    }

    pub fn distinct_holdings(&self) -> usize {
        self.positions.len()
    }

    /// Re-prices every position against `snapshot`.
    ///
    /// Returns the ids of held instruments the snapshot has no price for; the
    /// portfolio is left untouched in that case so no valuation is ever taken
    /// from a stale mark.
    pub fn mark_to_market(&mut self, snapshot: &MarketSnapshot) -> Result<(), Vec<InstrumentId>> {
        let missing: Vec<InstrumentId> = self
            .positions
            .keys()
            .filter(|id| snapshot.price(id).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        for (id, position) in self.positions.iter_mut() {
            if let Some(price) = snapshot.price(id) {
                position.mark_price = price;
            }
        }
        Ok(())
    }

    /// Market value of all positions at their current marks.
    pub fn positions_value(&self) -> f64 {
        self.positions.values().map(|p| p.market_value()).sum()
    }

    /// `cash + Σ quantity * mark_price`.
    pub fn total_valuation(&self) -> f64 {
        self.cash + self.positions_value()
    }

    /// Books a fill and returns the quantity booked. Buys debit `quantity * price + commission` and roll the
    /// cost basis; sells credit `quantity * price - commission` and close the
    /// position once it reaches zero. Sell quantities above the holding are
    /// clamped to the holding.
    pub fn apply_fill(
        &mut self,
        instrument_id: &InstrumentId,
        side: Side,
        quantity: u64,
        price: f64,
        commission: f64,
    ) -> u64 {
        if quantity == 0 {
            return 0;
        }
        match side {
            Side::Buy => {
                let notional = quantity as f64 * price;
                self.cash -= notional + commission;
                let position = self
                    .positions
                    .entry(instrument_id.clone())
                    .or_insert_with(|| Position::new(instrument_id.clone(), 0, price));
                let held = position.quantity as f64;
                let new_quantity = position.quantity + quantity;
                if new_quantity > 0 {
                    position.average_cost =
                        (held * position.average_cost + notional) / new_quantity as f64;
                }
                position.quantity = new_quantity;
                position.mark_price = price;
                quantity
            }
            Side::Sell => {
                let Some(position) = self.positions.get_mut(instrument_id) else {
                    return 0;
                };
                let sold = quantity.min(position.quantity);
                self.cash += sold as f64 * price - commission;
                position.quantity -= sold;
                position.mark_price = price;
                if position.quantity == 0 {
                    self.positions.remove(instrument_id);
                }
                sold
            }
        }
    }
}
