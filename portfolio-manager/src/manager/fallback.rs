use trading::FeeSchedule;

/// Sizes the single order forced by the weekly guarantee.
pub trait FallbackSizing: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `None` when no quantity at `price` can satisfy the fee schedule.
    fn quantity(&self, price: f64, fees: &FeeSchedule) -> Option<u64>;
}

/// Smallest whole lot whose commission stays within the commission-ratio cap.
///
/// `fixed + q * p * rate <= ratio * q * p` gives `q >= fixed / (p * (ratio - rate))`.
#[derive(Debug, Default)]
pub struct MinimalCommissionLot;

impl FallbackSizing for MinimalCommissionLot {
    fn name(&self) -> &str {
        "MinimalCommissionLot"
    }

    fn quantity(&self, price: f64, fees: &FeeSchedule) -> Option<u64> {
        let margin = fees.max_commission_ratio - fees.variable_rate;
        if !price.is_finite() || price <= 0.0 || margin <= 0.0 {
            return None;
        }
        let mut quantity = ((fees.fixed_fee / (price * margin)).ceil() as u64).max(1);
        // Rounding can leave the bound a hair short.
        for _ in 0..3 {
            let notional = quantity as f64 * price;
            if fees.within_commission_ratio(notional, fees.commission(notional)) {
                return Some(quantity);
            }
            quantity += 1;
        }
        None
    }
}
