//! Position ledger arithmetic and valuation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// An account's holding of one instrument. Unique per
/// (account, instrument); a position that reaches quantity 0 is deleted,
/// never stored as a zero row.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub account_id: i64,
    pub instrument_id: i64,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.quantity) * price
    }

    /// (current price − average cost) × quantity.
    pub fn unrealized_profit(&self, price: Decimal) -> Decimal {
        (price - self.average_cost) * Decimal::from(self.quantity)
    }

    /// Percentage gain over the cost basis. `None` when the average cost is
    /// not positive, which the buy path never produces.
    pub fn profit_rate(&self, price: Decimal) -> Option<Decimal> {
        if self.average_cost <= Decimal::ZERO {
            return None;
        }
        Some((price - self.average_cost) / self.average_cost * Decimal::from(100))
    }
}

/// Quantity-weighted average cost after buying `buy_quantity` more shares at
/// `buy_price` on top of `held_quantity` shares carried at `held_average`.
///
/// Callers guarantee both quantities are positive.
pub fn weighted_average_cost(
    held_quantity: i64,
    held_average: Decimal,
    buy_quantity: i64,
    buy_price: Decimal,
) -> Decimal {
    let held_value = held_average * Decimal::from(held_quantity);
    let bought_value = buy_price * Decimal::from(buy_quantity);
    (held_value + bought_value) / Decimal::from(held_quantity + buy_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_position(quantity: i64, average_cost: Decimal) -> Position {
        Position {
            account_id: 1,
            instrument_id: 1,
            quantity,
            average_cost,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn market_value_is_quantity_times_price() {
        let pos = sample_position(10, dec!(10000));
        assert_eq!(pos.market_value(dec!(12000)), dec!(120000));
    }

    #[test]
    fn unrealized_profit_gains() {
        let pos = sample_position(10, dec!(10000));
        assert_eq!(pos.unrealized_profit(dec!(12000)), dec!(20000));
    }

    #[test]
    fn unrealized_profit_losses_are_negative() {
        let pos = sample_position(10, dec!(10000));
        assert_eq!(pos.unrealized_profit(dec!(9500)), dec!(-5000));
    }

    #[test]
    fn profit_rate_in_percent() {
        let pos = sample_position(10, dec!(10000));
        assert_eq!(pos.profit_rate(dec!(12000)), Some(dec!(20)));
    }

    #[test]
    fn profit_rate_guards_nonpositive_average() {
        let pos = sample_position(10, dec!(0));
        assert_eq!(pos.profit_rate(dec!(12000)), None);
    }

    #[test]
    fn weighted_average_first_top_up() {
        // 10 @ 10000 then 5 @ 12000 → 160000 / 15
        let avg = weighted_average_cost(10, dec!(10000), 5, dec!(12000));
        assert_eq!(avg.round_dp(2), dec!(10666.67));
    }

    #[test]
    fn weighted_average_equal_prices_is_stable() {
        let avg = weighted_average_cost(7, dec!(250.50), 13, dec!(250.50));
        assert_eq!(avg, dec!(250.50));
    }

    #[test]
    fn weighted_average_does_not_drift_over_many_buys() {
        // Repeatedly averaging at the same price must stay exact.
        let mut quantity = 1_i64;
        let mut avg = dec!(33.33);
        for _ in 0..1000 {
            avg = weighted_average_cost(quantity, avg, 3, dec!(33.33));
            quantity += 3;
        }
        assert_eq!(avg.round_dp(10), dec!(33.33));
    }

    #[test]
    fn weighted_average_large_values() {
        let avg = weighted_average_cost(1_000_000, dec!(99999.99), 1, dec!(0.01));
        assert!(avg < dec!(99999.99));
        assert!(avg > dec!(99999.88));
    }
}
