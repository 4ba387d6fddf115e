//! Read-only portfolio and leaderboard projections.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::account::Account;
use super::instrument::Instrument;
use super::position::Position;

/// A held position joined with its instrument's current price.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub instrument_id: i64,
    pub symbol: String,
    pub instrument_name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_profit: Decimal,
    /// Percentage over cost basis; omitted if the basis is not positive.
    pub profit_rate: Option<Decimal>,
}

impl Holding {
    pub fn from_position(position: &Position, instrument: &Instrument) -> Self {
        let price = instrument.current_price;
        Holding {
            instrument_id: instrument.id,
            symbol: instrument.symbol.clone(),
            instrument_name: instrument.name.clone(),
            quantity: position.quantity,
            average_cost: position.average_cost,
            current_price: price,
            market_value: position.market_value(price),
            unrealized_profit: position.unrealized_profit(price),
            profit_rate: position.profit_rate(price),
        }
    }
}

/// Everything a participant sees about their own ledger state.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub account: Account,
    pub holdings: Vec<Holding>,
    pub holdings_value: Decimal,
    pub total_assets: Decimal,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub account_id: i64,
    pub username: String,
    pub name: String,
    pub cash: Decimal,
    pub holdings_value: Decimal,
    pub total_assets: Decimal,
}

/// Sum of quantity × current price over positions whose instrument has a
/// known price. Positions at quantity 0 never reach here (they are deleted
/// on sell-out), but the filter keeps the projection honest regardless.
pub fn holdings_value(positions: &[Position], prices: &HashMap<i64, Decimal>) -> Decimal {
    positions
        .iter()
        .filter(|p| p.quantity > 0)
        .filter_map(|p| prices.get(&p.instrument_id).map(|&price| p.market_value(price)))
        .sum()
}

/// Order leaderboard rows by total assets descending, ties broken by
/// ascending account id for a deterministic ranking.
pub fn rank_leaderboard(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.total_assets
            .cmp(&a.total_assets)
            .then(a.account_id.cmp(&b.account_id))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(instrument_id: i64, quantity: i64, average_cost: Decimal) -> Position {
        Position {
            account_id: 1,
            instrument_id,
            quantity,
            average_cost,
            updated_at: Utc::now(),
        }
    }

    fn instrument(id: i64, symbol: &str, price: Decimal) -> Instrument {
        Instrument {
            id,
            symbol: symbol.into(),
            name: format!("{symbol} Corp"),
            current_price: price,
            updated_at: Utc::now(),
        }
    }

    fn entry(account_id: i64, total: Decimal) -> LeaderboardEntry {
        LeaderboardEntry {
            account_id,
            username: format!("user{account_id}"),
            name: format!("User {account_id}"),
            cash: total,
            holdings_value: dec!(0),
            total_assets: total,
        }
    }

    #[test]
    fn holding_joins_position_and_price() {
        let holding =
            Holding::from_position(&position(3, 10, dec!(10000)), &instrument(3, "CHA", dec!(12000)));

        assert_eq!(holding.market_value, dec!(120000));
        assert_eq!(holding.unrealized_profit, dec!(20000));
        assert_eq!(holding.profit_rate, Some(dec!(20)));
    }

    #[test]
    fn holdings_value_sums_over_priced_positions() {
        let positions = vec![position(1, 10, dec!(100)), position(2, 3, dec!(50))];
        let prices = HashMap::from([(1, dec!(110)), (2, dec!(40))]);
        assert_eq!(holdings_value(&positions, &prices), dec!(1220));
    }

    #[test]
    fn holdings_value_skips_unpriced_and_empty_positions() {
        let positions = vec![position(1, 10, dec!(100)), position(9, 5, dec!(10)), position(2, 0, dec!(50))];
        let prices = HashMap::from([(1, dec!(110)), (2, dec!(40))]);
        assert_eq!(holdings_value(&positions, &prices), dec!(1100));
    }

    #[test]
    fn leaderboard_orders_by_total_descending() {
        let ranked = rank_leaderboard(vec![
            entry(1, dec!(900000)),
            entry(2, dec!(1200000)),
            entry(3, dec!(1000000)),
        ]);
        let ids: Vec<i64> = ranked.iter().map(|e| e.account_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn leaderboard_breaks_ties_by_account_id() {
        let ranked = rank_leaderboard(vec![
            entry(5, dec!(1000000)),
            entry(2, dec!(1000000)),
            entry(9, dec!(1000000)),
        ]);
        let ids: Vec<i64> = ranked.iter().map(|e| e.account_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
