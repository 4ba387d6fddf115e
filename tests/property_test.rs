//! Property tests for the ledger conservation laws.

mod common;

use common::*;
use papertrade::domain::error::LedgerError;
use papertrade::domain::transaction::Direction;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Money and shares are conserved across any sequence of accepted
    /// trades, and every rejection leaves state untouched.
    #[test]
    fn random_trade_sequences_conserve_money_and_shares(
        ops in proptest::collection::vec((any::<bool>(), 1..20i64), 1..40)
    ) {
        let (store, engine) = memory_engine();
        let account = participant(&engine, "10101");
        let cha = instrument(&engine, "CHA", dec!(100));
        let price = dec!(100);

        let mut cash = account.cash;
        let mut held = 0i64;
        let mut executed = 0usize;

        for (is_buy, quantity) in ops {
            let direction = if is_buy { Direction::Buy } else { Direction::Sell };
            match engine.execute_trade(account.id, cha.id, direction, quantity) {
                Ok(record) => {
                    executed += 1;
                    prop_assert_eq!(record.total_amount, price * Decimal::from(quantity));
                    if is_buy {
                        cash -= record.total_amount;
                        held += quantity;
                    } else {
                        cash += record.total_amount;
                        held -= quantity;
                    }
                }
                Err(LedgerError::InsufficientFunds { .. }) => {
                    prop_assert!(is_buy);
                    prop_assert!(cash < price * Decimal::from(quantity));
                }
                Err(LedgerError::InsufficientHoldings { .. }) => {
                    prop_assert!(!is_buy);
                    prop_assert!(held < quantity);
                }
                Err(other) => {
                    return Err(TestCaseError::fail(format!("unexpected error: {other}")));
                }
            }

            prop_assert!(held >= 0);
            prop_assert!(cash >= Decimal::ZERO);
        }

        prop_assert_eq!(engine.get_account(account.id).unwrap().cash, cash);
        let stored_quantity = store
            .get_position(account.id, cha.id)
            .unwrap()
            .map(|p| p.quantity)
            .unwrap_or(0);
        prop_assert_eq!(stored_quantity, held);
        prop_assert_eq!(engine.transactions(account.id, 1000).unwrap().len(), executed);
    }

    /// After any series of buys, the stored average cost equals the
    /// quantity-weighted mean of every fill.
    #[test]
    fn average_cost_is_the_weighted_mean_of_all_buys(
        buys in proptest::collection::vec((1..50i64, 1..100_000i64), 1..15)
    ) {
        // Huge endowment so no buy in the generated range is rejected;
        // funding is not the property under test.
        let store = memory_store();
        let engine = papertrade::domain::engine::TradeEngine::new(store.clone(), dec!(1000000000000));
        let teacher = admin(&engine, "teacher");
        let account = participant(&engine, "10101");
        let cha = instrument(&engine, "CHA", dec!(1));

        let mut total_quantity = 0i64;
        let mut total_value = Decimal::ZERO;
        for (quantity, price) in buys {
            let price = Decimal::from(price);
            engine.set_price(cha.id, price, &teacher).unwrap();
            engine
                .execute_trade(account.id, cha.id, Direction::Buy, quantity)
                .unwrap();
            total_quantity += quantity;
            total_value += price * Decimal::from(quantity);
        }

        let position = store.get_position(account.id, cha.id).unwrap().unwrap();
        prop_assert_eq!(position.quantity, total_quantity);
        let expected = total_value / Decimal::from(total_quantity);
        prop_assert_eq!(
            position.average_cost.round_dp(10),
            expected.round_dp(10)
        );
    }

    /// Selling never changes the average cost, all the way down to flat.
    #[test]
    fn sells_never_change_average_cost(
        sell_chunks in proptest::collection::vec(1..10i64, 1..8)
    ) {
        let (store, engine) = memory_engine();
        let account = participant(&engine, "10101");
        let cha = instrument(&engine, "CHA", dec!(250));

        let total: i64 = sell_chunks.iter().sum();
        engine
            .execute_trade(account.id, cha.id, Direction::Buy, total)
            .unwrap();
        let basis = store
            .get_position(account.id, cha.id)
            .unwrap()
            .unwrap()
            .average_cost;

        let mut remaining = total;
        for chunk in sell_chunks {
            engine
                .execute_trade(account.id, cha.id, Direction::Sell, chunk)
                .unwrap();
            remaining -= chunk;
            match store.get_position(account.id, cha.id).unwrap() {
                Some(position) => {
                    prop_assert_eq!(position.quantity, remaining);
                    prop_assert_eq!(position.average_cost, basis);
                }
                None => prop_assert_eq!(remaining, 0),
            }
        }
    }
}
