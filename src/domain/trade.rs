//! Trade planning: validation and the single state transition a trade
//! commits.
//!
//! `plan_trade` inspects consistent snapshots of the account, the instrument
//! price and the existing position, and either rejects the intent (no side
//! effects anywhere) or produces a [`TradePlan`] describing every write of
//! the atomic unit: the cash balance after the trade, the position row after
//! the trade (`None` = delete), and the transaction record fields. The store
//! applies a plan in one transaction.

use rust_decimal::Decimal;

use super::account::Account;
use super::error::LedgerError;
use super::instrument::Instrument;
use super::position::{Position, weighted_average_cost};
use super::transaction::Direction;

/// Position row content after a trade commits.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub quantity: i64,
    pub average_cost: Decimal,
}

/// Every write of one trade's atomic unit, precomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub account_id: i64,
    pub instrument_id: i64,
    pub direction: Direction,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub cash_after: Decimal,
    /// `None` means the position row is removed (sold out).
    pub position_after: Option<PositionUpdate>,
}

/// Validate a trade intent against snapshots and compute the resulting
/// state. Validation order: input, role, then funds/holdings.
pub fn plan_trade(
    account: &Account,
    instrument: &Instrument,
    existing: Option<&Position>,
    direction: Direction,
    quantity: i64,
) -> Result<TradePlan, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::invalid_input(format!(
            "trade quantity must be positive, got {quantity}"
        )));
    }
    if account.role.is_administrator() {
        return Err(LedgerError::Unauthorized {
            action: format!("administrator {} cannot trade", account.username),
        });
    }

    let unit_price = instrument.current_price;
    let total_amount = unit_price * Decimal::from(quantity);

    let (cash_after, position_after) = match direction {
        Direction::Buy => {
            if account.cash < total_amount {
                return Err(LedgerError::InsufficientFunds {
                    required: total_amount,
                    available: account.cash,
                });
            }
            let update = match existing {
                None => PositionUpdate {
                    quantity,
                    average_cost: unit_price,
                },
                Some(held) => PositionUpdate {
                    quantity: held.quantity + quantity,
                    average_cost: weighted_average_cost(
                        held.quantity,
                        held.average_cost,
                        quantity,
                        unit_price,
                    ),
                },
            };
            (account.cash - total_amount, Some(update))
        }
        Direction::Sell => {
            let held = existing.map(|p| p.quantity).unwrap_or(0);
            if held < quantity {
                return Err(LedgerError::InsufficientHoldings {
                    requested: quantity,
                    held,
                });
            }
            let remaining = held - quantity;
            let update = if remaining == 0 {
                // Removed, not zeroed: the next buy starts a fresh basis.
                None
            } else {
                existing.map(|p| PositionUpdate {
                    quantity: remaining,
                    average_cost: p.average_cost,
                })
            };
            (account.cash + total_amount, update)
        }
    };

    Ok(TradePlan {
        account_id: account.id,
        instrument_id: instrument.id,
        direction,
        quantity,
        unit_price,
        total_amount,
        cash_after,
        position_after,
    })
}
