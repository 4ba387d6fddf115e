//! The append-only transaction log records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn parse(value: &str) -> Option<Direction> {
        match value {
            "BUY" => Some(Direction::Buy),
            "SELL" => Some(Direction::Sell),
            _ => None,
        }
    }
}

/// One executed trade. Records are immutable once appended; the log is the
/// source of truth for audit and is never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: i64,
    pub account_id: i64,
    pub instrument_id: i64,
    pub direction: Direction,
    pub quantity: i64,
    /// Snapshot of the instrument price at execution time.
    pub unit_price: Decimal,
    /// quantity × unit_price.
    pub total_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// A transaction joined with its instrument's symbol and name for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView {
    pub record: TransactionRecord,
    pub symbol: String,
    pub instrument_name: String,
}
