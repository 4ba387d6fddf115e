//! Tradable instruments and their price history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A tradable instrument with a single administrator-set current price.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub current_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// One appended entry of an instrument's price history. Never mutated or
/// deleted; `changed_at` equals the instrument's `updated_at` from the same
/// price update.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub id: i64,
    pub instrument_id: i64,
    pub price: Decimal,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Seed-file row for creating an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}
