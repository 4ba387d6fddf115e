//! Persistence port trait.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::account::{Account, Role};
use crate::domain::error::LedgerError;
use crate::domain::instrument::{Instrument, PriceChange};
use crate::domain::position::Position;
use crate::domain::trade::TradePlan;
use crate::domain::transaction::{TransactionRecord, TransactionView};

/// Storage boundary for the ledger.
///
/// Two operations are atomic units: `commit_trade` applies every write of a
/// [`TradePlan`] (cash, position, transaction record) in one transaction,
/// and `update_price` changes the current price and appends the history
/// entry together, stamped with the same instant. Everything else is a
/// single read or insert.
pub trait StorePort: Send + Sync {
    fn create_account(
        &self,
        username: &str,
        name: &str,
        role: Role,
        starting_cash: Decimal,
    ) -> Result<Account, LedgerError>;

    fn get_account(&self, account_id: i64) -> Result<Account, LedgerError>;

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, LedgerError>;

    fn list_accounts(&self) -> Result<Vec<Account>, LedgerError>;

    fn create_instrument(
        &self,
        symbol: &str,
        name: &str,
        price: Decimal,
    ) -> Result<Instrument, LedgerError>;

    fn get_instrument(&self, instrument_id: i64) -> Result<Instrument, LedgerError>;

    fn find_instrument_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>, LedgerError>;

    fn list_instruments(&self) -> Result<Vec<Instrument>, LedgerError>;

    /// Set the current price and append the matching history entry, both
    /// stamped `changed_at`, as one transaction.
    fn update_price(
        &self,
        instrument_id: i64,
        price: Decimal,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<Instrument, LedgerError>;

    /// Most-recent-first price history, bounded by `limit`.
    fn price_history(
        &self,
        instrument_id: i64,
        limit: usize,
    ) -> Result<Vec<PriceChange>, LedgerError>;

    fn get_position(
        &self,
        account_id: i64,
        instrument_id: i64,
    ) -> Result<Option<Position>, LedgerError>;

    fn list_positions(&self, account_id: i64) -> Result<Vec<Position>, LedgerError>;

    /// Apply one trade's writes as a single transaction and return the
    /// appended record with its assigned id and timestamp.
    fn commit_trade(&self, plan: &TradePlan) -> Result<TransactionRecord, LedgerError>;

    /// Most-recent-first executed trades for an account, bounded by `limit`.
    fn list_transactions(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionView>, LedgerError>;
}
