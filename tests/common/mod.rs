#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use papertrade::adapters::sqlite_store::SqliteStore;
use papertrade::domain::account::{Account, Role};
use papertrade::domain::engine::TradeEngine;
use papertrade::domain::error::LedgerError;
use papertrade::domain::instrument::{Instrument, PriceChange};
use papertrade::domain::position::Position;
use papertrade::domain::trade::TradePlan;
use papertrade::domain::transaction::{TransactionRecord, TransactionView};
pub use papertrade::ports::store_port::StorePort;

pub fn memory_store() -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().unwrap();
    store.initialize_schema().unwrap();
    Arc::new(store)
}

pub fn memory_engine() -> (Arc<SqliteStore>, TradeEngine) {
    let store = memory_store();
    let engine = TradeEngine::with_default_endowment(store.clone());
    (store, engine)
}

/// File-backed store for tests that need true cross-connection concurrency.
pub fn file_engine(pool_size: u32) -> (tempfile::TempDir, Arc<SqliteStore>, TradeEngine) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let store = Arc::new(SqliteStore::open(path.to_str().unwrap(), pool_size).unwrap());
    store.initialize_schema().unwrap();
    let engine = TradeEngine::with_default_endowment(store.clone());
    (dir, store, engine)
}

pub fn participant(engine: &TradeEngine, username: &str) -> Account {
    engine
        .register_account(username, &format!("Participant {username}"), Role::Participant)
        .unwrap()
}

pub fn admin(engine: &TradeEngine, username: &str) -> Account {
    engine
        .register_account(username, &format!("Admin {username}"), Role::Administrator)
        .unwrap()
}

pub fn instrument(engine: &TradeEngine, symbol: &str, price: Decimal) -> Instrument {
    engine
        .add_instrument(symbol, &format!("{symbol} Corp"), price)
        .unwrap()
}

pub fn starting_cash() -> Decimal {
    dec!(1000000)
}

/// Store wrapper that can be switched to fail `commit_trade`, for testing
/// that a storage fault surfaces as an error with no partial effect.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    fail_commit: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_commit: AtomicBool::new(false),
        }
    }

    pub fn fail_next_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }
}

impl StorePort for FlakyStore {
    fn create_account(
        &self,
        username: &str,
        name: &str,
        role: Role,
        starting_cash: Decimal,
    ) -> Result<Account, LedgerError> {
        self.inner.create_account(username, name, role, starting_cash)
    }

    fn get_account(&self, account_id: i64) -> Result<Account, LedgerError> {
        self.inner.get_account(account_id)
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, LedgerError> {
        self.inner.find_account_by_username(username)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.inner.list_accounts()
    }

    fn create_instrument(
        &self,
        symbol: &str,
        name: &str,
        price: Decimal,
    ) -> Result<Instrument, LedgerError> {
        self.inner.create_instrument(symbol, name, price)
    }

    fn get_instrument(&self, instrument_id: i64) -> Result<Instrument, LedgerError> {
        self.inner.get_instrument(instrument_id)
    }

    fn find_instrument_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>, LedgerError> {
        self.inner.find_instrument_by_symbol(symbol)
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, LedgerError> {
        self.inner.list_instruments()
    }

    fn update_price(
        &self,
        instrument_id: i64,
        price: Decimal,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<Instrument, LedgerError> {
        self.inner
            .update_price(instrument_id, price, changed_by, changed_at)
    }

    fn price_history(
        &self,
        instrument_id: i64,
        limit: usize,
    ) -> Result<Vec<PriceChange>, LedgerError> {
        self.inner.price_history(instrument_id, limit)
    }

    fn get_position(
        &self,
        account_id: i64,
        instrument_id: i64,
    ) -> Result<Option<Position>, LedgerError> {
        self.inner.get_position(account_id, instrument_id)
    }

    fn list_positions(&self, account_id: i64) -> Result<Vec<Position>, LedgerError> {
        self.inner.list_positions(account_id)
    }

    fn commit_trade(&self, plan: &TradePlan) -> Result<TransactionRecord, LedgerError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage {
                reason: "injected commit failure".into(),
            });
        }
        self.inner.commit_trade(plan)
    }

    fn list_transactions(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        self.inner.list_transactions(account_id, limit)
    }
}
