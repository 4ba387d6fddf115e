//! The trade engine: orchestrates trades, price updates, registration and
//! the read-side views over a [`StorePort`].
//!
//! Concurrency: trades for the same account serialize on a per-account lock
//! held only for the duration of one atomic unit; trades for different
//! accounts proceed in parallel. Price reads take no lock; each trade
//! captures the instrument price once and uses that snapshot throughout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::account::{Account, Role};
use super::error::LedgerError;
use super::instrument::{Instrument, InstrumentSpec, PriceChange};
use super::portfolio::{self, Holding, LeaderboardEntry, PortfolioSummary};
use super::trade::plan_trade;
use super::transaction::{Direction, TransactionRecord, TransactionView};
use crate::ports::store_port::StorePort;

pub const DEFAULT_STARTING_CASH: i64 = 1_000_000;

pub struct TradeEngine {
    store: Arc<dyn StorePort>,
    starting_cash: Decimal,
    account_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl TradeEngine {
    pub fn new(store: Arc<dyn StorePort>, starting_cash: Decimal) -> Self {
        TradeEngine {
            store,
            starting_cash,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_endowment(store: Arc<dyn StorePort>) -> Self {
        Self::new(store, Decimal::from(DEFAULT_STARTING_CASH))
    }

    fn account_lock(&self, account_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self
            .account_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(account_id).or_default().clone()
    }

    /// Execute a buy or sell as one atomic unit.
    ///
    /// Validation happens against snapshots taken under the account lock, so
    /// a concurrent trade on the same account cannot invalidate the plan
    /// between validation and commit. Resubmitting an identical intent is a
    /// brand-new trade; the engine is not idempotent.
    pub fn execute_trade(
        &self,
        account_id: i64,
        instrument_id: i64,
        direction: Direction,
        quantity: i64,
    ) -> Result<TransactionRecord, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::invalid_input(format!(
                "trade quantity must be positive, got {quantity}"
            )));
        }

        let lock = self.account_lock(account_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let account = self.store.get_account(account_id)?;
        let instrument = self.store.get_instrument(instrument_id)?;
        let existing = self.store.get_position(account_id, instrument_id)?;

        let plan = plan_trade(&account, &instrument, existing.as_ref(), direction, quantity)?;
        let record = self.store.commit_trade(&plan)?;

        info!(
            "trade executed: account={} {} {}x{} @ {} (total {})",
            account.username,
            direction.as_str(),
            instrument.symbol,
            quantity,
            record.unit_price,
            record.total_amount
        );
        Ok(record)
    }

    /// Set an instrument's price. Administrator-only; appends the history
    /// entry atomically with the update.
    pub fn set_price(
        &self,
        instrument_id: i64,
        new_price: Decimal,
        actor: &Account,
    ) -> Result<Instrument, LedgerError> {
        if new_price <= Decimal::ZERO {
            return Err(LedgerError::invalid_input(format!(
                "price must be positive, got {new_price}"
            )));
        }
        if !actor.role.is_administrator() {
            return Err(LedgerError::Unauthorized {
                action: format!("{} cannot set prices", actor.username),
            });
        }

        let updated = self
            .store
            .update_price(instrument_id, new_price, &actor.username, Utc::now())?;
        info!(
            "price updated: {} -> {} by {}",
            updated.symbol, new_price, actor.username
        );
        Ok(updated)
    }

    pub fn price_history(
        &self,
        instrument_id: i64,
        limit: usize,
    ) -> Result<Vec<PriceChange>, LedgerError> {
        self.store.price_history(instrument_id, limit)
    }

    /// Register an account with the configured starting cash endowment.
    pub fn register_account(
        &self,
        username: &str,
        name: &str,
        role: Role,
    ) -> Result<Account, LedgerError> {
        if username.trim().is_empty() {
            return Err(LedgerError::invalid_input("username must not be blank"));
        }
        if self.store.find_account_by_username(username)?.is_some() {
            return Err(LedgerError::invalid_input(format!(
                "username {username} is already taken"
            )));
        }
        let account = self
            .store
            .create_account(username, name, role, self.starting_cash)?;
        info!(
            "registered {} account {} with cash {}",
            role.as_str(),
            account.username,
            account.cash
        );
        Ok(account)
    }

    pub fn add_instrument(
        &self,
        symbol: &str,
        name: &str,
        price: Decimal,
    ) -> Result<Instrument, LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::invalid_input("symbol must not be blank"));
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::invalid_input(format!(
                "price must be positive, got {price}"
            )));
        }
        if self.store.find_instrument_by_symbol(symbol)?.is_some() {
            return Err(LedgerError::invalid_input(format!(
                "instrument {symbol} already exists"
            )));
        }
        self.store.create_instrument(symbol, name, price)
    }

    /// Create instruments from seed specs, skipping symbols that already
    /// exist so a seed file can be applied repeatedly. Returns the number
    /// created.
    pub fn seed_instruments(&self, specs: &[InstrumentSpec]) -> Result<usize, LedgerError> {
        let mut created = 0;
        for spec in specs {
            if self.store.find_instrument_by_symbol(&spec.symbol)?.is_some() {
                warn!("seed: instrument {} already exists, skipping", spec.symbol);
                continue;
            }
            self.store
                .create_instrument(&spec.symbol, &spec.name, spec.price)?;
            created += 1;
        }
        debug!("seeded {created} of {} instruments", specs.len());
        Ok(created)
    }

    pub fn list_instruments(&self) -> Result<Vec<Instrument>, LedgerError> {
        self.store.list_instruments()
    }

    pub fn get_instrument(&self, instrument_id: i64) -> Result<Instrument, LedgerError> {
        self.store.get_instrument(instrument_id)
    }

    pub fn find_instrument_by_symbol(
        &self,
        symbol: &str,
    ) -> Result<Option<Instrument>, LedgerError> {
        self.store.find_instrument_by_symbol(symbol)
    }

    pub fn get_account(&self, account_id: i64) -> Result<Account, LedgerError> {
        self.store.get_account(account_id)
    }

    pub fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, LedgerError> {
        self.store.find_account_by_username(username)
    }

    /// Current holdings with valuation, quantity-zero rows excluded.
    pub fn holdings(&self, account_id: i64) -> Result<Vec<Holding>, LedgerError> {
        let positions = self.store.list_positions(account_id)?;
        let instruments = self.instrument_map()?;
        Ok(positions
            .iter()
            .filter(|p| p.quantity > 0)
            .filter_map(|p| {
                instruments
                    .get(&p.instrument_id)
                    .map(|instrument| Holding::from_position(p, instrument))
            })
            .collect())
    }

    /// Cash plus mark-to-market value of every holding.
    pub fn portfolio(&self, account_id: i64) -> Result<PortfolioSummary, LedgerError> {
        let account = self.store.get_account(account_id)?;
        let holdings = self.holdings(account_id)?;
        let holdings_value: Decimal = holdings.iter().map(|h| h.market_value).sum();
        let total_assets = account.cash + holdings_value;
        Ok(PortfolioSummary {
            account,
            holdings,
            holdings_value,
            total_assets,
        })
    }

    /// Every participant ranked by total assets, descending. Administrators
    /// are not ranked.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let instruments = self.instrument_map()?;
        let prices: HashMap<i64, Decimal> = instruments
            .iter()
            .map(|(&id, instrument)| (id, instrument.current_price))
            .collect();

        let mut entries = Vec::new();
        for account in self.store.list_accounts()? {
            if account.role.is_administrator() {
                continue;
            }
            let positions = self.store.list_positions(account.id)?;
            let holdings_value = portfolio::holdings_value(&positions, &prices);
            entries.push(LeaderboardEntry {
                account_id: account.id,
                username: account.username,
                name: account.name,
                cash: account.cash,
                holdings_value,
                total_assets: account.cash + holdings_value,
            });
        }
        Ok(portfolio::rank_leaderboard(entries))
    }

    pub fn transactions(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        self.store.list_transactions(account_id, limit)
    }

    fn instrument_map(&self) -> Result<HashMap<i64, Instrument>, LedgerError> {
        Ok(self
            .store
            .list_instruments()?
            .into_iter()
            .map(|instrument| (instrument.id, instrument))
            .collect())
    }
}
