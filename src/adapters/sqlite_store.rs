//! SQLite ledger store.
//!
//! Decimals are stored as TEXT and round-tripped through `FromStr`/`Display`
//! so currency never passes through floating point. Timestamps are RFC 3339
//! TEXT. The two multi-write operations (`commit_trade`, `update_price`)
//! run as IMMEDIATE transactions; an error before commit rolls back every
//! write of the unit.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::domain::account::{Account, Role};
use crate::domain::error::LedgerError;
use crate::domain::instrument::{Instrument, PriceChange};
use crate::domain::position::Position;
use crate::domain::trade::TradePlan;
use crate::domain::transaction::{Direction, TransactionRecord, TransactionView};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> LedgerError {
    LedgerError::Storage {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::StorageQuery {
        reason: e.to_string(),
    }
}

fn decimal_column(row: &Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn timestamp_column(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn role_column(row: &Row, idx: usize) -> Result<Role, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Role::parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown role: {text}").into(),
        )
    })
}

fn direction_column(row: &Row, idx: usize) -> Result<Direction, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Direction::parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown direction: {text}").into(),
        )
    })
}

fn account_from_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        cash: decimal_column(row, 3)?,
        role: role_column(row, 4)?,
    })
}

fn instrument_from_row(row: &Row) -> Result<Instrument, rusqlite::Error> {
    Ok(Instrument {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        current_price: decimal_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}

const SELECT_ACCOUNT: &str = "SELECT id, username, name, cash, role FROM accounts";
const SELECT_INSTRUMENT: &str =
    "SELECT id, symbol, name, current_price, updated_at FROM instruments";

impl SqliteStore {
    pub fn open(path: &str, pool_size: u32) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;
        Ok(Self { pool })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| LedgerError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;
        Self::open(&db_path, pool_size)
    }

    pub fn in_memory() -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                cash TEXT NOT NULL,
                role TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS instruments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                current_price TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instrument_id INTEGER NOT NULL REFERENCES instruments(id),
                price TEXT NOT NULL,
                changed_by TEXT NOT NULL,
                changed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_price_history_instrument
                ON price_history(instrument_id, changed_at);
            CREATE TABLE IF NOT EXISTS positions (
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                instrument_id INTEGER NOT NULL REFERENCES instruments(id),
                quantity INTEGER NOT NULL,
                average_cost TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (account_id, instrument_id)
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                instrument_id INTEGER NOT NULL REFERENCES instruments(id),
                direction TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                unit_price TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                executed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_account
                ON transactions(account_id, executed_at);",
        )
        .map_err(query_err)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool.get().map_err(pool_err)
    }
}

impl StorePort for SqliteStore {
    fn create_account(
        &self,
        username: &str,
        name: &str,
        role: Role,
        starting_cash: Decimal,
    ) -> Result<Account, LedgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (username, name, cash, role) VALUES (?1, ?2, ?3, ?4)",
            params![username, name, starting_cash.to_string(), role.as_str()],
        )
        .map_err(query_err)?;
        Ok(Account {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            name: name.to_string(),
            cash: starting_cash,
            role,
        })
    }

    fn get_account(&self, account_id: i64) -> Result<Account, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_ACCOUNT} WHERE id = ?1"),
            params![account_id],
            account_from_row,
        )
        .optional()
        .map_err(query_err)?
        .ok_or(LedgerError::AccountNotFound { id: account_id })
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_ACCOUNT} WHERE username = ?1"),
            params![username],
            account_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_ACCOUNT} ORDER BY id"))
            .map_err(query_err)?;
        let rows = stmt.query_map([], account_from_row).map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn create_instrument(
        &self,
        symbol: &str,
        name: &str,
        price: Decimal,
    ) -> Result<Instrument, LedgerError> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO instruments (symbol, name, current_price, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![symbol, name, price.to_string(), now.to_rfc3339()],
        )
        .map_err(query_err)?;
        Ok(Instrument {
            id: conn.last_insert_rowid(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            current_price: price,
            updated_at: now,
        })
    }

    fn get_instrument(&self, instrument_id: i64) -> Result<Instrument, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_INSTRUMENT} WHERE id = ?1"),
            params![instrument_id],
            instrument_from_row,
        )
        .optional()
        .map_err(query_err)?
        .ok_or(LedgerError::InstrumentNotFound { id: instrument_id })
    }

    fn find_instrument_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{SELECT_INSTRUMENT} WHERE symbol = ?1"),
            params![symbol],
            instrument_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_INSTRUMENT} ORDER BY id"))
            .map_err(query_err)?;
        let rows = stmt.query_map([], instrument_from_row).map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn update_price(
        &self,
        instrument_id: i64,
        price: Decimal,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<Instrument, LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let changed = tx
            .execute(
                "UPDATE instruments SET current_price = ?1, updated_at = ?2 WHERE id = ?3",
                params![price.to_string(), changed_at.to_rfc3339(), instrument_id],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(LedgerError::InstrumentNotFound { id: instrument_id });
        }

        tx.execute(
            "INSERT INTO price_history (instrument_id, price, changed_by, changed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                instrument_id,
                price.to_string(),
                changed_by,
                changed_at.to_rfc3339()
            ],
        )
        .map_err(query_err)?;

        let updated = tx
            .query_row(
                &format!("{SELECT_INSTRUMENT} WHERE id = ?1"),
                params![instrument_id],
                instrument_from_row,
            )
            .map_err(query_err)?;

        tx.commit().map_err(query_err)?;
        Ok(updated)
    }

    fn price_history(
        &self,
        instrument_id: i64,
        limit: usize,
    ) -> Result<Vec<PriceChange>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, instrument_id, price, changed_by, changed_at
                 FROM price_history
                 WHERE instrument_id = ?1
                 ORDER BY changed_at DESC, id DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![instrument_id, limit as i64], |row| {
                Ok(PriceChange {
                    id: row.get(0)?,
                    instrument_id: row.get(1)?,
                    price: decimal_column(row, 2)?,
                    changed_by: row.get(3)?,
                    changed_at: timestamp_column(row, 4)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn get_position(
        &self,
        account_id: i64,
        instrument_id: i64,
    ) -> Result<Option<Position>, LedgerError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT account_id, instrument_id, quantity, average_cost, updated_at
             FROM positions
             WHERE account_id = ?1 AND instrument_id = ?2",
            params![account_id, instrument_id],
            position_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_positions(&self, account_id: i64) -> Result<Vec<Position>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT account_id, instrument_id, quantity, average_cost, updated_at
                 FROM positions
                 WHERE account_id = ?1
                 ORDER BY instrument_id",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![account_id], position_from_row)
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn commit_trade(&self, plan: &TradePlan) -> Result<TransactionRecord, LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;
        let now = Utc::now();

        let changed = tx
            .execute(
                "UPDATE accounts SET cash = ?1 WHERE id = ?2",
                params![plan.cash_after.to_string(), plan.account_id],
            )
            .map_err(query_err)?;
        if changed == 0 {
            return Err(LedgerError::AccountNotFound {
                id: plan.account_id,
            });
        }

        match &plan.position_after {
            Some(update) => {
                tx.execute(
                    "INSERT INTO positions (account_id, instrument_id, quantity, average_cost, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (account_id, instrument_id) DO UPDATE SET
                         quantity = excluded.quantity,
                         average_cost = excluded.average_cost,
                         updated_at = excluded.updated_at",
                    params![
                        plan.account_id,
                        plan.instrument_id,
                        update.quantity,
                        update.average_cost.to_string(),
                        now.to_rfc3339()
                    ],
                )
                .map_err(query_err)?;
            }
            None => {
                tx.execute(
                    "DELETE FROM positions WHERE account_id = ?1 AND instrument_id = ?2",
                    params![plan.account_id, plan.instrument_id],
                )
                .map_err(query_err)?;
            }
        }

        tx.execute(
            "INSERT INTO transactions
                 (account_id, instrument_id, direction, quantity, unit_price, total_amount, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                plan.account_id,
                plan.instrument_id,
                plan.direction.as_str(),
                plan.quantity,
                plan.unit_price.to_string(),
                plan.total_amount.to_string(),
                now.to_rfc3339()
            ],
        )
        .map_err(query_err)?;
        let record_id = tx.last_insert_rowid();

        tx.commit().map_err(query_err)?;

        Ok(TransactionRecord {
            id: record_id,
            account_id: plan.account_id,
            instrument_id: plan.instrument_id,
            direction: plan.direction,
            quantity: plan.quantity,
            unit_price: plan.unit_price,
            total_amount: plan.total_amount,
            executed_at: now,
        })
    }

    fn list_transactions(
        &self,
        account_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.account_id, t.instrument_id, t.direction, t.quantity,
                        t.unit_price, t.total_amount, t.executed_at, i.symbol, i.name
                 FROM transactions t
                 JOIN instruments i ON t.instrument_id = i.id
                 WHERE t.account_id = ?1
                 ORDER BY t.executed_at DESC, t.id DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![account_id, limit as i64], |row| {
                Ok(TransactionView {
                    record: TransactionRecord {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        instrument_id: row.get(2)?,
                        direction: direction_column(row, 3)?,
                        quantity: row.get(4)?,
                        unit_price: decimal_column(row, 5)?,
                        total_amount: decimal_column(row, 6)?,
                        executed_at: timestamp_column(row, 7)?,
                    },
                    symbol: row.get(8)?,
                    instrument_name: row.get(9)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}

fn position_from_row(row: &Row) -> Result<Position, rusqlite::Error> {
    Ok(Position {
        account_id: row.get(0)?,
        instrument_id: row.get(1)?,
        quantity: row.get(2)?,
        average_cost: decimal_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}
