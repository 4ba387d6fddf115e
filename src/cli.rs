//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::account::{Account, Role};
use crate::domain::engine::{DEFAULT_STARTING_CASH, TradeEngine};
use crate::domain::error::LedgerError;
use crate::domain::instrument::Instrument;
use crate::domain::transaction::Direction;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "papertrade", about = "Virtual stock trading ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl From<TradeDirection> for Direction {
    fn from(direction: TradeDirection) -> Direction {
        match direction {
            TradeDirection::Buy => Direction::Buy,
            TradeDirection::Sell => Direction::Sell,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Register an account with the starting cash endowment
    Register {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        username: String,
        #[arg(long)]
        name: String,
        /// Register as an administrator (sets prices, never trades)
        #[arg(long)]
        admin: bool,
    },
    /// Create instruments from a CSV seed file (symbol,name,price)
    Seed {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instruments: PathBuf,
    },
    /// Create a single instrument
    AddInstrument {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Update an instrument's price (administrator only)
    SetPrice {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        price: Decimal,
        /// Username of the acting administrator
        #[arg(long)]
        actor: String,
    },
    /// Execute a buy or sell
    Trade {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        account: String,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        direction: TradeDirection,
        #[arg(long)]
        quantity: i64,
    },
    /// Show an account's cash, holdings and total assets
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        account: String,
    },
    /// Show an account's trade history, most recent first
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        account: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show an instrument's price history, most recent first
    PriceHistory {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Rank participants by total assets
    Leaderboard {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List all instruments
    Instruments {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Init { config } => cmd_init(&config),
        Command::Register {
            config,
            username,
            name,
            admin,
        } => cmd_register(&config, &username, &name, admin),
        Command::Seed {
            config,
            instruments,
        } => cmd_seed(&config, &instruments),
        Command::AddInstrument {
            config,
            symbol,
            name,
            price,
        } => cmd_add_instrument(&config, &symbol, &name, price),
        Command::SetPrice {
            config,
            symbol,
            price,
            actor,
        } => cmd_set_price(&config, &symbol, price, &actor),
        Command::Trade {
            config,
            account,
            symbol,
            direction,
            quantity,
        } => cmd_trade(&config, &account, &symbol, direction.into(), quantity),
        Command::Portfolio { config, account } => cmd_portfolio(&config, &account),
        Command::History {
            config,
            account,
            limit,
        } => cmd_history(&config, &account, limit),
        Command::PriceHistory {
            config,
            symbol,
            limit,
        } => cmd_price_history(&config, &symbol, limit),
        Command::Leaderboard { config } => cmd_leaderboard(&config),
        Command::Instruments { config } => cmd_instruments(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, LedgerError> {
    FileConfigAdapter::from_file(path).map_err(|e| LedgerError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Build a store-backed engine from an INI config file.
pub fn build_engine(config_path: &PathBuf) -> Result<TradeEngine, LedgerError> {
    let config = load_config(config_path)?;
    let store = SqliteStore::from_config(&config)?;
    let starting_cash = config.get_decimal(
        "ledger",
        "starting_cash",
        Decimal::from(DEFAULT_STARTING_CASH),
    );
    Ok(TradeEngine::new(Arc::new(store), starting_cash))
}

fn build_engine_with_schema(config_path: &PathBuf) -> Result<TradeEngine, LedgerError> {
    let config = load_config(config_path)?;
    let store = SqliteStore::from_config(&config)?;
    store.initialize_schema()?;
    let starting_cash = config.get_decimal(
        "ledger",
        "starting_cash",
        Decimal::from(DEFAULT_STARTING_CASH),
    );
    Ok(TradeEngine::new(Arc::new(store), starting_cash))
}

fn resolve_account(engine: &TradeEngine, username: &str) -> Result<Account, LedgerError> {
    engine.find_account_by_username(username)?.ok_or_else(|| {
        LedgerError::invalid_input(format!("no account with username {username}"))
    })
}

fn resolve_instrument(engine: &TradeEngine, symbol: &str) -> Result<Instrument, LedgerError> {
    engine.find_instrument_by_symbol(symbol)?.ok_or_else(|| {
        LedgerError::invalid_input(format!("no instrument with symbol {symbol}"))
    })
}

fn cmd_init(config_path: &PathBuf) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let store = SqliteStore::from_config(&config)?;
    store.initialize_schema()?;
    println!("schema initialized");
    Ok(())
}

fn cmd_register(
    config_path: &PathBuf,
    username: &str,
    name: &str,
    admin: bool,
) -> Result<(), LedgerError> {
    let engine = build_engine_with_schema(config_path)?;
    let role = if admin {
        Role::Administrator
    } else {
        Role::Participant
    };
    let account = engine.register_account(username, name, role)?;
    println!(
        "registered {} {} ({}) with cash {}",
        account.role.as_str(),
        account.username,
        account.name,
        account.cash
    );
    Ok(())
}

fn cmd_seed(config_path: &PathBuf, instruments_path: &PathBuf) -> Result<(), LedgerError> {
    let engine = build_engine_with_schema(config_path)?;
    let specs = csv_adapter::load_instrument_specs(instruments_path)?;
    let created = engine.seed_instruments(&specs)?;
    println!("created {created} of {} instruments", specs.len());
    Ok(())
}

fn cmd_add_instrument(
    config_path: &PathBuf,
    symbol: &str,
    name: &str,
    price: Decimal,
) -> Result<(), LedgerError> {
    let engine = build_engine_with_schema(config_path)?;
    let instrument = engine.add_instrument(symbol, name, price)?;
    println!(
        "added {} ({}) at {}",
        instrument.symbol, instrument.name, instrument.current_price
    );
    Ok(())
}

fn cmd_set_price(
    config_path: &PathBuf,
    symbol: &str,
    price: Decimal,
    actor: &str,
) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let actor = resolve_account(&engine, actor)?;
    let instrument = resolve_instrument(&engine, symbol)?;
    let updated = engine.set_price(instrument.id, price, &actor)?;
    println!("{} price set to {}", updated.symbol, updated.current_price);
    Ok(())
}

fn cmd_trade(
    config_path: &PathBuf,
    account: &str,
    symbol: &str,
    direction: Direction,
    quantity: i64,
) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let account = resolve_account(&engine, account)?;
    let instrument = resolve_instrument(&engine, symbol)?;
    let record = engine.execute_trade(account.id, instrument.id, direction, quantity)?;
    println!(
        "{} {} x{} @ {} (total {})",
        record.direction.as_str(),
        instrument.symbol,
        record.quantity,
        record.unit_price,
        record.total_amount
    );
    Ok(())
}

fn cmd_portfolio(config_path: &PathBuf, account: &str) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let account = resolve_account(&engine, account)?;
    let summary = engine.portfolio(account.id)?;

    println!("{} ({})", summary.account.username, summary.account.name);
    println!("cash:         {}", summary.account.cash.round_dp(2));
    println!("holdings:     {}", summary.holdings_value.round_dp(2));
    println!("total assets: {}", summary.total_assets.round_dp(2));
    if summary.holdings.is_empty() {
        return Ok(());
    }
    println!();
    println!(
        "{:<8} {:<24} {:>8} {:>12} {:>12} {:>12} {:>8}",
        "symbol", "name", "qty", "avg cost", "price", "profit", "rate%"
    );
    for holding in &summary.holdings {
        let rate = holding
            .profit_rate
            .map(|r| r.round_dp(2).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<24} {:>8} {:>12} {:>12} {:>12} {:>8}",
            holding.symbol,
            holding.instrument_name,
            holding.quantity,
            holding.average_cost.round_dp(2),
            holding.current_price.round_dp(2),
            holding.unrealized_profit.round_dp(2),
            rate
        );
    }
    Ok(())
}

fn cmd_history(config_path: &PathBuf, account: &str, limit: usize) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let account = resolve_account(&engine, account)?;
    let views = engine.transactions(account.id, limit)?;
    if views.is_empty() {
        println!("no transactions");
        return Ok(());
    }
    for view in &views {
        println!(
            "{} {:<4} {:<8} x{:<6} @ {:>12} total {:>14}",
            view.record.executed_at.format("%Y-%m-%d %H:%M:%S"),
            view.record.direction.as_str(),
            view.symbol,
            view.record.quantity,
            view.record.unit_price.round_dp(2),
            view.record.total_amount.round_dp(2)
        );
    }
    Ok(())
}

fn cmd_price_history(
    config_path: &PathBuf,
    symbol: &str,
    limit: usize,
) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let instrument = resolve_instrument(&engine, symbol)?;
    let history = engine.price_history(instrument.id, limit)?;
    if history.is_empty() {
        println!("no price changes for {symbol}");
        return Ok(());
    }
    for change in &history {
        println!(
            "{} {:>12} by {}",
            change.changed_at.format("%Y-%m-%d %H:%M:%S"),
            change.price.round_dp(2),
            change.changed_by
        );
    }
    Ok(())
}

fn cmd_leaderboard(config_path: &PathBuf) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    let entries = engine.leaderboard()?;
    println!(
        "{:<5} {:<12} {:<20} {:>14} {:>14} {:>14}",
        "rank", "username", "name", "cash", "holdings", "total"
    );
    for (index, entry) in entries.iter().enumerate() {
        println!(
            "{:<5} {:<12} {:<20} {:>14} {:>14} {:>14}",
            index + 1,
            entry.username,
            entry.name,
            entry.cash.round_dp(2),
            entry.holdings_value.round_dp(2),
            entry.total_assets.round_dp(2)
        );
    }
    Ok(())
}

fn cmd_instruments(config_path: &PathBuf) -> Result<(), LedgerError> {
    let engine = build_engine(config_path)?;
    for instrument in engine.list_instruments()? {
        println!(
            "{:<8} {:<24} {:>12}  (updated {})",
            instrument.symbol,
            instrument.name,
            instrument.current_price.round_dp(2),
            instrument.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
