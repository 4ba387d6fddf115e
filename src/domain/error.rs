//! Ledger error types.

/// Top-level error type for papertrade.
///
/// Business-rule errors (`InvalidInput` through `InsufficientHoldings`) are
/// detected before any store mutation; `Storage`/`StorageQuery` abort the
/// transaction in progress, which rolls back uncommitted writes.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("account {id} not found")]
    AccountNotFound { id: i64 },

    #[error("instrument {id} not found")]
    InstrumentNotFound { id: i64 },

    #[error("unauthorized: {action}")]
    Unauthorized { action: String },

    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("insufficient holdings: tried to sell {requested}, hold {held}")]
    InsufficientHoldings { requested: i64, held: i64 },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("storage query error: {reason}")]
    StorageQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Storage { .. } | LedgerError::StorageQuery { .. } => 3,
            LedgerError::InvalidInput { .. } | LedgerError::Unauthorized { .. } => 4,
            LedgerError::AccountNotFound { .. } | LedgerError::InstrumentNotFound { .. } => 5,
            LedgerError::InsufficientFunds { .. } | LedgerError::InsufficientHoldings { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
