//! CSV instrument seed file adapter.
//!
//! Expected columns: `symbol,name,price` with a header row.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::error::LedgerError;
use crate::domain::instrument::InstrumentSpec;

pub fn load_instrument_specs<P: AsRef<Path>>(path: P) -> Result<Vec<InstrumentSpec>, LedgerError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::Storage {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    parse_instrument_specs(&content)
}

pub fn parse_instrument_specs(content: &str) -> Result<Vec<InstrumentSpec>, LedgerError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut specs = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let line = index + 2; // header is line 1
        let record = result.map_err(|e| LedgerError::invalid_input(format!(
            "CSV parse error on line {line}: {e}"
        )))?;

        let symbol = record
            .get(0)
            .ok_or_else(|| LedgerError::invalid_input(format!("line {line}: missing symbol column")))?
            .trim();
        if symbol.is_empty() {
            return Err(LedgerError::invalid_input(format!(
                "line {line}: symbol must not be blank"
            )));
        }

        let name = record
            .get(1)
            .ok_or_else(|| LedgerError::invalid_input(format!("line {line}: missing name column")))?
            .trim();

        let price_text = record
            .get(2)
            .ok_or_else(|| LedgerError::invalid_input(format!("line {line}: missing price column")))?
            .trim();
        let price = Decimal::from_str(price_text).map_err(|e| {
            LedgerError::invalid_input(format!("line {line}: invalid price {price_text:?}: {e}"))
        })?;
        if price <= Decimal::ZERO {
            return Err(LedgerError::invalid_input(format!(
                "line {line}: price must be positive, got {price}"
            )));
        }

        specs.push(InstrumentSpec {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
        });
    }

    Ok(specs)
}
