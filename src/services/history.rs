//! History formatting.

use alloy::primitives::U256;

use crate::{
    error::{AppError, Result},
    types::{RawTransactionRecord, TransactionRecord},
};

/// Convert raw contract history into display records, preserving order.
///
/// Amounts and timestamps are narrowed to `u64`; a value that does not fit
/// fails the whole batch rather than showing a wrapped number.
pub fn format_history(raw: &[RawTransactionRecord]) -> Result<Vec<TransactionRecord>> {
    raw.iter().map(format_record).collect()
}

fn format_record(record: &RawTransactionRecord) -> Result<TransactionRecord> {
    Ok(TransactionRecord {
        from: record.from.to_checksum(None),
        amount: narrow(record.amount, "amount")?,
        timestamp: narrow(record.timestamp, "timestamp")?,
    })
}

fn narrow(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| AppError::NumericOverflow(format!("{field} {value} exceeds u64 range")))
}
