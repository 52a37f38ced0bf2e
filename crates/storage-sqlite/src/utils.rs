//! Helpers for the TEXT-encoded columns used throughout the schema.
//!
//! Money, rates and enums are stored as text. Reading them back goes through
//! these helpers so a corrupt value surfaces as a database error instead of a
//! silently defaulted number.

use rust_decimal::Decimal;
use std::str::FromStr;
use vuka_core::Result;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite `IN (...)` queries.
///
/// SQLite's compile-time limit is usually 999; 500 leaves room for the rest of
/// the statement.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice for batched `IN (...)` queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn parse_decimal(value: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| {
        StorageError::CorruptValue(format!("{} = '{}': {}", column, value, e)).into()
    })
}

pub fn parse_optional_decimal(value: Option<&str>, column: &str) -> Result<Option<Decimal>> {
    value.map(|v| parse_decimal(v, column)).transpose()
}

/// Parses a text enum column (status, role, gateway...).
pub fn parse_text<T: FromStr>(value: &str, column: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        StorageError::CorruptValue(format!("{} has unknown value '{}'", column, value)).into()
    })
}

pub fn parse_optional_text<T: FromStr>(value: Option<&str>, column: &str) -> Result<Option<T>> {
    value.map(|v| parse_text(v, column)).transpose()
}

/// Text form for a decimal column. Keeps the scale so cents survive a round trip.
pub fn decimal_text(value: Decimal) -> String {
    value.to_string()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vuka_core::invoices::InvoiceStatus;

    #[test]
    fn chunks_stay_under_limit() {
        let items: Vec<i32> = (0..1001).collect();
        let sizes: Vec<usize> = chunk_for_sqlite(&items).map(<[i32]>::len).collect();
        assert_eq!(sizes, vec![500, 500, 1]);
        assert_eq!(chunk_for_sqlite::<i32>(&[]).count(), 0);
    }

    #[test]
    fn decimal_text_round_trips() {
        assert_eq!(decimal_text(dec!(1150.00)), "1150.00");
        assert_eq!(parse_decimal("1150.00", "total").unwrap().to_string(), "1150.00");
        assert_eq!(parse_decimal("-29.50", "fee").unwrap(), dec!(-29.5));
    }

    #[test]
    fn corrupt_values_are_database_errors() {
        let err = parse_decimal("abc", "total").unwrap_err();
        assert!(matches!(err, vuka_core::Error::Database(_)));
        assert!(parse_text::<InvoiceStatus>("SETTLED", "status").is_err());
        assert_eq!(
            parse_optional_text::<InvoiceStatus>(Some("PAID"), "status").unwrap(),
            Some(InvoiceStatus::Paid)
        );
    }
}
