//! Money arithmetic helpers. Every persisted amount passes through [`round_money`].

use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::constants::MONEY_DECIMAL_PLACES;
use crate::errors::{Error, Result};

/// Rounds to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × percent / 100`, rounded to cents.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / dec!(100))
}

/// Converts an amount to integer minor units, as payment gateways expect.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    (round_money(amount) * dec!(100))
        .to_i64()
        .ok_or_else(|| Error::invalid_input(format!("Amount {} is out of range", amount)))
}

/// Converts integer minor units back to a decimal amount.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_DECIMAL_PLACES)
}

/// Rejects negative or zero amounts with a message naming the field.
pub fn ensure_positive(value: Decimal, field: &str) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(Error::invalid_input(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(())
}
