use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    #[serde(serialize_with = "serialize_decimal_6")]
    pub rate: Decimal,
    pub updated_at: NaiveDateTime,
}

fn serialize_decimal_6<S>(decimal: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = decimal.round_dp(6);
    serializer.serialize_str(&rounded.to_string())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
}

impl NewExchangeRate {
    pub fn validate(&self) -> Result<()> {
        normalize_currency_code(&self.from_currency)?;
        normalize_currency_code(&self.to_currency)?;
        if self.rate <= Decimal::ZERO {
            return Err(Error::invalid_input("Exchange rate must be positive"));
        }
        if self.from_currency.eq_ignore_ascii_case(&self.to_currency) {
            return Err(Error::invalid_input(
                "Exchange rate needs two different currencies",
            ));
        }
        Ok(())
    }
}

/// Upper-cases and checks a three-letter ISO 4217 code.
pub fn normalize_currency_code(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::invalid_input(format!(
            "'{}' is not a currency code",
            code
        )));
    }
    Ok(code)
}

/// An amount expressed in a target currency, remembering where it came from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedAmount {
    pub amount: Decimal,
    pub currency: String,
    pub original_amount: Decimal,
    pub original_currency: String,
    pub rate: Decimal,
}

impl ConvertedAmount {
    pub fn same_currency(amount: Decimal, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            original_amount: amount,
            original_currency: currency.to_string(),
            rate: Decimal::ONE,
        }
    }

    pub fn is_conversion(&self) -> bool {
        self.currency != self.original_currency
    }
}
