//! Database model for exchange rates.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::fx::ExchangeRate;
use vuka_core::{Error, Result};

use crate::utils::parse_decimal;

#[derive(Queryable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::exchange_rates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ExchangeRateDB {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<ExchangeRateDB> for ExchangeRate {
    type Error = Error;

    fn try_from(db: ExchangeRateDB) -> Result<Self> {
        Ok(Self {
            rate: parse_decimal(&db.rate, "exchange_rates.rate")?,
            from_currency: db.from_currency,
            to_currency: db.to_currency,
            updated_at: db.updated_at,
        })
    }
}
