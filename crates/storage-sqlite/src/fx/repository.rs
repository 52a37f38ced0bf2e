use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use vuka_core::fx::{
    normalize_currency_code, CurrencyConverter, ExchangeRate, FxRepositoryTrait, NewExchangeRate,
};
use vuka_core::Result;

use super::model::ExchangeRateDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::exchange_rates;
use crate::utils::decimal_text;

fn load_rates(conn: &mut SqliteConnection) -> Result<Vec<ExchangeRate>> {
    exchange_rates::table
        .order((exchange_rates::from_currency, exchange_rates::to_currency))
        .select(ExchangeRateDB::as_select())
        .load::<ExchangeRateDB>(conn)
        .into_core()?
        .into_iter()
        .map(ExchangeRate::try_from)
        .collect()
}

/// Converter over the rates visible inside the current write transaction.
pub(crate) fn load_converter_in_transaction(
    conn: &mut SqliteConnection,
) -> Result<CurrencyConverter> {
    Ok(CurrencyConverter::new(load_rates(conn)?))
}

pub struct FxRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl FxRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl FxRepositoryTrait for FxRepository {
    fn list_rates(&self) -> Result<Vec<ExchangeRate>> {
        let mut conn = get_connection(&self.pool)?;
        load_rates(&mut conn)
    }

    async fn upsert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate> {
        rate.validate()?;
        let row = ExchangeRateDB {
            from_currency: normalize_currency_code(&rate.from_currency)?,
            to_currency: normalize_currency_code(&rate.to_currency)?,
            rate: decimal_text(rate.rate),
            updated_at: Utc::now().naive_utc(),
        };

        self.writer
            .exec(move |conn| {
                diesel::insert_into(exchange_rates::table)
                    .values(&row)
                    .on_conflict((exchange_rates::from_currency, exchange_rates::to_currency))
                    .do_update()
                    .set((
                        exchange_rates::rate.eq(&row.rate),
                        exchange_rates::updated_at.eq(row.updated_at),
                    ))
                    .execute(conn)
                    .into_core()?;
                ExchangeRate::try_from(row)
            })
            .await
    }
}
