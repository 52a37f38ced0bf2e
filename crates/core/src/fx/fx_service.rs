use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::currency_converter::CurrencyConverter;
use super::fx_model::{normalize_currency_code, ConvertedAmount, ExchangeRate, NewExchangeRate};
use super::fx_traits::{FxRepositoryTrait, FxServiceTrait};
use crate::errors::Result;

pub struct FxService {
    repository: Arc<dyn FxRepositoryTrait>,
}

impl FxService {
    pub fn new(repository: Arc<dyn FxRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl FxServiceTrait for FxService {
    fn list_rates(&self) -> Result<Vec<ExchangeRate>> {
        self.repository.list_rates()
    }

    fn convert(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConvertedAmount> {
        let from = normalize_currency_code(from_currency)?;
        let to = normalize_currency_code(to_currency)?;
        if from == to {
            return Ok(ConvertedAmount::same_currency(amount, &to));
        }
        let converter = CurrencyConverter::new(self.repository.list_rates()?);
        let converted = converter.convert(amount, &from, &to)?;
        debug!(
            "Converted {} {} to {} {} at {}",
            amount, from, converted.amount, to, converted.rate
        );
        Ok(converted)
    }

    async fn set_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate> {
        rate.validate()?;
        let normalized = NewExchangeRate {
            from_currency: normalize_currency_code(&rate.from_currency)?,
            to_currency: normalize_currency_code(&rate.to_currency)?,
            rate: rate.rate,
        };
        let saved = self.repository.upsert_rate(normalized).await?;
        info!(
            "Exchange rate {}/{} set to {}",
            saved.from_currency, saved.to_currency, saved.rate
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockFxRepository {
        rates: Mutex<Vec<ExchangeRate>>,
    }

    #[async_trait]
    impl FxRepositoryTrait for MockFxRepository {
        fn list_rates(&self) -> Result<Vec<ExchangeRate>> {
            Ok(self.rates.lock().unwrap().clone())
        }

        async fn upsert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate> {
            let saved = ExchangeRate {
                from_currency: rate.from_currency,
                to_currency: rate.to_currency,
                rate: rate.rate,
                updated_at: Utc::now().naive_utc(),
            };
            let mut rates = self.rates.lock().unwrap();
            rates.retain(|r| {
                !(r.from_currency == saved.from_currency && r.to_currency == saved.to_currency)
            });
            rates.push(saved.clone());
            Ok(saved)
        }
    }

    #[tokio::test]
    async fn set_rate_normalizes_codes_and_converts() {
        let service = FxService::new(Arc::new(MockFxRepository::default()));
        service
            .set_rate(NewExchangeRate {
                from_currency: "usd".to_string(),
                to_currency: "zar".to_string(),
                rate: dec!(18.25),
            })
            .await
            .unwrap();

        let converted = service.convert(dec!(2), "USD", "ZAR").unwrap();
        assert_eq!(converted.amount, dec!(36.50));
    }

    #[tokio::test]
    async fn set_rate_rejects_non_positive_rate() {
        let service = FxService::new(Arc::new(MockFxRepository::default()));
        let result = service
            .set_rate(NewExchangeRate {
                from_currency: "USD".to_string(),
                to_currency: "ZAR".to_string(),
                rate: dec!(0),
            })
            .await;
        assert!(result.is_err());
    }
}
