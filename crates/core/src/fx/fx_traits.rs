use async_trait::async_trait;
use rust_decimal::Decimal;

use super::fx_model::{ConvertedAmount, ExchangeRate, NewExchangeRate};
use crate::errors::Result;

/// Trait defining the contract for FX repository operations.
#[async_trait]
pub trait FxRepositoryTrait: Send + Sync {
    fn list_rates(&self) -> Result<Vec<ExchangeRate>>;

    /// Inserts or replaces the rate for the pair.
    async fn upsert_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate>;
}

/// Trait defining the contract for FX service operations.
#[async_trait]
pub trait FxServiceTrait: Send + Sync {
    fn list_rates(&self) -> Result<Vec<ExchangeRate>>;

    fn convert(&self, amount: Decimal, from_currency: &str, to_currency: &str)
        -> Result<ConvertedAmount>;

    async fn set_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate>;
}
