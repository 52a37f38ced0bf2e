use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::deals_model::{Deal, DealStatus, Investment, InvestmentOutcome, InvestmentRequest, NewDeal};
use crate::errors::Result;

/// Trait defining the contract for deal and investment persistence.
#[async_trait]
pub trait DealRepositoryTrait: Send + Sync {
    async fn create(&self, business_id: &str, new_deal: NewDeal) -> Result<Deal>;

    fn get_by_id(&self, deal_id: &str) -> Result<Deal>;

    fn list(&self, status: Option<DealStatus>) -> Result<Vec<Deal>>;

    fn list_for_business(&self, business_id: &str) -> Result<Vec<Deal>>;

    async fn set_status(&self, deal_id: &str, status: DealStatus, now: NaiveDateTime)
        -> Result<Deal>;

    /// Debits the investor, records the investment and, when the goal is
    /// reached, closes funding and credits the business. One transaction.
    async fn invest(
        &self,
        deal_id: &str,
        investor_id: &str,
        amount: Decimal,
        now: NaiveDateTime,
    ) -> Result<InvestmentOutcome>;

    /// Cancels an active deal and refunds every investor. One transaction.
    async fn cancel(&self, deal_id: &str, now: NaiveDateTime) -> Result<Deal>;

    fn list_investments_for_deal(&self, deal_id: &str) -> Result<Vec<Investment>>;

    fn list_investments_for_investor(&self, investor_id: &str) -> Result<Vec<Investment>>;
}

/// Trait defining the contract for deal service operations.
#[async_trait]
pub trait DealServiceTrait: Send + Sync {
    async fn create_deal(&self, business_id: &str, new_deal: NewDeal) -> Result<Deal>;

    async fn publish_deal(&self, business_id: &str, deal_id: &str) -> Result<Deal>;

    async fn cancel_deal(&self, business_id: &str, deal_id: &str) -> Result<Deal>;

    fn get_deal(&self, deal_id: &str) -> Result<Deal>;

    /// Marketplace listing; defaults to active deals.
    fn list_deals(&self, status: Option<DealStatus>) -> Result<Vec<Deal>>;

    fn list_business_deals(&self, business_id: &str) -> Result<Vec<Deal>>;

    async fn invest(
        &self,
        investor_id: &str,
        deal_id: &str,
        request: InvestmentRequest,
    ) -> Result<InvestmentOutcome>;

    fn list_investments(&self, investor_id: &str) -> Result<Vec<Investment>>;

    /// Investments in a deal, visible to its business.
    fn list_deal_investments(&self, business_id: &str, deal_id: &str) -> Result<Vec<Investment>>;
}
