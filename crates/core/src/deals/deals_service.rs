use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use super::deals_model::{Deal, DealStatus, Investment, InvestmentOutcome, InvestmentRequest, NewDeal};
use super::deals_traits::{DealRepositoryTrait, DealServiceTrait};
use crate::errors::{Error, Result};
use crate::users::{UserRepositoryTrait, UserRole};
use crate::utils::money::round_money;

pub struct DealService {
    repository: Arc<dyn DealRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
}

impl DealService {
    pub fn new(repository: Arc<dyn DealRepositoryTrait>, users: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { repository, users }
    }

    fn owned(&self, business_id: &str, deal_id: &str) -> Result<Deal> {
        let deal = self.repository.get_by_id(deal_id)?;
        if deal.business_id != business_id {
            return Err(Error::Forbidden(format!(
                "Deal {} belongs to another business",
                deal_id
            )));
        }
        Ok(deal)
    }
}

#[async_trait]
impl DealServiceTrait for DealService {
    async fn create_deal(&self, business_id: &str, mut new_deal: NewDeal) -> Result<Deal> {
        let business = self.users.get_by_id(business_id)?;
        if business.role != UserRole::Business {
            return Err(Error::Forbidden(
                "Only business accounts can raise funding".to_string(),
            ));
        }
        business.ensure_kyc_approved()?;
        new_deal.validate()?;
        new_deal.funding_goal = round_money(new_deal.funding_goal);
        new_deal.min_investment = round_money(new_deal.min_investment);

        let deal = self.repository.create(business_id, new_deal).await?;
        info!("Business {} created deal {}", business_id, deal.id);
        Ok(deal)
    }

    async fn publish_deal(&self, business_id: &str, deal_id: &str) -> Result<Deal> {
        let deal = self.owned(business_id, deal_id)?;
        if deal.status != DealStatus::Draft {
            return Err(Error::InvalidTransition {
                from: deal.status.to_string(),
                to: DealStatus::Active.to_string(),
            });
        }
        let published = self
            .repository
            .set_status(deal_id, DealStatus::Active, Utc::now().naive_utc())
            .await?;
        info!("Deal {} is now open for investment", deal_id);
        Ok(published)
    }

    async fn cancel_deal(&self, business_id: &str, deal_id: &str) -> Result<Deal> {
        let deal = self.owned(business_id, deal_id)?;
        if !matches!(deal.status, DealStatus::Draft | DealStatus::Active) {
            return Err(Error::InvalidTransition {
                from: deal.status.to_string(),
                to: DealStatus::Cancelled.to_string(),
            });
        }
        let cancelled = self
            .repository
            .cancel(deal_id, Utc::now().naive_utc())
            .await?;
        info!("Deal {} cancelled; investments refunded", deal_id);
        Ok(cancelled)
    }

    fn get_deal(&self, deal_id: &str) -> Result<Deal> {
        self.repository.get_by_id(deal_id)
    }

    fn list_deals(&self, status: Option<DealStatus>) -> Result<Vec<Deal>> {
        self.repository
            .list(Some(status.unwrap_or(DealStatus::Active)))
    }

    fn list_business_deals(&self, business_id: &str) -> Result<Vec<Deal>> {
        self.repository.list_for_business(business_id)
    }

    async fn invest(
        &self,
        investor_id: &str,
        deal_id: &str,
        request: InvestmentRequest,
    ) -> Result<InvestmentOutcome> {
        let investor = self.users.get_by_id(investor_id)?;
        if investor.role != UserRole::Investor {
            return Err(Error::Forbidden(
                "Only investor accounts can invest".to_string(),
            ));
        }
        investor.ensure_kyc_approved()?;

        let amount = round_money(request.amount);
        let now = Utc::now().naive_utc();
        // Fail fast; the repository checks again inside its transaction.
        self.repository
            .get_by_id(deal_id)?
            .validate_investment(amount, now)?;

        let outcome = self
            .repository
            .invest(deal_id, investor_id, amount, now)
            .await?;
        info!(
            "Investor {} invested {} in deal {}",
            investor_id, amount, deal_id
        );
        if outcome.deal.status == DealStatus::Funded {
            info!(
                "Deal {} reached its goal of {}",
                deal_id, outcome.deal.funding_goal
            );
        }
        Ok(outcome)
    }

    fn list_investments(&self, investor_id: &str) -> Result<Vec<Investment>> {
        self.repository.list_investments_for_investor(investor_id)
    }

    fn list_deal_investments(&self, business_id: &str, deal_id: &str) -> Result<Vec<Investment>> {
        self.owned(business_id, deal_id)?;
        self.repository.list_investments_for_deal(deal_id)
    }
}
