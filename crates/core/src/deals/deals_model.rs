use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constants::PLATFORM_FEE_PERCENT;
use crate::errors::{Error, Result};
use crate::revenue::compute_share_percentages;
use crate::utils::money::{percent_of, round_money};
use crate::wallets::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStatus {
    Draft,
    Active,
    Funded,
    Completed,
    Cancelled,
}

crate::text_enum!(DealStatus {
    Draft => "DRAFT",
    Active => "ACTIVE",
    Funded => "FUNDED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub description: String,
    pub funding_goal: Decimal,
    pub current_funding: Decimal,
    pub min_investment: Decimal,
    /// Percent of monthly revenue paid to investors.
    pub revenue_share_percentage: Decimal,
    pub repayment_multiple: Decimal,
    pub total_repaid: Decimal,
    pub status: DealStatus,
    pub funded_at: Option<NaiveDateTime>,
    pub closes_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Deal {
    pub fn remaining_goal(&self) -> Decimal {
        (self.funding_goal - self.current_funding).max(Decimal::ZERO)
    }

    /// Total investors receive before the deal completes.
    pub fn repayment_cap(&self) -> Decimal {
        round_money(self.funding_goal * self.repayment_multiple)
    }

    pub fn remaining_repayment(&self) -> Decimal {
        (self.repayment_cap() - self.total_repaid).max(Decimal::ZERO)
    }

    pub fn is_fully_funded(&self) -> bool {
        self.current_funding >= self.funding_goal
    }

    /// Checks an investment against the deal's state and limits.
    pub fn validate_investment(&self, amount: Decimal, now: NaiveDateTime) -> Result<()> {
        if self.status != DealStatus::Active {
            return Err(Error::Conflict(format!(
                "Deal '{}' is {} and not accepting investments",
                self.title, self.status
            )));
        }
        if self.closes_at.is_some_and(|closes| closes <= now) {
            return Err(Error::Conflict(format!("Deal '{}' has closed", self.title)));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::invalid_input("Investment amount must be positive"));
        }
        let remaining = self.remaining_goal();
        if amount > remaining {
            return Err(Error::invalid_input(format!(
                "Investment exceeds the remaining goal of {}",
                remaining
            )));
        }
        // The last investor may fill a remainder smaller than the minimum.
        if amount < self.min_investment && amount != remaining {
            return Err(Error::invalid_input(format!(
                "Minimum investment is {}",
                self.min_investment
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: String,
    pub description: String,
    pub funding_goal: Decimal,
    pub min_investment: Decimal,
    pub revenue_share_percentage: Decimal,
    pub repayment_multiple: Decimal,
    pub closes_at: Option<NaiveDateTime>,
}

impl NewDeal {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_input("Deal title cannot be empty"));
        }
        if self.funding_goal <= Decimal::ZERO {
            return Err(Error::invalid_input("Funding goal must be positive"));
        }
        if self.revenue_share_percentage <= Decimal::ZERO
            || self.revenue_share_percentage > dec!(100)
        {
            return Err(Error::invalid_input(
                "Revenue share must be above 0 and at most 100 percent",
            ));
        }
        if self.repayment_multiple < Decimal::ONE {
            return Err(Error::invalid_input(
                "Repayment multiple must be at least 1",
            ));
        }
        if self.min_investment <= Decimal::ZERO || self.min_investment > self.funding_goal {
            return Err(Error::invalid_input(
                "Minimum investment must be positive and no more than the goal",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    pub deal_id: String,
    pub investor_id: String,
    pub amount: Decimal,
    /// Percent of each payout; set when the deal is fully funded.
    pub share_percentage: Decimal,
    pub total_received: Decimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct InvestmentOutcome {
    pub investment: Investment,
    pub deal: Deal,
    pub transaction: Transaction,
}

/// Figures written when a deal reaches its goal.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingClose {
    /// `(investment_id, share_percentage)`.
    pub shares: Vec<(String, Decimal)>,
    pub raised: Decimal,
    pub platform_fee: Decimal,
}

impl FundingClose {
    pub fn compute(investments: &[Investment]) -> Self {
        let raised: Decimal = investments.iter().map(|i| i.amount).sum();
        let amounts: Vec<(String, Decimal)> = investments
            .iter()
            .map(|i| (i.id.clone(), i.amount))
            .collect();
        Self {
            shares: compute_share_percentages(&amounts),
            raised,
            platform_fee: percent_of(raised, PLATFORM_FEE_PERCENT),
        }
    }
}
