//! Database models for deals and investments.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::deals::{Deal, Investment};
use vuka_core::{Error, Result};

use crate::utils::{decimal_text, parse_decimal, parse_text};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::deals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DealDB {
    pub id: String,
    pub business_id: String,
    pub title: String,
    pub description: String,
    pub funding_goal: String,
    pub current_funding: String,
    pub min_investment: String,
    pub revenue_share_percentage: String,
    pub repayment_multiple: String,
    pub total_repaid: String,
    pub status: String,
    pub funded_at: Option<NaiveDateTime>,
    pub closes_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<DealDB> for Deal {
    type Error = Error;

    fn try_from(db: DealDB) -> Result<Self> {
        Ok(Self {
            funding_goal: parse_decimal(&db.funding_goal, "deals.funding_goal")?,
            current_funding: parse_decimal(&db.current_funding, "deals.current_funding")?,
            min_investment: parse_decimal(&db.min_investment, "deals.min_investment")?,
            revenue_share_percentage: parse_decimal(
                &db.revenue_share_percentage,
                "deals.revenue_share_percentage",
            )?,
            repayment_multiple: parse_decimal(&db.repayment_multiple, "deals.repayment_multiple")?,
            total_repaid: parse_decimal(&db.total_repaid, "deals.total_repaid")?,
            status: parse_text(&db.status, "deals.status")?,
            id: db.id,
            business_id: db.business_id,
            title: db.title,
            description: db.description,
            funded_at: db.funded_at,
            closes_at: db.closes_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<&Deal> for DealDB {
    fn from(deal: &Deal) -> Self {
        Self {
            id: deal.id.clone(),
            business_id: deal.business_id.clone(),
            title: deal.title.clone(),
            description: deal.description.clone(),
            funding_goal: decimal_text(deal.funding_goal),
            current_funding: decimal_text(deal.current_funding),
            min_investment: decimal_text(deal.min_investment),
            revenue_share_percentage: decimal_text(deal.revenue_share_percentage),
            repayment_multiple: decimal_text(deal.repayment_multiple),
            total_repaid: decimal_text(deal.total_repaid),
            status: deal.status.as_str().to_string(),
            funded_at: deal.funded_at,
            closes_at: deal.closes_at,
            created_at: deal.created_at,
            updated_at: deal.updated_at,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::investments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InvestmentDB {
    pub id: String,
    pub deal_id: String,
    pub investor_id: String,
    pub amount: String,
    pub share_percentage: String,
    pub total_received: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<InvestmentDB> for Investment {
    type Error = Error;

    fn try_from(db: InvestmentDB) -> Result<Self> {
        Ok(Self {
            amount: parse_decimal(&db.amount, "investments.amount")?,
            share_percentage: parse_decimal(&db.share_percentage, "investments.share_percentage")?,
            total_received: parse_decimal(&db.total_received, "investments.total_received")?,
            id: db.id,
            deal_id: db.deal_id,
            investor_id: db.investor_id,
            created_at: db.created_at,
        })
    }
}

impl From<&Investment> for InvestmentDB {
    fn from(investment: &Investment) -> Self {
        Self {
            id: investment.id.clone(),
            deal_id: investment.deal_id.clone(),
            investor_id: investment.investor_id.clone(),
            amount: decimal_text(investment.amount),
            share_percentage: decimal_text(investment.share_percentage),
            total_received: decimal_text(investment.total_received),
            created_at: investment.created_at,
        }
    }
}
