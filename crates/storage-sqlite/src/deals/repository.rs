use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

use vuka_core::constants::DEFAULT_CURRENCY;
use vuka_core::deals::{
    Deal, DealRepositoryTrait, DealStatus, FundingClose, Investment, InvestmentOutcome, NewDeal,
};
use vuka_core::utils::money::round_money;
use vuka_core::wallets::ledger;
use vuka_core::{Error, Result};

use super::model::{DealDB, InvestmentDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, OrNotFound};
use crate::schema::{deals, investments};
use crate::utils::{decimal_text, new_id};
use crate::wallets::{
    get_or_create_wallet_in_transaction, insert_transaction_in_transaction,
    save_wallet_in_transaction,
};

pub(crate) fn load_deal_in_transaction(conn: &mut SqliteConnection, deal_id: &str) -> Result<Deal> {
    let row = deals::table
        .find(deal_id)
        .select(DealDB::as_select())
        .first::<DealDB>(conn)
        .or_not_found(|| format!("Deal {}", deal_id))?;
    Deal::try_from(row)
}

pub(crate) fn save_deal_in_transaction(conn: &mut SqliteConnection, deal: &Deal) -> Result<()> {
    let row = DealDB::from(deal);
    diesel::update(deals::table.find(&deal.id))
        .set((
            deals::current_funding.eq(row.current_funding),
            deals::total_repaid.eq(row.total_repaid),
            deals::status.eq(row.status),
            deals::funded_at.eq(row.funded_at),
            deals::updated_at.eq(row.updated_at),
        ))
        .execute(conn)
        .into_core()?;
    Ok(())
}

/// Investments in the order they were made.
pub(crate) fn load_investments_in_transaction(
    conn: &mut SqliteConnection,
    deal_id: &str,
) -> Result<Vec<Investment>> {
    investments::table
        .filter(investments::deal_id.eq(deal_id))
        .order((investments::created_at.asc(), investments::id.asc()))
        .select(InvestmentDB::as_select())
        .load::<InvestmentDB>(conn)
        .into_core()?
        .into_iter()
        .map(Investment::try_from)
        .collect()
}

/// Marks the deal funded, fixes every investor's share and pays the business.
fn close_funding(conn: &mut SqliteConnection, deal: &mut Deal, now: NaiveDateTime) -> Result<()> {
    let investments = load_investments_in_transaction(conn, &deal.id)?;
    let close = FundingClose::compute(&investments);

    for (investment_id, share) in &close.shares {
        diesel::update(investments::table.find(investment_id))
            .set(investments::share_percentage.eq(decimal_text(*share)))
            .execute(conn)
            .into_core()?;
    }

    let mut wallet =
        get_or_create_wallet_in_transaction(conn, &deal.business_id, DEFAULT_CURRENCY, now)?;
    let entry = ledger::post_deal_funding(
        &mut wallet,
        &deal.id,
        &deal.title,
        close.raised,
        close.platform_fee,
        now,
    )?;
    save_wallet_in_transaction(conn, &mut wallet, now)?;
    insert_transaction_in_transaction(conn, entry)?;

    deal.status = DealStatus::Funded;
    deal.funded_at = Some(now);
    info!(
        "Deal '{}' funded: {} raised from {} investors, platform fee {}",
        deal.title,
        close.raised,
        investments.len(),
        close.platform_fee
    );
    Ok(())
}

pub struct DealRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl DealRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_deals(
        &self,
        query: deals::BoxedQuery<'_, diesel::sqlite::Sqlite>,
    ) -> Result<Vec<Deal>> {
        let mut conn = get_connection(&self.pool)?;
        query
            .order(deals::created_at.desc())
            .select(DealDB::as_select())
            .load::<DealDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Deal::try_from)
            .collect()
    }
}

#[async_trait]
impl DealRepositoryTrait for DealRepository {
    async fn create(&self, business_id: &str, new_deal: NewDeal) -> Result<Deal> {
        let now = Utc::now().naive_utc();
        let deal = Deal {
            id: new_id(),
            business_id: business_id.to_string(),
            title: new_deal.title.trim().to_string(),
            description: new_deal.description,
            funding_goal: round_money(new_deal.funding_goal),
            current_funding: Decimal::ZERO,
            min_investment: round_money(new_deal.min_investment),
            revenue_share_percentage: new_deal.revenue_share_percentage,
            repayment_multiple: new_deal.repayment_multiple,
            total_repaid: Decimal::ZERO,
            status: DealStatus::Draft,
            funded_at: None,
            closes_at: new_deal.closes_at,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(deals::table)
                    .values(DealDB::from(&deal))
                    .execute(conn)
                    .into_core()?;
                Ok(deal)
            })
            .await
    }

    fn get_by_id(&self, deal_id: &str) -> Result<Deal> {
        let mut conn = get_connection(&self.pool)?;
        load_deal_in_transaction(&mut conn, deal_id)
    }

    fn list(&self, status: Option<DealStatus>) -> Result<Vec<Deal>> {
        let mut query = deals::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(deals::status.eq(status.as_str()));
        }
        self.load_deals(query)
    }

    fn list_for_business(&self, business_id: &str) -> Result<Vec<Deal>> {
        self.load_deals(
            deals::table
                .filter(deals::business_id.eq(business_id.to_string()))
                .into_boxed(),
        )
    }

    async fn set_status(
        &self,
        deal_id: &str,
        status: DealStatus,
        now: NaiveDateTime,
    ) -> Result<Deal> {
        let deal_id = deal_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut deal = load_deal_in_transaction(conn, &deal_id)?;
                deal.status = status;
                deal.updated_at = now;
                save_deal_in_transaction(conn, &deal)?;
                Ok(deal)
            })
            .await
    }

    async fn invest(
        &self,
        deal_id: &str,
        investor_id: &str,
        amount: Decimal,
        now: NaiveDateTime,
    ) -> Result<InvestmentOutcome> {
        let deal_id = deal_id.to_string();
        let investor_id = investor_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut deal = load_deal_in_transaction(conn, &deal_id)?;
                let amount = round_money(amount);
                // Re-checked here: another investor may have filled the deal
                // since the service validated the request.
                deal.validate_investment(amount, now)?;

                let mut wallet =
                    get_or_create_wallet_in_transaction(conn, &investor_id, DEFAULT_CURRENCY, now)?;
                let entry = ledger::post_investment(&mut wallet, &deal.id, &deal.title, amount, now)?;
                save_wallet_in_transaction(conn, &mut wallet, now)?;
                let transaction = insert_transaction_in_transaction(conn, entry)?;

                let investment_id = new_id();
                diesel::insert_into(investments::table)
                    .values(InvestmentDB::from(&Investment {
                        id: investment_id.clone(),
                        deal_id: deal.id.clone(),
                        investor_id: investor_id.clone(),
                        amount,
                        share_percentage: Decimal::ZERO,
                        total_received: Decimal::ZERO,
                        created_at: now,
                    }))
                    .execute(conn)
                    .into_core()?;

                deal.current_funding = round_money(deal.current_funding + amount);
                deal.updated_at = now;
                if deal.is_fully_funded() {
                    close_funding(conn, &mut deal, now)?;
                }
                save_deal_in_transaction(conn, &deal)?;

                let investment = investments::table
                    .find(&investment_id)
                    .select(InvestmentDB::as_select())
                    .first::<InvestmentDB>(conn)
                    .into_core()
                    .and_then(Investment::try_from)?;

                Ok(InvestmentOutcome {
                    investment,
                    deal,
                    transaction,
                })
            })
            .await
    }

    async fn cancel(&self, deal_id: &str, now: NaiveDateTime) -> Result<Deal> {
        let deal_id = deal_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut deal = load_deal_in_transaction(conn, &deal_id)?;
                if !matches!(deal.status, DealStatus::Draft | DealStatus::Active) {
                    return Err(Error::Conflict(format!(
                        "Deal '{}' is {} and can no longer be cancelled",
                        deal.title, deal.status
                    )));
                }

                let investments = load_investments_in_transaction(conn, &deal.id)?;
                for investment in &investments {
                    let mut wallet = get_or_create_wallet_in_transaction(
                        conn,
                        &investment.investor_id,
                        DEFAULT_CURRENCY,
                        now,
                    )?;
                    let entry = ledger::post_investment_refund(
                        &mut wallet,
                        &deal.id,
                        &deal.title,
                        investment.amount,
                        now,
                    )?;
                    save_wallet_in_transaction(conn, &mut wallet, now)?;
                    insert_transaction_in_transaction(conn, entry)?;
                }

                deal.status = DealStatus::Cancelled;
                deal.updated_at = now;
                save_deal_in_transaction(conn, &deal)?;
                info!(
                    "Deal '{}' cancelled, {} investments refunded",
                    deal.title,
                    investments.len()
                );
                Ok(deal)
            })
            .await
    }

    fn list_investments_for_deal(&self, deal_id: &str) -> Result<Vec<Investment>> {
        let mut conn = get_connection(&self.pool)?;
        load_investments_in_transaction(&mut conn, deal_id)
    }

    fn list_investments_for_investor(&self, investor_id: &str) -> Result<Vec<Investment>> {
        let mut conn = get_connection(&self.pool)?;
        investments::table
            .filter(investments::investor_id.eq(investor_id))
            .order(investments::created_at.desc())
            .select(InvestmentDB::as_select())
            .load::<InvestmentDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Investment::try_from)
            .collect()
    }
}
