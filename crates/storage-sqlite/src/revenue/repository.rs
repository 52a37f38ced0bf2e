use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;

use vuka_core::constants::DEFAULT_CURRENCY;
use vuka_core::deals::DealStatus;
use vuka_core::revenue::{
    plan_distribution, ConnectionStatus, DistributionOutcome, NewRevenueConnection,
    NewRevenueReport, OAuthTokens, ReportSource, RevenueConnection, RevenueReport,
    RevenueRepositoryTrait, VerificationStatus,
};
use vuka_core::utils::money::round_money;
use vuka_core::wallets::ledger;
use vuka_core::{Error, Result};

use super::model::{RevenueConnectionDB, RevenueReportDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::deals::{load_deal_in_transaction, load_investments_in_transaction, save_deal_in_transaction};
use crate::errors::{IntoCore, OrNotFound};
use crate::schema::{investments, revenue_connections, revenue_reports};
use crate::utils::{decimal_text, new_id};
use crate::wallets::{
    get_or_create_wallet_in_transaction, insert_transaction_in_transaction,
    save_wallet_in_transaction,
};

fn load_report(conn: &mut SqliteConnection, report_id: &str) -> Result<RevenueReport> {
    let row = revenue_reports::table
        .find(report_id)
        .select(RevenueReportDB::as_select())
        .first::<RevenueReportDB>(conn)
        .or_not_found(|| format!("Revenue report {}", report_id))?;
    RevenueReport::try_from(row)
}

fn load_reports(rows: Vec<RevenueReportDB>) -> Result<Vec<RevenueReport>> {
    rows.into_iter().map(RevenueReport::try_from).collect()
}

fn ensure_connection_updated(updated: usize, connection_id: &str) -> Result<()> {
    if updated == 0 {
        return Err(Error::NotFound(format!(
            "Revenue connection {}",
            connection_id
        )));
    }
    Ok(())
}

pub struct RevenueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RevenueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl RevenueRepositoryTrait for RevenueRepository {
    async fn create_connection(
        &self,
        user_id: &str,
        connection: NewRevenueConnection,
    ) -> Result<RevenueConnection> {
        let now = Utc::now().naive_utc();
        let row = RevenueConnectionDB {
            id: new_id(),
            user_id: user_id.to_string(),
            provider: connection.provider.as_str().to_string(),
            external_account_id: connection.external_account_id,
            access_token: connection.access_token,
            refresh_token: connection.refresh_token,
            token_expires_at: connection.token_expires_at,
            status: ConnectionStatus::Active.as_str().to_string(),
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(revenue_connections::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                RevenueConnection::try_from(row)
            })
            .await
    }

    fn list_connections(&self, user_id: &str) -> Result<Vec<RevenueConnection>> {
        let mut conn = get_connection(&self.pool)?;
        revenue_connections::table
            .filter(revenue_connections::user_id.eq(user_id))
            .order(revenue_connections::created_at.desc())
            .select(RevenueConnectionDB::as_select())
            .load::<RevenueConnectionDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(RevenueConnection::try_from)
            .collect()
    }

    fn find_active_connection(&self, user_id: &str) -> Result<Option<RevenueConnection>> {
        let mut conn = get_connection(&self.pool)?;
        revenue_connections::table
            .filter(revenue_connections::user_id.eq(user_id))
            .filter(revenue_connections::status.eq(ConnectionStatus::Active.as_str()))
            .order(revenue_connections::created_at.desc())
            .select(RevenueConnectionDB::as_select())
            .first::<RevenueConnectionDB>(&mut conn)
            .optional()
            .into_core()?
            .map(RevenueConnection::try_from)
            .transpose()
    }

    async fn update_connection_tokens(
        &self,
        connection_id: &str,
        tokens: OAuthTokens,
        now: NaiveDateTime,
    ) -> Result<()> {
        let connection_id = connection_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(revenue_connections::table.find(&connection_id))
                    .set((
                        revenue_connections::access_token.eq(tokens.access_token),
                        revenue_connections::refresh_token.eq(tokens.refresh_token),
                        revenue_connections::token_expires_at.eq(tokens.expires_at),
                        revenue_connections::status.eq(ConnectionStatus::Active.as_str()),
                        revenue_connections::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;
                ensure_connection_updated(updated, &connection_id)
            })
            .await
    }

    async fn set_connection_status(
        &self,
        connection_id: &str,
        status: ConnectionStatus,
        now: NaiveDateTime,
    ) -> Result<()> {
        let connection_id = connection_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(revenue_connections::table.find(&connection_id))
                    .set((
                        revenue_connections::status.eq(status.as_str()),
                        revenue_connections::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;
                ensure_connection_updated(updated, &connection_id)
            })
            .await
    }

    async fn mark_connection_synced(
        &self,
        connection_id: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        let connection_id = connection_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(revenue_connections::table.find(&connection_id))
                    .set((
                        revenue_connections::last_synced_at.eq(Some(now)),
                        revenue_connections::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;
                ensure_connection_updated(updated, &connection_id)
            })
            .await
    }

    async fn create_report(
        &self,
        report: NewRevenueReport,
        source: ReportSource,
    ) -> Result<RevenueReport> {
        let now = Utc::now().naive_utc();
        let row = RevenueReportDB {
            id: new_id(),
            deal_id: report.deal_id,
            period: report.period,
            reported_revenue: decimal_text(round_money(report.reported_revenue)),
            verified_revenue: None,
            source: source.as_str().to_string(),
            verification_status: VerificationStatus::Unverified.as_str().to_string(),
            payout_amount: None,
            distributed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .exec(move |conn| {
                let existing = revenue_reports::table
                    .filter(revenue_reports::deal_id.eq(&row.deal_id))
                    .filter(revenue_reports::period.eq(&row.period))
                    .count()
                    .get_result::<i64>(conn)
                    .into_core()?;
                if existing > 0 {
                    return Err(Error::Conflict(format!(
                        "Revenue for {} has already been reported",
                        row.period
                    )));
                }
                diesel::insert_into(revenue_reports::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                RevenueReport::try_from(row)
            })
            .await
    }

    fn get_report(&self, report_id: &str) -> Result<RevenueReport> {
        let mut conn = get_connection(&self.pool)?;
        load_report(&mut conn, report_id)
    }

    fn list_reports_for_deal(&self, deal_id: &str) -> Result<Vec<RevenueReport>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = revenue_reports::table
            .filter(revenue_reports::deal_id.eq(deal_id))
            .order(revenue_reports::period.desc())
            .select(RevenueReportDB::as_select())
            .load::<RevenueReportDB>(&mut conn)
            .into_core()?;
        load_reports(rows)
    }

    fn list_unverified_reports(&self) -> Result<Vec<RevenueReport>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = revenue_reports::table
            .filter(
                revenue_reports::verification_status.eq(VerificationStatus::Unverified.as_str()),
            )
            .filter(revenue_reports::distributed_at.is_null())
            .order(revenue_reports::created_at.asc())
            .select(RevenueReportDB::as_select())
            .load::<RevenueReportDB>(&mut conn)
            .into_core()?;
        load_reports(rows)
    }

    async fn set_verification(
        &self,
        report_id: &str,
        verified_revenue: Decimal,
        status: VerificationStatus,
        now: NaiveDateTime,
    ) -> Result<RevenueReport> {
        let report_id = report_id.to_string();
        self.writer
            .exec(move |conn| {
                let report = load_report(conn, &report_id)?;
                if report.distributed_at.is_some() {
                    return Err(Error::Conflict(format!(
                        "Revenue for {} has already been distributed",
                        report.period
                    )));
                }
                diesel::update(revenue_reports::table.find(&report_id))
                    .set((
                        revenue_reports::verified_revenue
                            .eq(Some(decimal_text(round_money(verified_revenue)))),
                        revenue_reports::verification_status.eq(status.as_str()),
                        revenue_reports::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;
                load_report(conn, &report_id)
            })
            .await
    }

    async fn distribute(
        &self,
        report_id: &str,
        now: NaiveDateTime,
    ) -> Result<DistributionOutcome> {
        let report_id = report_id.to_string();
        self.writer
            .exec(move |conn| {
                let report = load_report(conn, &report_id)?;
                report.ensure_distributable()?;

                let mut deal = load_deal_in_transaction(conn, &report.deal_id)?;
                if deal.status != DealStatus::Funded {
                    return Err(Error::Conflict(format!(
                        "Deal '{}' is {} and cannot receive payouts",
                        deal.title, deal.status
                    )));
                }
                let investments = load_investments_in_transaction(conn, &deal.id)?;
                let plan = plan_distribution(&deal, &investments, report.payout_basis())?;

                let mut business =
                    get_or_create_wallet_in_transaction(conn, &deal.business_id, DEFAULT_CURRENCY, now)?;
                let payment = ledger::post_revenue_share_payment(
                    &mut business,
                    &deal.id,
                    &report.period,
                    plan.payout,
                    now,
                )?;
                save_wallet_in_transaction(conn, &mut business, now)?;
                insert_transaction_in_transaction(conn, payment)?;

                for allocation in plan.allocations.iter().filter(|a| !a.amount.is_zero()) {
                    let mut wallet = get_or_create_wallet_in_transaction(
                        conn,
                        &allocation.investor_id,
                        DEFAULT_CURRENCY,
                        now,
                    )?;
                    let credit = ledger::post_revenue_share(
                        &mut wallet,
                        &deal.id,
                        &report.period,
                        allocation.amount,
                        now,
                    )?;
                    save_wallet_in_transaction(conn, &mut wallet, now)?;
                    insert_transaction_in_transaction(conn, credit)?;

                    if let Some(investment) =
                        investments.iter().find(|i| i.id == allocation.investment_id)
                    {
                        let received = round_money(investment.total_received + allocation.amount);
                        diesel::update(investments::table.find(&investment.id))
                            .set(investments::total_received.eq(decimal_text(received)))
                            .execute(conn)
                            .into_core()?;
                    }
                }

                deal.total_repaid = round_money(deal.total_repaid + plan.payout);
                if plan.completes_deal {
                    deal.status = DealStatus::Completed;
                }
                deal.updated_at = now;
                save_deal_in_transaction(conn, &deal)?;

                diesel::update(revenue_reports::table.find(&report_id))
                    .set((
                        revenue_reports::payout_amount.eq(Some(decimal_text(plan.payout))),
                        revenue_reports::distributed_at.eq(Some(now)),
                        revenue_reports::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;

                Ok(DistributionOutcome {
                    report: load_report(conn, &report_id)?,
                    deal,
                    allocations: plan.allocations,
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::DealRepository;
    use crate::test_support::{active_deal, fund_wallet, now, test_db, DealFixture, TestDb};
    use crate::wallets::WalletRepository;
    use rust_decimal_macros::dec;
    use vuka_core::deals::DealRepositoryTrait;
    use vuka_core::wallets::WalletRepositoryTrait;

    /// A R10 000 deal funded 60/40, with `business_funds` available to the business.
    async fn funded_deal(db: &TestDb, business_funds: Decimal) -> DealFixture {
        let setup = active_deal(db, dec!(10000), 2, dec!(10000)).await;
        fund_wallet(db, &setup.business_id, business_funds);
        let deals = DealRepository::new(db.pool.clone(), db.writer.clone());
        deals
            .invest(&setup.deal.id, &setup.investor_ids[0], dec!(6000), now())
            .await
            .unwrap();
        deals
            .invest(&setup.deal.id, &setup.investor_ids[1], dec!(4000), now())
            .await
            .unwrap();
        setup
    }

    fn report(deal_id: &str, period: &str, revenue: Decimal) -> NewRevenueReport {
        NewRevenueReport {
            deal_id: deal_id.to_string(),
            period: period.to_string(),
            reported_revenue: revenue,
        }
    }

    #[tokio::test]
    async fn test_distribution_pays_investors_pro_rata() {
        let db = test_db();
        let setup = funded_deal(&db, dec!(20000)).await;
        let repo = RevenueRepository::new(db.pool.clone(), db.writer.clone());
        let wallets = WalletRepository::new(db.pool.clone(), db.writer.clone());

        let created = repo
            .create_report(report(&setup.deal.id, "2024-03", dec!(20000)), ReportSource::Manual)
            .await
            .unwrap();
        let outcome = repo.distribute(&created.id, now()).await.unwrap();

        assert_eq!(outcome.report.payout_amount, Some(dec!(2000.00)));
        assert!(outcome.report.distributed_at.is_some());
        assert_eq!(outcome.deal.total_repaid, dec!(2000.00));
        assert_eq!(outcome.deal.status, DealStatus::Funded);
        let amounts: Vec<Decimal> = outcome.allocations.iter().map(|a| a.amount).collect();
        assert_eq!(amounts, vec![dec!(1200.00), dec!(800.00)]);

        let business = wallets.find_by_user(&setup.business_id).unwrap().unwrap();
        assert_eq!(business.available_balance, dec!(18000.00));
        let investor = wallets.find_by_user(&setup.investor_ids[0]).unwrap().unwrap();
        assert_eq!(investor.available_balance, dec!(5200.00));

        let received = DealRepository::new(db.pool.clone(), db.writer.clone())
            .list_investments_for_investor(&setup.investor_ids[0])
            .unwrap()[0]
            .total_received;
        assert_eq!(received, dec!(1200.00));

        let again = repo.distribute(&created.id, now()).await;
        assert!(matches!(again, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_payout_capped_at_repayment_completes_deal() {
        let db = test_db();
        let setup = funded_deal(&db, dec!(20000)).await;
        let repo = RevenueRepository::new(db.pool.clone(), db.writer.clone());

        let first = repo
            .create_report(report(&setup.deal.id, "2024-03", dec!(20000)), ReportSource::Manual)
            .await
            .unwrap();
        repo.distribute(&first.id, now()).await.unwrap();

        let second = repo
            .create_report(report(&setup.deal.id, "2024-04", dec!(500000)), ReportSource::Manual)
            .await
            .unwrap();
        let outcome = repo.distribute(&second.id, now()).await.unwrap();

        assert_eq!(outcome.report.payout_amount, Some(dec!(13000.00)));
        assert_eq!(outcome.deal.total_repaid, dec!(15000.00));
        assert_eq!(outcome.deal.status, DealStatus::Completed);
    }

    #[tokio::test]
    async fn test_insufficient_business_funds_leaves_report_undistributed() {
        let db = test_db();
        let setup = funded_deal(&db, dec!(100)).await;
        let repo = RevenueRepository::new(db.pool.clone(), db.writer.clone());

        let created = repo
            .create_report(report(&setup.deal.id, "2024-03", dec!(20000)), ReportSource::Manual)
            .await
            .unwrap();
        assert!(repo.distribute(&created.id, now()).await.is_err());

        let stored = repo.get_report(&created.id).unwrap();
        assert!(stored.distributed_at.is_none());
        assert!(stored.payout_amount.is_none());
    }

    #[tokio::test]
    async fn test_period_reported_once_and_discrepancy_blocks_payout() {
        let db = test_db();
        let setup = funded_deal(&db, dec!(20000)).await;
        let repo = RevenueRepository::new(db.pool.clone(), db.writer.clone());

        let created = repo
            .create_report(report(&setup.deal.id, "2024-03", dec!(20000)), ReportSource::Manual)
            .await
            .unwrap();
        let duplicate = repo
            .create_report(report(&setup.deal.id, "2024-03", dec!(1)), ReportSource::Manual)
            .await;
        assert!(matches!(duplicate, Err(Error::Conflict(_))));

        assert_eq!(repo.list_unverified_reports().unwrap().len(), 1);
        let flagged = repo
            .set_verification(&created.id, dec!(12000), VerificationStatus::Discrepancy, now())
            .await
            .unwrap();
        assert_eq!(flagged.verified_revenue, Some(dec!(12000.00)));
        assert!(repo.list_unverified_reports().unwrap().is_empty());

        let blocked = repo.distribute(&created.id, now()).await;
        assert!(matches!(blocked, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn test_active_connection_is_latest_non_revoked() {
        let db = test_db();
        let user_id = crate::test_support::insert_user(&db, "BUSINESS");
        let repo = RevenueRepository::new(db.pool.clone(), db.writer.clone());

        let connection = |account: &str| NewRevenueConnection {
            provider: vuka_core::revenue::RevenueProvider::BankFeed,
            external_account_id: account.to_string(),
            access_token: "ciphertext".to_string(),
            refresh_token: None,
            token_expires_at: None,
        };
        let older = repo.create_connection(&user_id, connection("acc_1")).await.unwrap();
        let newer = repo.create_connection(&user_id, connection("acc_2")).await.unwrap();

        let active = repo.find_active_connection(&user_id).unwrap().unwrap();
        assert_eq!(active.id, newer.id);

        repo.set_connection_status(&newer.id, ConnectionStatus::Revoked, now())
            .await
            .unwrap();
        let active = repo.find_active_connection(&user_id).unwrap().unwrap();
        assert_eq!(active.id, older.id);
        assert_eq!(repo.list_connections(&user_id).unwrap().len(), 2);
    }
}
