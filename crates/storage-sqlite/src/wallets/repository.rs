use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use vuka_core::constants::DEFAULT_CURRENCY;
use vuka_core::wallets::{
    ledger, NewTransaction, ReleaseSummary, Transaction, TransactionStatus, TransactionType,
    Wallet, WalletRepositoryTrait,
};
use vuka_core::{Error, Result};

use super::model::{TransactionDB, WalletDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, OrNotFound};
use crate::schema::{transactions, wallets};
use crate::utils::new_id;

pub(crate) fn find_wallet_in_transaction(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<Wallet>> {
    wallets::table
        .filter(wallets::user_id.eq(user_id))
        .select(WalletDB::as_select())
        .first::<WalletDB>(conn)
        .optional()
        .into_core()?
        .map(Wallet::try_from)
        .transpose()
}

pub(crate) fn get_or_create_wallet_in_transaction(
    conn: &mut SqliteConnection,
    user_id: &str,
    currency: &str,
    now: NaiveDateTime,
) -> Result<Wallet> {
    if let Some(wallet) = find_wallet_in_transaction(conn, user_id)? {
        return Ok(wallet);
    }

    let wallet = Wallet::empty(new_id(), user_id.to_string(), currency.to_string(), now);
    diesel::insert_into(wallets::table)
        .values(WalletDB::from(&wallet))
        .execute(conn)
        .into_core()?;
    debug!("Created {} wallet for user {}", currency, user_id);
    Ok(wallet)
}

/// Persists the three balances. Refuses to write a wallet that breaks
/// `balance = available + locked` or has a negative part.
pub(crate) fn save_wallet_in_transaction(
    conn: &mut SqliteConnection,
    wallet: &mut Wallet,
    now: NaiveDateTime,
) -> Result<()> {
    if !wallet.is_consistent() {
        return Err(Error::Unexpected(format!(
            "wallet {} would become inconsistent (balance {}, available {}, locked {})",
            wallet.id, wallet.balance, wallet.available_balance, wallet.locked_balance
        )));
    }
    wallet.updated_at = now;
    let row = WalletDB::from(&*wallet);
    diesel::update(wallets::table.find(&wallet.id))
        .set((
            wallets::balance.eq(&row.balance),
            wallets::available_balance.eq(&row.available_balance),
            wallets::locked_balance.eq(&row.locked_balance),
            wallets::updated_at.eq(row.updated_at),
        ))
        .execute(conn)
        .into_core()?;
    Ok(())
}

pub(crate) fn insert_transaction_in_transaction(
    conn: &mut SqliteConnection,
    tx: NewTransaction,
) -> Result<Transaction> {
    let id = new_id();
    let row = TransactionDB::from_new(id.clone(), &tx)?;
    diesel::insert_into(transactions::table)
        .values(&row)
        .execute(conn)
        .into_core()?;
    Ok(tx.into_transaction(id))
}

fn load_transaction(conn: &mut SqliteConnection, transaction_id: &str) -> Result<Transaction> {
    let row = transactions::table
        .find(transaction_id)
        .select(TransactionDB::as_select())
        .first::<TransactionDB>(conn)
        .or_not_found(|| format!("Transaction {}", transaction_id))?;
    Transaction::try_from(row)
}

fn load_transactions(rows: Vec<TransactionDB>) -> Result<Vec<Transaction>> {
    rows.into_iter().map(Transaction::try_from).collect()
}

pub struct WalletRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl WalletRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl WalletRepositoryTrait for WalletRepository {
    async fn get_or_create(&self, user_id: &str, currency: &str) -> Result<Wallet> {
        if let Some(wallet) = self.find_by_user(user_id)? {
            return Ok(wallet);
        }
        let user_id = user_id.to_string();
        let currency = currency.to_string();
        self.writer
            .exec(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                get_or_create_wallet_in_transaction(conn, &user_id, &currency, now)
            })
            .await
    }

    fn find_by_user(&self, user_id: &str) -> Result<Option<Wallet>> {
        let mut conn = get_connection(&self.pool)?;
        find_wallet_in_transaction(&mut conn, user_id)
    }

    fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .order((transactions::created_at.desc(), transactions::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        load_transactions(rows)
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let mut conn = get_connection(&self.pool)?;
        load_transaction(&mut conn, transaction_id)
    }

    fn list_transactions_by_status(&self, status: TransactionStatus) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::status.eq(status.as_str()))
            .order(transactions::created_at.desc())
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        load_transactions(rows)
    }

    async fn withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
        fee: Decimal,
        bank_account_reference: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Transaction> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut wallet =
                    get_or_create_wallet_in_transaction(conn, &user_id, DEFAULT_CURRENCY, now)?;
                let entry = ledger::post_withdrawal(
                    &mut wallet,
                    amount,
                    fee,
                    bank_account_reference.as_deref(),
                    now,
                )?;
                save_wallet_in_transaction(conn, &mut wallet, now)?;
                insert_transaction_in_transaction(conn, entry)
            })
            .await
    }

    async fn release_matured(&self, now: NaiveDateTime) -> Result<ReleaseSummary> {
        self.writer
            .exec(move |conn| {
                let matured = transactions::table
                    .filter(transactions::released.eq(false))
                    .filter(transactions::status.eq(TransactionStatus::Completed.as_str()))
                    .filter(transactions::transaction_type.eq_any([
                        TransactionType::Deposit.as_str(),
                        TransactionType::DealFunding.as_str(),
                    ]))
                    .filter(transactions::locked_until.le(now))
                    .order(transactions::created_at.asc())
                    .select(TransactionDB::as_select())
                    .load::<TransactionDB>(conn)
                    .into_core()?;

                let mut by_wallet: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
                for row in matured {
                    let tx = Transaction::try_from(row)?;
                    by_wallet.entry(tx.wallet_id.clone()).or_default().push(tx);
                }

                let mut summary = ReleaseSummary::default();
                for (wallet_id, entries) in by_wallet {
                    let row = wallets::table
                        .find(&wallet_id)
                        .select(WalletDB::as_select())
                        .first::<WalletDB>(conn)
                        .into_core()?;
                    let mut wallet = Wallet::try_from(row)?;

                    let mut ids = Vec::with_capacity(entries.len());
                    for entry in entries {
                        summary.amount_released += wallet.release(entry.net_amount);
                        ids.push(entry.id);
                    }
                    save_wallet_in_transaction(conn, &mut wallet, now)?;

                    summary.transactions_released += diesel::update(
                        transactions::table.filter(transactions::id.eq_any(&ids)),
                    )
                    .set(transactions::released.eq(true))
                    .execute(conn)
                    .into_core()?;
                    summary.wallets_updated += 1;
                }
                Ok(summary)
            })
            .await
    }

    async fn mark_reviewed(
        &self,
        transaction_id: &str,
        note: Option<String>,
    ) -> Result<Transaction> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn| {
                let tx = load_transaction(conn, &transaction_id)?;
                if tx.status != TransactionStatus::Flagged {
                    return Err(Error::Conflict(format!(
                        "Transaction {} is {} and not awaiting review",
                        transaction_id, tx.status
                    )));
                }

                let mut metadata = tx.metadata.clone().unwrap_or_else(|| json!({}));
                if let (Some(note), Some(fields)) = (note, metadata.as_object_mut()) {
                    fields.insert("reviewNote".to_string(), json!(note));
                }
                diesel::update(transactions::table.find(&transaction_id))
                    .set((
                        transactions::status.eq(TransactionStatus::Reviewed.as_str()),
                        transactions::metadata.eq(serde_json::to_string(&metadata)?),
                    ))
                    .execute(conn)
                    .into_core()?;
                load_transaction(conn, &transaction_id)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoices::InvoiceRepository;
    use crate::payments::PaymentRepository;
    use crate::test_support::{create_invoice, fund_wallet, insert_user, now, test_db};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use vuka_core::invoices::{
        InvoiceRepositoryTrait, InvoiceStatus, TransitionMode, TransitionRequest,
    };
    use vuka_core::payments::{Gateway, PaymentNotice, PaymentRepositoryTrait};

    #[tokio::test]
    async fn test_withdrawal_debits_amount_and_fee() {
        let db = test_db();
        let user_id = insert_user(&db, "INVESTOR");
        fund_wallet(&db, &user_id, dec!(500));
        let repo = WalletRepository::new(db.pool.clone(), db.writer.clone());

        let tx = repo
            .withdraw(&user_id, dec!(200), dec!(5), Some("FNB ****1234".to_string()), now())
            .await
            .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Withdrawal);

        let wallet = repo.find_by_user(&user_id).unwrap().unwrap();
        assert_eq!(wallet.available_balance, dec!(295));
        assert!(wallet.is_consistent());

        let too_much = repo.withdraw(&user_id, dec!(295), dec!(5), None, now()).await;
        assert!(too_much.is_err());
        assert_eq!(repo.list_transactions(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_release_moves_matured_deposits_to_available() {
        let db = test_db();
        let user_id = insert_user(&db, "BUSINESS");
        let invoice = create_invoice(&db, &user_id, "ZAR", dec!(100)).await;
        InvoiceRepository::new(db.pool.clone(), db.writer.clone())
            .apply_transition(TransitionRequest::new(
                &invoice.id,
                InvoiceStatus::Paid,
                TransitionMode::Standard,
            ))
            .await
            .unwrap();
        let repo = WalletRepository::new(db.pool.clone(), db.writer.clone());

        let early = repo.release_matured(now()).await.unwrap();
        assert_eq!(early.transactions_released, 0);

        let later = repo.release_matured(now() + Duration::days(8)).await.unwrap();
        assert_eq!(later.transactions_released, 1);
        assert_eq!(later.amount_released, dec!(115.00));

        let wallet = repo.find_by_user(&user_id).unwrap().unwrap();
        assert_eq!(wallet.available_balance, dec!(115.00));
        assert_eq!(wallet.locked_balance, dec!(0));

        let again = repo.release_matured(now() + Duration::days(9)).await.unwrap();
        assert_eq!(again.transactions_released, 0);
    }

    #[tokio::test]
    async fn test_only_flagged_entries_can_be_reviewed() {
        let db = test_db();
        let user_id = insert_user(&db, "BUSINESS");
        let invoice = create_invoice(&db, &user_id, "ZAR", dec!(100)).await;
        let payments = PaymentRepository::new(db.pool.clone(), db.writer.clone());
        let notice = |reference: &str| PaymentNotice {
            gateway: Gateway::Yoco,
            gateway_reference: reference.to_string(),
            gateway_checkout_id: None,
            invoice_id: Some(invoice.id.clone()),
            amount: dec!(115),
            fee: dec!(0),
            currency: "ZAR".to_string(),
            failure_reason: None,
        };
        payments.record_success(notice("p1"), now()).await.unwrap();
        payments.record_success(notice("p2"), now()).await.unwrap();

        let repo = WalletRepository::new(db.pool.clone(), db.writer.clone());
        let flagged = repo
            .list_transactions_by_status(TransactionStatus::Flagged)
            .unwrap();
        assert_eq!(flagged.len(), 1);

        let reviewed = repo
            .mark_reviewed(&flagged[0].id, Some("Refunded by EFT".to_string()))
            .await
            .unwrap();
        assert_eq!(reviewed.status, TransactionStatus::Reviewed);
        assert_eq!(
            reviewed.metadata.as_ref().and_then(|m| m.get("reviewNote")),
            Some(&json!("Refunded by EFT"))
        );

        let again = repo.mark_reviewed(&flagged[0].id, None).await;
        assert!(matches!(again, Err(Error::Conflict(_))));
    }
}
