use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use log::{debug, info};
use std::sync::Arc;

use super::wallets_model::{
    ReleaseSummary, Transaction, TransactionStatus, Wallet, WithdrawalRequest,
};
use super::wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
use crate::constants::{DEFAULT_CURRENCY, WITHDRAWAL_FEE};
use crate::errors::{Error, Result};
use crate::users::UserRepositoryTrait;
use crate::utils::money::{ensure_positive, round_money};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Service for wallet balances, withdrawals and the locked-funds release.
pub struct WalletService {
    repository: Arc<dyn WalletRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
}

impl WalletService {
    pub fn new(
        repository: Arc<dyn WalletRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
    ) -> Self {
        Self { repository, users }
    }
}

#[async_trait]
impl WalletServiceTrait for WalletService {
    async fn get_wallet(&self, user_id: &str) -> Result<Wallet> {
        self.repository
            .get_or_create(user_id, DEFAULT_CURRENCY)
            .await
    }

    fn list_transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Transaction>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.repository.list_transactions(user_id, limit, offset)
    }

    async fn withdraw(&self, user_id: &str, request: WithdrawalRequest) -> Result<Transaction> {
        let user = self.users.get_by_id(user_id)?;
        user.ensure_kyc_approved()?;

        ensure_positive(request.amount, "amount")?;
        let amount = round_money(request.amount);
        // Make sure the wallet exists so the repository reports a balance error
        // rather than a missing row.
        self.repository
            .get_or_create(user_id, DEFAULT_CURRENCY)
            .await?;

        let tx = self
            .repository
            .withdraw(
                user_id,
                amount,
                WITHDRAWAL_FEE,
                request.bank_account_reference,
                Utc::now().naive_utc(),
            )
            .await?;
        info!("Withdrawal {} of {} for user {}", tx.id, amount, user_id);
        Ok(tx)
    }

    async fn release_matured_funds(&self, now: NaiveDateTime) -> Result<ReleaseSummary> {
        let summary = self.repository.release_matured(now).await?;
        if summary.transactions_released > 0 {
            info!(
                "Released {} from {} transactions across {} wallets",
                summary.amount_released, summary.transactions_released, summary.wallets_updated
            );
        } else {
            debug!("No matured funds to release");
        }
        Ok(summary)
    }

    fn list_flagged(&self) -> Result<Vec<Transaction>> {
        self.repository
            .list_transactions_by_status(TransactionStatus::Flagged)
    }

    async fn review_flagged(
        &self,
        transaction_id: &str,
        note: Option<String>,
    ) -> Result<Transaction> {
        let tx = self.repository.get_transaction(transaction_id)?;
        if tx.status != TransactionStatus::Flagged {
            return Err(Error::Conflict(format!(
                "Transaction {} is {} and cannot be reviewed",
                tx.id, tx.status
            )));
        }
        self.repository.mark_reviewed(transaction_id, note).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user, MockUserRepository};
    use crate::users::{KycStatus, UserRole};
    use crate::wallets::ledger;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockWalletRepository {
        wallets: Mutex<Vec<Wallet>>,
        transactions: Mutex<Vec<Transaction>>,
    }

    #[async_trait]
    impl WalletRepositoryTrait for MockWalletRepository {
        async fn get_or_create(&self, user_id: &str, currency: &str) -> Result<Wallet> {
            let mut wallets = self.wallets.lock().unwrap();
            if let Some(w) = wallets.iter().find(|w| w.user_id == user_id) {
                return Ok(w.clone());
            }
            let w = Wallet::empty(
                format!("w-{}", user_id),
                user_id.to_string(),
                currency.to_string(),
                Utc::now().naive_utc(),
            );
            wallets.push(w.clone());
            Ok(w)
        }

        fn find_by_user(&self, user_id: &str) -> Result<Option<Wallet>> {
            Ok(self
                .wallets
                .lock()
                .unwrap()
                .iter()
                .find(|w| w.user_id == user_id)
                .cloned())
        }

        fn list_transactions(
            &self,
            user_id: &str,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<Transaction>> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|t| t.user_id == user_id)
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
            self.transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == transaction_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("Transaction {}", transaction_id)))
        }

        fn list_transactions_by_status(
            &self,
            status: TransactionStatus,
        ) -> Result<Vec<Transaction>> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.status == status)
                .cloned()
                .collect())
        }

        async fn withdraw(
            &self,
            user_id: &str,
            amount: Decimal,
            fee: Decimal,
            bank_account_reference: Option<String>,
            now: NaiveDateTime,
        ) -> Result<Transaction> {
            let mut wallets = self.wallets.lock().unwrap();
            let wallet = wallets
                .iter_mut()
                .find(|w| w.user_id == user_id)
                .ok_or_else(|| Error::NotFound("Wallet".to_string()))?;
            let mut updated = wallet.clone();
            let new_tx = ledger::post_withdrawal(
                &mut updated,
                amount,
                fee,
                bank_account_reference.as_deref(),
                now,
            )?;
            *wallet = updated;
            let mut txs = self.transactions.lock().unwrap();
            let tx = new_tx.into_transaction(format!("tx-{}", txs.len() + 1));
            txs.push(tx.clone());
            Ok(tx)
        }

        async fn release_matured(&self, _now: NaiveDateTime) -> Result<ReleaseSummary> {
            Ok(ReleaseSummary::default())
        }

        async fn mark_reviewed(
            &self,
            transaction_id: &str,
            _note: Option<String>,
        ) -> Result<Transaction> {
            let mut txs = self.transactions.lock().unwrap();
            let tx = txs
                .iter_mut()
                .find(|t| t.id == transaction_id)
                .ok_or_else(|| Error::NotFound("Transaction".to_string()))?;
            tx.status = TransactionStatus::Reviewed;
            Ok(tx.clone())
        }
    }

    fn service_with(kyc: KycStatus, available: Decimal) -> (WalletService, Arc<MockWalletRepository>) {
        let users = Arc::new(MockUserRepository::with_users(vec![user(
            "biz",
            UserRole::Business,
            kyc,
        )]));
        let repo = Arc::new(MockWalletRepository::default());
        let mut wallet = Wallet::empty(
            "w-biz".to_string(),
            "biz".to_string(),
            "ZAR".to_string(),
            Utc::now().naive_utc(),
        );
        wallet.credit_available(available).unwrap();
        repo.wallets.lock().unwrap().push(wallet);
        (WalletService::new(repo.clone(), users), repo)
    }

    #[tokio::test]
    async fn withdraw_charges_flat_fee() {
        let (service, repo) = service_with(KycStatus::Approved, dec!(500));
        let tx = service
            .withdraw(
                "biz",
                WithdrawalRequest {
                    amount: dec!(200),
                    bank_account_reference: Some("FNB ****1234".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(tx.amount, dec!(-200));
        assert_eq!(tx.fee, WITHDRAWAL_FEE);
        let wallet = repo.find_by_user("biz").unwrap().unwrap();
        assert_eq!(wallet.available_balance, dec!(295));
        assert!(wallet.is_consistent());
    }

    #[tokio::test]
    async fn withdraw_requires_kyc() {
        let (service, _) = service_with(KycStatus::Pending, dec!(500));
        let err = service
            .withdraw(
                "biz",
                WithdrawalRequest {
                    amount: dec!(10),
                    bank_account_reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn withdraw_needs_amount_plus_fee() {
        let (service, _) = service_with(KycStatus::Approved, dec!(100));
        let err = service
            .withdraw(
                "biz",
                WithdrawalRequest {
                    amount: dec!(100),
                    bank_account_reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn review_only_accepts_flagged_rows() {
        let (service, _) = service_with(KycStatus::Approved, dec!(100));
        let tx = service
            .withdraw(
                "biz",
                WithdrawalRequest {
                    amount: dec!(10),
                    bank_account_reference: None,
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            service.review_flagged(&tx.id, None).await,
            Err(Error::Conflict(_))
        ));
    }
}
