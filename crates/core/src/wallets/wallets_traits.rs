//! Wallet repository and service traits.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::wallets_model::{
    ReleaseSummary, Transaction, TransactionStatus, Wallet, WithdrawalRequest,
};
use crate::errors::Result;

/// Trait defining the contract for wallet and ledger persistence.
///
/// Methods that move money load the wallet, apply a [`super::ledger`] posting
/// and persist both rows in one transaction.
#[async_trait]
pub trait WalletRepositoryTrait: Send + Sync {
    /// Returns the user's wallet, creating an empty one on first use.
    async fn get_or_create(&self, user_id: &str, currency: &str) -> Result<Wallet>;

    fn find_by_user(&self, user_id: &str) -> Result<Option<Wallet>>;

    /// Newest first.
    fn list_transactions(&self, user_id: &str, limit: i64, offset: i64)
        -> Result<Vec<Transaction>>;

    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    fn list_transactions_by_status(&self, status: TransactionStatus) -> Result<Vec<Transaction>>;

    async fn withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
        fee: Decimal,
        bank_account_reference: Option<String>,
        now: NaiveDateTime,
    ) -> Result<Transaction>;

    /// Unlocks every unreleased deposit whose lock expired at or before `now`.
    async fn release_matured(&self, now: NaiveDateTime) -> Result<ReleaseSummary>;

    /// Moves a flagged row to `Reviewed`, merging `note` into its metadata.
    async fn mark_reviewed(&self, transaction_id: &str, note: Option<String>)
        -> Result<Transaction>;
}

/// Trait defining the contract for wallet service operations.
#[async_trait]
pub trait WalletServiceTrait: Send + Sync {
    async fn get_wallet(&self, user_id: &str) -> Result<Wallet>;

    fn list_transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Transaction>>;

    async fn withdraw(&self, user_id: &str, request: WithdrawalRequest) -> Result<Transaction>;

    async fn release_matured_funds(&self, now: NaiveDateTime) -> Result<ReleaseSummary>;

    fn list_flagged(&self) -> Result<Vec<Transaction>>;

    async fn review_flagged(&self, transaction_id: &str, note: Option<String>)
        -> Result<Transaction>;
}
