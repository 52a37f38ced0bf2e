//! Wallet and ledger domain models.
//!
//! A wallet keeps three figures: `balance`, `available_balance` and
//! `locked_balance`. Every mutation below keeps
//! `balance == available_balance + locked_balance` with no negative field.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::payments::Gateway;
use crate::utils::money::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Investment,
    Refund,
    DealFunding,
    RevenueShare,
    RevenueSharePayment,
}

crate::text_enum!(TransactionType {
    Deposit => "DEPOSIT",
    Withdrawal => "WITHDRAWAL",
    Investment => "INVESTMENT",
    Refund => "REFUND",
    DealFunding => "DEAL_FUNDING",
    RevenueShare => "REVENUE_SHARE",
    RevenueSharePayment => "REVENUE_SHARE_PAYMENT",
});

/// Only `Completed` rows have moved money. `Flagged` rows wait for admin review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Flagged,
    Reviewed,
}

crate::text_enum!(TransactionStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Flagged => "FLAGGED",
    Reviewed => "REVIEWED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub balance: Decimal,
    pub available_balance: Decimal,
    pub locked_balance: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Wallet {
    /// A zero-balance wallet, as created on first use.
    pub fn empty(id: String, user_id: String, currency: String, now: NaiveDateTime) -> Self {
        Self {
            id,
            user_id,
            currency,
            balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            locked_balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.balance == self.available_balance + self.locked_balance
            && self.available_balance >= Decimal::ZERO
            && self.locked_balance >= Decimal::ZERO
    }

    /// Adds funds that stay locked until the settlement period ends.
    pub fn credit_locked(&mut self, amount: Decimal) -> Result<()> {
        let amount = non_negative(amount)?;
        self.locked_balance = round_money(self.locked_balance + amount);
        self.balance = round_money(self.balance + amount);
        Ok(())
    }

    /// Adds immediately withdrawable funds.
    pub fn credit_available(&mut self, amount: Decimal) -> Result<()> {
        let amount = non_negative(amount)?;
        self.available_balance = round_money(self.available_balance + amount);
        self.balance = round_money(self.balance + amount);
        Ok(())
    }

    /// Removes withdrawable funds, failing when they do not cover `amount`.
    pub fn debit_available(&mut self, amount: Decimal) -> Result<()> {
        let amount = non_negative(amount)?;
        if self.available_balance < amount {
            return Err(Error::InsufficientFunds(format!(
                "available balance {} {} does not cover {}",
                self.available_balance, self.currency, amount
            )));
        }
        self.available_balance = round_money(self.available_balance - amount);
        self.balance = round_money(self.balance - amount);
        Ok(())
    }

    /// Takes back a previous credit, locked funds first, never going below zero.
    ///
    /// Returns the amount actually removed, which is less than `amount` when the
    /// wallet no longer holds enough.
    pub fn reverse_credit(&mut self, amount: Decimal) -> Decimal {
        let amount = amount.max(Decimal::ZERO);
        let from_locked = amount.min(self.locked_balance);
        let from_available = (amount - from_locked).min(self.available_balance);

        self.locked_balance = round_money(self.locked_balance - from_locked);
        self.available_balance = round_money(self.available_balance - from_available);
        self.balance = round_money(self.locked_balance + self.available_balance);
        from_locked + from_available
    }

    /// Moves up to `amount` from locked to available. Returns the amount moved.
    pub fn release(&mut self, amount: Decimal) -> Decimal {
        let moved = amount.max(Decimal::ZERO).min(self.locked_balance);
        self.locked_balance = round_money(self.locked_balance - moved);
        self.available_balance = round_money(self.available_balance + moved);
        moved
    }
}

fn non_negative(amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(Error::invalid_input(format!(
            "Ledger amount cannot be negative: {}",
            amount
        )));
    }
    Ok(round_money(amount))
}

/// Immutable ledger entry.
///
/// `amount` is signed (credits positive, debits negative), `fee` is never
/// negative and `net_amount = amount - fee` is the effect on the wallet
/// balance for `Completed` rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub invoice_id: Option<String>,
    pub deal_id: Option<String>,
    pub gateway: Option<Gateway>,
    pub gateway_reference: Option<String>,
    pub locked_until: Option<NaiveDateTime>,
    pub released: bool,
    pub created_at: NaiveDateTime,
}

/// Ledger entry ready to insert. Built by the functions in [`super::ledger`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub wallet_id: String,
    pub user_id: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub invoice_id: Option<String>,
    pub deal_id: Option<String>,
    pub gateway: Option<Gateway>,
    pub gateway_reference: Option<String>,
    pub locked_until: Option<NaiveDateTime>,
    pub released: bool,
    pub created_at: NaiveDateTime,
}

impl NewTransaction {
    pub fn into_transaction(self, id: String) -> Transaction {
        Transaction {
            id,
            wallet_id: self.wallet_id,
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            status: self.status,
            amount: self.amount,
            fee: self.fee,
            net_amount: self.net_amount,
            currency: self.currency,
            description: self.description,
            metadata: self.metadata,
            invoice_id: self.invoice_id,
            deal_id: self.deal_id,
            gateway: self.gateway,
            gateway_reference: self.gateway_reference,
            locked_until: self.locked_until,
            released: self.released,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    pub bank_account_reference: Option<String>,
}

/// Result of a locked-funds release run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub transactions_released: usize,
    pub wallets_updated: usize,
    pub amount_released: Decimal,
}
