//! Database models for wallets and ledger rows.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::wallets::{NewTransaction, Transaction, Wallet};
use vuka_core::{Error, Result};

use crate::errors::StorageError;
use crate::utils::{decimal_text, parse_decimal, parse_optional_text, parse_text};

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletDB {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub balance: String,
    pub available_balance: String,
    pub locked_balance: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<WalletDB> for Wallet {
    type Error = Error;

    fn try_from(db: WalletDB) -> Result<Self> {
        Ok(Self {
            balance: parse_decimal(&db.balance, "wallets.balance")?,
            available_balance: parse_decimal(&db.available_balance, "wallets.available_balance")?,
            locked_balance: parse_decimal(&db.locked_balance, "wallets.locked_balance")?,
            id: db.id,
            user_id: db.user_id,
            currency: db.currency,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<&Wallet> for WalletDB {
    fn from(wallet: &Wallet) -> Self {
        Self {
            id: wallet.id.clone(),
            user_id: wallet.user_id.clone(),
            currency: wallet.currency.clone(),
            balance: decimal_text(wallet.balance),
            available_balance: decimal_text(wallet.available_balance),
            locked_balance: decimal_text(wallet.locked_balance),
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub transaction_type: String,
    pub status: String,
    pub amount: String,
    pub fee: String,
    pub net_amount: String,
    pub currency: String,
    pub description: String,
    pub metadata: Option<String>,
    pub invoice_id: Option<String>,
    pub deal_id: Option<String>,
    pub gateway: Option<String>,
    pub gateway_reference: Option<String>,
    pub locked_until: Option<NaiveDateTime>,
    pub released: bool,
    pub created_at: NaiveDateTime,
}

impl TransactionDB {
    pub fn from_new(id: String, tx: &NewTransaction) -> Result<Self> {
        let metadata = tx
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok(Self {
            id,
            wallet_id: tx.wallet_id.clone(),
            user_id: tx.user_id.clone(),
            transaction_type: tx.transaction_type.as_str().to_string(),
            status: tx.status.as_str().to_string(),
            amount: decimal_text(tx.amount),
            fee: decimal_text(tx.fee),
            net_amount: decimal_text(tx.net_amount),
            currency: tx.currency.clone(),
            description: tx.description.clone(),
            metadata,
            invoice_id: tx.invoice_id.clone(),
            deal_id: tx.deal_id.clone(),
            gateway: tx.gateway.map(|g| g.as_str().to_string()),
            gateway_reference: tx.gateway_reference.clone(),
            locked_until: tx.locked_until,
            released: tx.released,
            created_at: tx.created_at,
        })
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self> {
        let metadata = db
            .metadata
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| StorageError::CorruptValue(format!("transactions.metadata: {}", e)))?;
        Ok(Self {
            transaction_type: parse_text(&db.transaction_type, "transactions.transaction_type")?,
            status: parse_text(&db.status, "transactions.status")?,
            amount: parse_decimal(&db.amount, "transactions.amount")?,
            fee: parse_decimal(&db.fee, "transactions.fee")?,
            net_amount: parse_decimal(&db.net_amount, "transactions.net_amount")?,
            gateway: parse_optional_text(db.gateway.as_deref(), "transactions.gateway")?,
            metadata,
            id: db.id,
            wallet_id: db.wallet_id,
            user_id: db.user_id,
            currency: db.currency,
            description: db.description,
            invoice_id: db.invoice_id,
            deal_id: db.deal_id,
            gateway_reference: db.gateway_reference,
            locked_until: db.locked_until,
            released: db.released,
            created_at: db.created_at,
        })
    }
}
