//! Wallets module - per-user purses and the immutable transaction ledger.

pub mod ledger;
mod wallets_model;
mod wallets_service;
mod wallets_traits;

pub use wallets_model::{
    NewTransaction, ReleaseSummary, Transaction, TransactionStatus, TransactionType, Wallet,
    WithdrawalRequest,
};
pub use wallets_service::WalletService;
pub use wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
