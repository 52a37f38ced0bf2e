//! SQLite storage implementation for wallets and the transaction ledger.
//!
//! The `*_in_transaction` helpers are shared with the invoice, payment, deal
//! and revenue repositories so their ledger postings commit together with the
//! rest of the write.

mod model;
mod repository;

pub use model::{TransactionDB, WalletDB};
pub use repository::WalletRepository;
pub(crate) use repository::{
    find_wallet_in_transaction, get_or_create_wallet_in_transaction,
    insert_transaction_in_transaction, save_wallet_in_transaction,
};
