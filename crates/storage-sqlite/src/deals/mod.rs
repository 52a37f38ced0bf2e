//! SQLite storage implementation for deals and investments.

mod model;
mod repository;

pub use model::{DealDB, InvestmentDB};
pub use repository::DealRepository;
pub(crate) use repository::{
    load_deal_in_transaction, load_investments_in_transaction, save_deal_in_transaction,
};
