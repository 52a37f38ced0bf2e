//! SQLite storage implementation for gateway checkouts and webhook settlement.

mod model;
mod repository;

pub use model::CheckoutDB;
pub use repository::PaymentRepository;
