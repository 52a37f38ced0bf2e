//! Vuka Core - Domain entities, services, and traits.
//!
//! This crate contains the business logic for invoicing, wallets and
//! revenue-based funding. It is database-agnostic and defines traits that
//! are implemented by the `storage-sqlite` and `connect` crates.

pub mod constants;
pub mod deals;
pub mod errors;
pub mod fx;
pub mod invoices;
pub mod notifications;
pub mod payments;
pub mod recurring;
pub mod revenue;
pub mod secrets;
pub mod users;
pub mod utils;
pub mod wallets;

#[cfg(test)]
pub(crate) mod testing;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
