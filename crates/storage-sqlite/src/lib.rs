//! SQLite storage implementation for Vuka.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `vuka-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - Repository implementations for all domain entities
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! `core` and `connect` are database-agnostic and work with traits.
//!
//! ```text
//! core (domain)          connect (gateways, providers)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! Every write that touches more than one row (an invoice payment and its
//! ledger entry, a deal closing and the business credit) runs as a single
//! job on the write actor, inside one `IMMEDIATE` transaction.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

#[cfg(test)]
mod test_support;

// Repository implementations
pub mod deals;
pub mod fx;
pub mod invoices;
pub mod payments;
pub mod recurring;
pub mod revenue;
pub mod users;
pub mod wallets;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, OrNotFound, StorageError};

pub use deals::DealRepository;
pub use fx::FxRepository;
pub use invoices::InvoiceRepository;
pub use payments::PaymentRepository;
pub use recurring::RecurringInvoiceRepository;
pub use revenue::RevenueRepository;
pub use users::UserRepository;
pub use wallets::WalletRepository;

// Re-export from vuka-core for convenience
pub use vuka_core::errors::{DatabaseError, Error, Result};
