//! SQLite storage implementation for recurring invoice templates.

mod model;
mod repository;

pub use model::RecurringInvoiceDB;
pub use repository::RecurringInvoiceRepository;
