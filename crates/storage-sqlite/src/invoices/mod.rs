//! SQLite storage implementation for invoices, their items and inbound mail.

mod model;
mod repository;

pub use model::{InboundEmailDB, InvoiceDB, InvoiceItemDB};
pub use repository::InvoiceRepository;
pub(crate) use repository::{
    apply_transition_in_transaction, insert_invoice_in_transaction, load_invoice_in_transaction,
};
