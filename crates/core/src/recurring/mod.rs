//! Recurring invoices - templates that generate an invoice every period.

mod recurring_model;
mod recurring_service;
mod recurring_traits;

#[cfg(test)]
mod recurring_service_tests;

pub use recurring_model::{
    Frequency, GeneratedOccurrence, NewRecurringInvoice, RecurringInvoice, RecurringInvoiceUpdate,
    RecurringRunSummary,
};
pub use recurring_service::RecurringInvoiceService;
pub use recurring_traits::{RecurringInvoiceRepositoryTrait, RecurringInvoiceServiceTrait};
