//! Invoices module - VAT invoices, their payment state machine and reminders.

mod invoices_model;
mod invoices_service;
mod invoices_traits;
pub mod transition;


pub use invoices_model::{
    compute_lines, format_invoice_number, ComputedLine, InboundEmail, Invoice, InvoiceDraft,
    InvoiceItem, InvoiceLine, InvoiceStatus, InvoiceTotals, NewInboundEmail, PublicInvoice,
    ReminderSummary,
};
pub use invoices_service::InvoiceService;
pub use invoices_traits::{
    InvoiceRepositoryTrait, InvoiceServiceTrait, PaymentSettlement, TransitionOutcome,
    TransitionRequest,
};
pub use transition::{plan_transition, TransitionMode, TransitionPlan};
