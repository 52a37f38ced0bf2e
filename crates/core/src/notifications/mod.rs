//! Notifications module - outbound transactional email and inbound mail parsing.

mod email_model;
mod email_traits;
pub mod templates;

pub use email_model::{extract_invoice_number, EmailMessage, InboundEmailPayload};
pub use email_traits::EmailSender;
