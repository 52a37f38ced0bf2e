//! Vuka Connect - outbound integrations for Vuka.
//!
//! HTTP clients for the payment gateways (Yoco, Paystack), transactional
//! email, bank-feed aggregation and Xero accounting. Each client implements a
//! trait from `vuka-core`, so services never see a provider directly.

pub mod email;
#[cfg(feature = "gateways")]
pub mod gateways;
mod http;
pub mod revenue;

pub use email::{HttpEmailSender, LogEmailSender};
#[cfg(feature = "gateways")]
pub use gateways::{PaystackClient, YocoClient};
pub use revenue::{BankFeedSource, XeroClient, XeroSettings};
