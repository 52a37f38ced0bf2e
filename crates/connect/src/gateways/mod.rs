//! Payment gateway clients.
//!
//! Each client creates hosted checkouts and turns verified webhooks into
//! [`GatewayEvent`](vuka_core::payments::GatewayEvent)s. Signature checks live
//! in [`signature`] and always run before a body is parsed.

mod paystack;
pub mod signature;
mod yoco;

pub use paystack::PaystackClient;
pub use yoco::YocoClient;
