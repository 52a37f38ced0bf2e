//! Revenue sources used to verify the monthly figures businesses report.

mod bank_feed;
mod xero;

pub use bank_feed::BankFeedSource;
pub use xero::{XeroClient, XeroSettings};
