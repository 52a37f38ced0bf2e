use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::invoices::Invoice;
use crate::wallets::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gateway {
    Yoco,
    Paystack,
}

crate::text_enum!(Gateway {
    Yoco => "YOCO",
    Paystack => "PAYSTACK",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    Pending,
    Completed,
    Failed,
}

crate::text_enum!(CheckoutStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: String,
    pub invoice_id: String,
    pub gateway: Gateway,
    pub gateway_checkout_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: CheckoutStatus,
    pub redirect_url: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCheckout {
    pub invoice_id: String,
    pub gateway: Gateway,
    pub gateway_checkout_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub redirect_url: String,
}

/// Payer's choice on the public invoice page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub gateway: Gateway,
    pub email: Option<String>,
}

/// What a gateway client needs to open a hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCheckoutRequest {
    pub invoice_id: String,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub failure_url: String,
}

/// Hosted checkout opened by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub gateway_checkout_id: String,
    pub redirect_url: String,
}

/// Raw webhook request. Header names are lower-cased.
#[derive(Debug, Clone, Default)]
pub struct WebhookPayload {
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookPayload {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Details of a payment reported by a gateway. Amounts are in major units.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotice {
    pub gateway: Gateway,
    /// Unique payment or refund id at the gateway.
    pub gateway_reference: String,
    pub gateway_checkout_id: Option<String>,
    pub invoice_id: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub failure_reason: Option<String>,
}

/// A verified webhook, normalized across gateways.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    PaymentSucceeded(PaymentNotice),
    PaymentFailed(PaymentNotice),
    Refunded(PaymentNotice),
    /// Verified but not relevant (e.g. a transfer event).
    Ignored { event_type: String },
}

/// How a webhook was applied.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// The invoice was marked paid and the wallet credited.
    Applied {
        invoice: Invoice,
        transaction: Option<Transaction>,
    },
    /// A success for an invoice that is not payable; recorded for review.
    Flagged { transaction: Transaction },
    /// Failure recorded without balance effect.
    Failed { transaction: Transaction },
    /// Refund reversed the payment.
    Reversed {
        invoice: Invoice,
        transaction: Option<Transaction>,
    },
    /// The gateway reference was already processed.
    Replayed,
    Ignored,
}

impl PaymentOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentOutcome::Applied { .. } => "applied",
            PaymentOutcome::Flagged { .. } => "flagged",
            PaymentOutcome::Failed { .. } => "failed",
            PaymentOutcome::Reversed { .. } => "reversed",
            PaymentOutcome::Replayed => "replayed",
            PaymentOutcome::Ignored => "ignored",
        }
    }
}
