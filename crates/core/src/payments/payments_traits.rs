use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::payments_model::{
    Checkout, CheckoutStatus, CheckoutSession, Gateway, GatewayCheckoutRequest, GatewayEvent,
    NewCheckout, PaymentNotice, PaymentOutcome, WebhookPayload,
};
use crate::errors::Result;
use crate::invoices::Invoice;

/// Client for one hosted-checkout payment gateway.
#[async_trait]
pub trait PaymentGatewayClient: Send + Sync {
    fn gateway(&self) -> Gateway;

    async fn create_checkout(&self, request: &GatewayCheckoutRequest) -> Result<CheckoutSession>;

    /// Verifies the signature and normalizes the event.
    fn parse_webhook(&self, payload: &WebhookPayload, now: NaiveDateTime) -> Result<GatewayEvent>;
}

/// Trait defining the contract for checkout and webhook persistence.
#[async_trait]
pub trait PaymentRepositoryTrait: Send + Sync {
    /// True when a completed transaction for the invoice was created after `since`.
    fn has_recent_completed_payment(&self, invoice_id: &str, since: NaiveDateTime)
        -> Result<bool>;

    async fn create_checkout(&self, checkout: NewCheckout) -> Result<Checkout>;

    fn list_checkouts(&self, invoice_id: &str) -> Result<Vec<Checkout>>;

    fn find_invoice_for_notice(&self, notice: &PaymentNotice) -> Result<Invoice>;

    /// Applies a success notice in one transaction: replay check, duplicate
    /// flagging or the payment transition, and checkout completion.
    async fn record_success(
        &self,
        notice: PaymentNotice,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome>;

    async fn record_failure(
        &self,
        notice: PaymentNotice,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome>;

    async fn record_refund(&self, notice: PaymentNotice, now: NaiveDateTime)
        -> Result<PaymentOutcome>;

    async fn set_checkout_status(
        &self,
        gateway_checkout_id: &str,
        status: CheckoutStatus,
    ) -> Result<()>;
}

/// Trait defining the contract for payment service operations.
#[async_trait]
pub trait PaymentServiceTrait: Send + Sync {
    /// Opens a checkout for the invoice behind `share_token`.
    async fn create_checkout(
        &self,
        share_token: &str,
        gateway: Gateway,
        email: Option<String>,
    ) -> Result<Checkout>;

    async fn handle_webhook(
        &self,
        gateway: Gateway,
        payload: WebhookPayload,
    ) -> Result<PaymentOutcome>;
}
