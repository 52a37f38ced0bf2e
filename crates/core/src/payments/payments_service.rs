use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use super::payments_model::{
    Checkout, Gateway, GatewayCheckoutRequest, GatewayEvent, NewCheckout, PaymentOutcome,
    WebhookPayload,
};
use super::payments_traits::{PaymentGatewayClient, PaymentRepositoryTrait, PaymentServiceTrait};
use crate::constants::DUPLICATE_PAYMENT_WINDOW_MINUTES;
use crate::errors::{Error, IntegrationError, Result};
use crate::invoices::{InvoiceRepositoryTrait, InvoiceStatus};
use crate::utils::money::{round_money, to_cents};

/// Service for public checkouts and gateway webhooks.
pub struct PaymentService {
    repository: Arc<dyn PaymentRepositoryTrait>,
    invoices: Arc<dyn InvoiceRepositoryTrait>,
    gateways: HashMap<Gateway, Arc<dyn PaymentGatewayClient>>,
    public_base_url: String,
}

impl PaymentService {
    pub fn new(
        repository: Arc<dyn PaymentRepositoryTrait>,
        invoices: Arc<dyn InvoiceRepositoryTrait>,
        gateways: Vec<Arc<dyn PaymentGatewayClient>>,
        public_base_url: String,
    ) -> Self {
        let gateways = gateways
            .into_iter()
            .map(|client| (client.gateway(), client))
            .collect();
        Self {
            repository,
            invoices,
            gateways,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn client(&self, gateway: Gateway) -> Result<&Arc<dyn PaymentGatewayClient>> {
        self.gateways
            .get(&gateway)
            .ok_or_else(|| IntegrationError::NotConfigured(gateway.to_string()).into())
    }
}

#[async_trait]
impl PaymentServiceTrait for PaymentService {
    async fn create_checkout(
        &self,
        share_token: &str,
        gateway: Gateway,
        email: Option<String>,
    ) -> Result<Checkout> {
        let invoice = self.invoices.get_by_share_token(share_token)?;
        match invoice.status {
            InvoiceStatus::Sent | InvoiceStatus::Overdue => {}
            InvoiceStatus::Paid => {
                return Err(Error::Conflict(format!(
                    "Invoice {} has already been paid",
                    invoice.invoice_number
                )))
            }
            other => {
                return Err(Error::Conflict(format!(
                    "Invoice {} is {} and cannot be paid",
                    invoice.invoice_number, other
                )))
            }
        }

        let now = Utc::now().naive_utc();
        let since = now - Duration::minutes(DUPLICATE_PAYMENT_WINDOW_MINUTES);
        if self
            .repository
            .has_recent_completed_payment(&invoice.id, since)?
        {
            warn!(
                "Blocked checkout for invoice {}: payment completed within the last {} minutes",
                invoice.invoice_number, DUPLICATE_PAYMENT_WINDOW_MINUTES
            );
            return Err(Error::Conflict(
                "A payment for this invoice was just completed".to_string(),
            ));
        }

        let client = self.client(gateway)?;
        let amount = round_money(invoice.amount_due);
        let page = format!("{}/pay/{}", self.public_base_url, invoice.share_token);
        let request = GatewayCheckoutRequest {
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            amount_cents: to_cents(amount)?,
            currency: invoice.currency.clone(),
            customer_email: email.unwrap_or_else(|| invoice.client_email.clone()),
            success_url: format!("{}?status=success", page),
            cancel_url: format!("{}?status=cancelled", page),
            failure_url: format!("{}?status=failed", page),
        };
        let session = client.create_checkout(&request).await?;

        let checkout = self
            .repository
            .create_checkout(NewCheckout {
                invoice_id: invoice.id.clone(),
                gateway,
                gateway_checkout_id: session.gateway_checkout_id,
                amount,
                currency: invoice.currency.clone(),
                redirect_url: session.redirect_url,
            })
            .await?;
        info!(
            "Opened {} checkout {} for invoice {}",
            gateway, checkout.gateway_checkout_id, invoice.invoice_number
        );
        Ok(checkout)
    }

    async fn handle_webhook(
        &self,
        gateway: Gateway,
        payload: WebhookPayload,
    ) -> Result<PaymentOutcome> {
        let now = Utc::now().naive_utc();
        let event = self.client(gateway)?.parse_webhook(&payload, now)?;

        let outcome = match event {
            GatewayEvent::PaymentSucceeded(notice) => {
                let reference = notice.gateway_reference.clone();
                let outcome = self.repository.record_success(notice, now).await?;
                if let PaymentOutcome::Flagged { transaction } = &outcome {
                    warn!(
                        "{} payment {} flagged as possible duplicate (transaction {})",
                        gateway, reference, transaction.id
                    );
                }
                outcome
            }
            GatewayEvent::PaymentFailed(notice) => {
                self.repository.record_failure(notice, now).await?
            }
            GatewayEvent::Refunded(notice) => self.repository.record_refund(notice, now).await?,
            GatewayEvent::Ignored { event_type } => {
                debug!("Ignoring {} webhook event {}", gateway, event_type);
                PaymentOutcome::Ignored
            }
        };
        info!("{} webhook {}", gateway, outcome.label());
        Ok(outcome)
    }
}
