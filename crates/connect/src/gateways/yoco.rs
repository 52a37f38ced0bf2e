//! Yoco online checkout client.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vuka_core::errors::{IntegrationError, Result};
use vuka_core::payments::{
    CheckoutSession, Gateway, GatewayCheckoutRequest, GatewayEvent, PaymentGatewayClient,
    PaymentNotice, WebhookPayload,
};
use vuka_core::utils::money::from_cents;

use super::signature::verify_standard_webhook;
use crate::http::{build_client, http_error, parse_response, unexpected};

const SERVICE: &str = "yoco";
const DEFAULT_API_URL: &str = "https://payments.yoco.com/api";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckoutBody<'a> {
    amount: i64,
    currency: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
    failure_url: &'a str,
    metadata: CheckoutMetadata<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutMetadata<'a> {
    invoice_id: &'a str,
    invoice_number: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    id: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    payload: EventPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload {
    id: String,
    amount: i64,
    #[serde(default)]
    fee: Option<i64>,
    currency: String,
    #[serde(default)]
    metadata: EventMetadata,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventMetadata {
    #[serde(default)]
    checkout_id: Option<String>,
    #[serde(default)]
    invoice_id: Option<String>,
}

pub struct YocoClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
    webhook_secret: String,
}

impl YocoClient {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, secret_key, webhook_secret)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        secret_key: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("Yoco secret key".to_string()).into());
        }
        Ok(Self {
            client: build_client(SERVICE)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            secret_key,
            webhook_secret: webhook_secret.into(),
        })
    }

    fn notice(payload: EventPayload) -> PaymentNotice {
        PaymentNotice {
            gateway: Gateway::Yoco,
            gateway_reference: payload.id,
            gateway_checkout_id: payload.metadata.checkout_id,
            invoice_id: payload.metadata.invoice_id,
            amount: from_cents(payload.amount),
            fee: payload.fee.map(from_cents).unwrap_or(Decimal::ZERO),
            currency: payload.currency.to_uppercase(),
            failure_reason: payload.failure_reason,
        }
    }
}

#[async_trait]
impl PaymentGatewayClient for YocoClient {
    fn gateway(&self) -> Gateway {
        Gateway::Yoco
    }

    async fn create_checkout(&self, request: &GatewayCheckoutRequest) -> Result<CheckoutSession> {
        let body = CreateCheckoutBody {
            amount: request.amount_cents,
            currency: &request.currency,
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
            failure_url: &request.failure_url,
            metadata: CheckoutMetadata {
                invoice_id: &request.invoice_id,
                invoice_number: &request.invoice_number,
            },
        };

        let response = self
            .client
            .post(format!("{}/checkouts", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let checkout: CheckoutResponse = parse_response(SERVICE, response).await?;

        info!(
            "Created Yoco checkout {} for invoice {}",
            checkout.id, request.invoice_number
        );
        Ok(CheckoutSession {
            gateway_checkout_id: checkout.id,
            redirect_url: checkout.redirect_url,
        })
    }

    fn parse_webhook(&self, payload: &WebhookPayload, now: NaiveDateTime) -> Result<GatewayEvent> {
        let missing =
            |name: &str| IntegrationError::InvalidSignature(format!("missing {} header", name));
        let id = payload.header("webhook-id").ok_or_else(|| missing("webhook-id"))?;
        let timestamp = payload
            .header("webhook-timestamp")
            .ok_or_else(|| missing("webhook-timestamp"))?;
        let signature = payload
            .header("webhook-signature")
            .ok_or_else(|| missing("webhook-signature"))?;
        verify_standard_webhook(
            &self.webhook_secret,
            id,
            timestamp,
            signature,
            &payload.body,
            now,
        )?;

        let event: WebhookEvent = serde_json::from_slice(&payload.body)
            .map_err(|e| unexpected(SERVICE, format!("webhook body: {}", e)))?;
        debug!("Yoco webhook {} ({})", id, event.event_type);

        Ok(match event.event_type.as_str() {
            "payment.succeeded" => GatewayEvent::PaymentSucceeded(Self::notice(event.payload)),
            "payment.failed" => GatewayEvent::PaymentFailed(Self::notice(event.payload)),
            "refund.succeeded" => GatewayEvent::Refunded(Self::notice(event.payload)),
            _ => GatewayEvent::Ignored {
                event_type: event.event_type,
            },
        })
    }
}
