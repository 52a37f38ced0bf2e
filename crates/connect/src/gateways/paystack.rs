//! Paystack transaction client.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use vuka_core::errors::{IntegrationError, Result};
use vuka_core::payments::{
    CheckoutSession, Gateway, GatewayCheckoutRequest, GatewayEvent, PaymentGatewayClient,
    PaymentNotice, WebhookPayload,
};
use vuka_core::utils::money::from_cents;

use super::signature::verify_hex_sha512;
use crate::http::{build_client, http_error, parse_response, unexpected};

const SERVICE: &str = "paystack";
const DEFAULT_API_URL: &str = "https://api.paystack.co";
const SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    callback_url: &'a str,
    metadata: InitializeMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct InitializeMetadata<'a> {
    invoice_id: &'a str,
    invoice_number: &'a str,
    cancel_action: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event: String,
    data: serde_json::Value,
}

/// `charge.*` event data.
#[derive(Debug, Deserialize)]
struct ChargeData {
    #[serde(deserialize_with = "id_string")]
    id: String,
    reference: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    fees: Option<i64>,
    #[serde(default)]
    gateway_response: Option<String>,
    #[serde(default)]
    metadata: Option<ChargeMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ChargeMetadata {
    #[serde(default)]
    invoice_id: Option<String>,
}

/// `refund.*` event data.
#[derive(Debug, Deserialize)]
struct RefundData {
    #[serde(deserialize_with = "id_string")]
    id: String,
    transaction_reference: String,
    amount: i64,
    currency: String,
}

/// Paystack sends numeric ids; older payloads sometimes quote them.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected id, found {}",
            other
        ))),
    }
}

pub struct PaystackClient {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(secret_key: impl Into<String>) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, secret_key)
    }

    pub fn with_api_url(api_url: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let secret_key = secret_key.into();
        if secret_key.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("Paystack secret key".to_string()).into());
        }
        Ok(Self {
            client: build_client(SERVICE)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    fn decode<T: for<'de> Deserialize<'de>>(data: serde_json::Value) -> Result<T> {
        serde_json::from_value(data).map_err(|e| unexpected(SERVICE, format!("webhook data: {}", e)))
    }

    fn charge_notice(data: ChargeData, failed: bool) -> PaymentNotice {
        PaymentNotice {
            gateway: Gateway::Paystack,
            gateway_reference: data.id,
            gateway_checkout_id: Some(data.reference),
            invoice_id: data.metadata.and_then(|m| m.invoice_id),
            amount: from_cents(data.amount),
            fee: data.fees.map(from_cents).unwrap_or(Decimal::ZERO),
            currency: data.currency.to_uppercase(),
            failure_reason: if failed { data.gateway_response } else { None },
        }
    }
}

#[async_trait]
impl PaymentGatewayClient for PaystackClient {
    fn gateway(&self) -> Gateway {
        Gateway::Paystack
    }

    async fn create_checkout(&self, request: &GatewayCheckoutRequest) -> Result<CheckoutSession> {
        let body = InitializeBody {
            email: &request.customer_email,
            amount: request.amount_cents,
            currency: &request.currency,
            callback_url: &request.success_url,
            metadata: InitializeMetadata {
                invoice_id: &request.invoice_id,
                invoice_number: &request.invoice_number,
                cancel_action: &request.cancel_url,
            },
        };

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.api_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let envelope: Envelope<InitializeData> = parse_response(SERVICE, response).await?;
        let data = match envelope.data {
            Some(data) if envelope.status => data,
            _ => {
                return Err(unexpected(
                    SERVICE,
                    envelope
                        .message
                        .unwrap_or_else(|| "transaction was not initialized".to_string()),
                ))
            }
        };

        info!(
            "Initialized Paystack transaction {} for invoice {}",
            data.reference, request.invoice_number
        );
        Ok(CheckoutSession {
            gateway_checkout_id: data.reference,
            redirect_url: data.authorization_url,
        })
    }

    fn parse_webhook(&self, payload: &WebhookPayload, _now: NaiveDateTime) -> Result<GatewayEvent> {
        let signature = payload.header(SIGNATURE_HEADER).ok_or_else(|| {
            IntegrationError::InvalidSignature(format!("missing {} header", SIGNATURE_HEADER))
        })?;
        verify_hex_sha512(&self.secret_key, signature, &payload.body)?;

        let event: WebhookEvent = serde_json::from_slice(&payload.body)
            .map_err(|e| unexpected(SERVICE, format!("webhook body: {}", e)))?;
        debug!("Paystack webhook {}", event.event);

        Ok(match event.event.as_str() {
            "charge.success" => {
                GatewayEvent::PaymentSucceeded(Self::charge_notice(Self::decode(event.data)?, false))
            }
            "charge.failed" => {
                GatewayEvent::PaymentFailed(Self::charge_notice(Self::decode(event.data)?, true))
            }
            "refund.processed" => {
                let data: RefundData = Self::decode(event.data)?;
                GatewayEvent::Refunded(PaymentNotice {
                    gateway: Gateway::Paystack,
                    gateway_reference: data.id,
                    gateway_checkout_id: Some(data.transaction_reference),
                    invoice_id: None,
                    amount: from_cents(data.amount),
                    fee: Decimal::ZERO,
                    currency: data.currency.to_uppercase(),
                    failure_reason: None,
                })
            }
            _ => GatewayEvent::Ignored {
                event_type: event.event,
            },
        })
    }
}
