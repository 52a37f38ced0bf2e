use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use vuka_core::{
    invoices::InboundEmail,
    notifications::InboundEmailPayload,
    payments::{Gateway, WebhookPayload},
};

use crate::{error::ApiResult, main_lib::AppState, models::WebhookAck};

fn to_payload(headers: &HeaderMap, body: Bytes) -> WebhookPayload {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    WebhookPayload {
        headers,
        body: body.to_vec(),
    }
}

async fn handle(
    state: &AppState,
    gateway: Gateway,
    payload: WebhookPayload,
) -> ApiResult<Json<WebhookAck>> {
    let outcome = state.payment_service.handle_webhook(gateway, payload).await?;
    tracing::info!("{} webhook processed: {}", gateway, outcome.label());
    Ok(Json(WebhookAck {
        received: true,
        outcome: outcome.label().to_string(),
    }))
}

#[utoipa::path(post, path = "/api/v1/webhooks/yoco", tag = "webhooks",
    responses((status = 200, body = WebhookAck), (status = 401, description = "Bad signature")))]
pub async fn yoco_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    handle(&state, Gateway::Yoco, to_payload(&headers, body)).await
}

#[utoipa::path(post, path = "/api/v1/webhooks/paystack", tag = "webhooks",
    responses((status = 200, body = WebhookAck), (status = 401, description = "Bad signature")))]
pub async fn paystack_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    handle(&state, Gateway::Paystack, to_payload(&headers, body)).await
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/inbound-email",
    tag = "webhooks",
    responses((status = 201, description = "Email stored"))
)]
pub async fn inbound_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InboundEmailPayload>,
) -> ApiResult<(StatusCode, Json<InboundEmail>)> {
    let email = state.invoice_service.ingest_inbound_email(payload).await?;
    Ok((StatusCode::CREATED, Json(email)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks/yoco", post(yoco_webhook))
        .route("/webhooks/paystack", post(paystack_webhook))
        .route("/webhooks/inbound-email", post(inbound_email))
}
