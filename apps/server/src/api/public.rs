//! Routes reachable through an invoice's share link, without a session.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use vuka_core::{
    invoices::PublicInvoice,
    payments::{Checkout, CheckoutRequest},
};

use crate::{error::ApiResult, main_lib::AppState};

#[utoipa::path(
    get,
    path = "/api/v1/public/invoices/{token}",
    tag = "public",
    params(("token" = String, Path, description = "Invoice share token")),
    responses((status = 200, description = "Invoice as the client sees it"), (status = 404))
)]
pub async fn get_public_invoice(
    Path(token): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PublicInvoice>> {
    Ok(Json(state.invoice_service.get_public_invoice(&token)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/public/invoices/{token}/checkout",
    tag = "public",
    params(("token" = String, Path, description = "Invoice share token")),
    responses(
        (status = 201, description = "Hosted checkout"),
        (status = 409, description = "Invoice cannot be paid")
    )
)]
pub async fn create_checkout(
    Path(token): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Checkout>)> {
    let checkout = state
        .payment_service
        .create_checkout(&token, request.gateway, request.email)
        .await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/public/invoices/{token}", get(get_public_invoice))
        .route("/public/invoices/{token}/checkout", post(create_checkout))
}
