use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use vuka_core::{
    invoices::{InboundEmail, Invoice, InvoiceDraft},
    users::UserRole,
};

use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
    models::{InvoiceListQuery, StatusUpdateRequest, TransitionResponse},
};

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    security(("bearer" = [])),
    responses((status = 200, description = "Invoices"))
)]
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<InvoiceListQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    require_role(&caller, &[UserRole::Business])?;
    let invoices = state
        .invoice_service
        .list_invoices(&caller.id, query.status)?;
    Ok(Json(invoices))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    tag = "invoices",
    security(("bearer" = [])),
    responses((status = 201, description = "Draft invoice created"))
)]
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(draft): Json<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    require_role(&caller, &[UserRole::Business])?;
    let invoice = state
        .invoice_service
        .create_invoice(&caller.id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Invoice"), (status = 404))
)]
pub async fn get_invoice(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Invoice>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.invoice_service.get_invoice(&caller.id, &id)?))
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Draft updated"),
        (status = 409, description = "Invoice is not a draft")
    )
)]
pub async fn update_invoice(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(draft): Json<InvoiceDraft>,
) -> ApiResult<Json<Invoice>> {
    require_role(&caller, &[UserRole::Business])?;
    let invoice = state
        .invoice_service
        .update_invoice(&caller.id, &id, draft)
        .await?;
    Ok(Json(invoice))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    security(("bearer" = [])),
    responses((status = 204), (status = 409, description = "Invoice is not a draft"))
)]
pub async fn delete_invoice(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    require_role(&caller, &[UserRole::Business])?;
    state.invoice_service.delete_invoice(&caller.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}/status",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    request_body = StatusUpdateRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Invoice and any wallet transaction"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<StatusUpdateRequest>,
) -> ApiResult<Json<TransitionResponse>> {
    require_role(&caller, &[UserRole::Business])?;
    let outcome = state
        .invoice_service
        .update_status(&caller.id, &id, request.status)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/send",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Invoice emailed and SENT"))
)]
pub async fn send_invoice(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Invoice>> {
    require_role(&caller, &[UserRole::Business])?;
    let invoice = state.invoice_service.send_invoice(&caller.id, &id).await?;
    Ok(Json(invoice))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}/emails",
    tag = "invoices",
    params(("id" = String, Path, description = "Invoice id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Inbound client replies"))
)]
pub async fn list_emails(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<InboundEmail>>> {
    require_role(&caller, &[UserRole::Business])?;
    let emails = state.invoice_service.list_inbound_emails(&caller.id, &id)?;
    Ok(Json(emails))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{id}",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/invoices/{id}/status", put(update_status))
        .route("/invoices/{id}/send", post(send_invoice))
        .route("/invoices/{id}/emails", get(list_emails))
}
