//! Administrator routes. Every handler checks the `ADMIN` role first.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use vuka_core::{
    fx::{ExchangeRate, NewExchangeRate},
    users::{User, UserRole},
    wallets::Transaction,
};

use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
    models::{KycReviewRequest, StatusUpdateRequest, TransactionReviewRequest, TransitionResponse},
};

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("bearer" = [])),
    responses((status = 200, description = "Every user"))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<User>>> {
    require_role(&caller, &[UserRole::Admin])?;
    Ok(Json(state.user_service.list_users()?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/kyc",
    tag = "admin",
    params(("id" = String, Path, description = "User id")),
    request_body = KycReviewRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Reviewed user"))
)]
pub async fn review_kyc(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(review): Json<KycReviewRequest>,
) -> ApiResult<Json<User>> {
    require_role(&caller, &[UserRole::Admin])?;
    let user = state.user_service.review_kyc(&id, review.approved).await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/transactions/flagged",
    tag = "admin",
    security(("bearer" = [])),
    responses((status = 200, description = "Flagged transactions"))
)]
pub async fn list_flagged(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Transaction>>> {
    require_role(&caller, &[UserRole::Admin])?;
    Ok(Json(state.wallet_service.list_flagged()?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/{id}/review",
    tag = "admin",
    params(("id" = String, Path, description = "Transaction id")),
    request_body(content = TransactionReviewRequest, description = "Optional review note"),
    security(("bearer" = [])),
    responses((status = 200, description = "Reviewed transaction"))
)]
pub async fn review_transaction(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    body: Option<Json<TransactionReviewRequest>>,
) -> ApiResult<Json<Transaction>> {
    require_role(&caller, &[UserRole::Admin])?;
    let note = body.and_then(|Json(review)| review.note);
    let transaction = state.wallet_service.review_flagged(&id, note).await?;
    Ok(Json(transaction))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/invoices/{id}/override-status",
    tag = "admin",
    params(("id" = String, Path, description = "Invoice id")),
    request_body = StatusUpdateRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Invoice and any wallet transaction"))
)]
pub async fn override_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<StatusUpdateRequest>,
) -> ApiResult<Json<TransitionResponse>> {
    require_role(&caller, &[UserRole::Admin])?;
    tracing::warn!(
        "Admin {} overriding invoice {} to {}",
        caller.id,
        id,
        request.status
    );
    let outcome = state
        .invoice_service
        .override_status(&id, request.status)
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/exchange-rates",
    tag = "admin",
    security(("bearer" = [])),
    responses((status = 200, description = "Stored rate"))
)]
pub async fn set_rate(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(rate): Json<NewExchangeRate>,
) -> ApiResult<Json<ExchangeRate>> {
    require_role(&caller, &[UserRole::Admin])?;
    Ok(Json(state.fx_service.set_rate(rate).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/kyc", post(review_kyc))
        .route("/admin/transactions/flagged", get(list_flagged))
        .route("/admin/transactions/{id}/review", post(review_transaction))
        .route(
            "/admin/invoices/{id}/override-status",
            post(override_status),
        )
        .route("/admin/exchange-rates", put(set_rate))
}
