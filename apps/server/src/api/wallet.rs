use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use vuka_core::{
    users::UserRole,
    wallets::{Transaction, Wallet, WithdrawalRequest},
};

use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
    models::PageQuery,
};

const WALLET_ROLES: &[UserRole] = &[UserRole::Business, UserRole::Investor];

#[utoipa::path(
    get,
    path = "/api/v1/wallet",
    tag = "wallet",
    security(("bearer" = [])),
    responses((status = 200, description = "Wallet with matured funds released"))
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Wallet>> {
    require_role(&caller, WALLET_ROLES)?;
    Ok(Json(state.wallet_service.get_wallet(&caller.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet/transactions",
    tag = "wallet",
    security(("bearer" = [])),
    responses((status = 200, description = "Transactions, newest first"))
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<Vec<Transaction>>> {
    require_role(&caller, WALLET_ROLES)?;
    let transactions = state
        .wallet_service
        .list_transactions(&caller.id, page.limit, page.offset)?;
    Ok(Json(transactions))
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet/withdraw",
    tag = "wallet",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Withdrawal recorded"),
        (status = 402, description = "Insufficient available balance")
    )
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<WithdrawalRequest>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    require_role(&caller, WALLET_ROLES)?;
    let transaction = state.wallet_service.withdraw(&caller.id, request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallet", get(get_wallet))
        .route("/wallet/transactions", get(list_transactions))
        .route("/wallet/withdraw", post(withdraw))
}
