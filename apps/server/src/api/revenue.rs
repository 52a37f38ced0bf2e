use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use vuka_core::{
    revenue::{
        DistributionOutcome, NewRevenueConnection, NewRevenueReport, RevenueConnection,
        RevenueReport, XeroAuthorization,
    },
    users::UserRole,
};

use super::current_user;
use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
    models::XeroCallbackRequest,
};

#[utoipa::path(
    get,
    path = "/api/v1/revenue/connections",
    tag = "revenue",
    security(("bearer" = [])),
    responses((status = 200, description = "Revenue connections, without tokens"))
)]
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<RevenueConnection>>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.revenue_service.list_connections(&caller.id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/revenue/connections",
    tag = "revenue",
    security(("bearer" = [])),
    responses((status = 201, description = "Connection stored"))
)]
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(connection): Json<NewRevenueConnection>,
) -> ApiResult<(StatusCode, Json<RevenueConnection>)> {
    require_role(&caller, &[UserRole::Business])?;
    let created = state.revenue_service.connect(&caller.id, connection).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/revenue/xero/authorize",
    tag = "revenue",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Xero consent URL and state"),
        (status = 502, description = "Xero is not configured")
    )
)]
pub async fn xero_authorize(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<XeroAuthorization>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.revenue_service.xero_authorize(&caller.id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/revenue/xero/callback",
    tag = "revenue",
    request_body = XeroCallbackRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Xero connection stored"),
        (status = 403, description = "State belongs to another user")
    )
)]
pub async fn xero_callback(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(callback): Json<XeroCallbackRequest>,
) -> ApiResult<Json<RevenueConnection>> {
    require_role(&caller, &[UserRole::Business])?;
    let connection = state
        .revenue_service
        .xero_callback(&caller.id, &callback.code, &callback.state)
        .await?;
    Ok(Json(connection))
}

#[utoipa::path(
    post,
    path = "/api/v1/revenue/reports",
    tag = "revenue",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Report stored as UNVERIFIED"),
        (status = 409, description = "Deal not funded or period already reported")
    )
)]
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(report): Json<NewRevenueReport>,
) -> ApiResult<(StatusCode, Json<RevenueReport>)> {
    require_role(&caller, &[UserRole::Business])?;
    let report = state
        .revenue_service
        .submit_report(&caller.id, report)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    post,
    path = "/api/v1/revenue/reports/{id}/distribute",
    tag = "revenue",
    params(("id" = String, Path, description = "Report id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payout allocations"),
        (status = 409, description = "Already distributed or a discrepancy")
    )
)]
pub async fn distribute(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<DistributionOutcome>> {
    require_role(&caller, &[UserRole::Business, UserRole::Admin])?;
    let viewer = current_user(&state, &caller)?;
    Ok(Json(state.revenue_service.distribute(&viewer, &id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/revenue/connections",
            get(list_connections).post(connect),
        )
        .route("/revenue/xero/authorize", get(xero_authorize))
        .route("/revenue/xero/callback", post(xero_callback))
        .route("/revenue/reports", post(submit_report))
        .route("/revenue/reports/{id}/distribute", post(distribute))
}
