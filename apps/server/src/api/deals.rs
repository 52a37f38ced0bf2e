use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use vuka_core::{
    deals::{Deal, Investment, InvestmentRequest, NewDeal},
    revenue::RevenueReport,
    users::UserRole,
};

use super::current_user;
use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
    models::{DealListQuery, InvestmentResponse},
};

#[utoipa::path(
    get,
    path = "/api/v1/deals",
    tag = "deals",
    security(("bearer" = [])),
    responses((status = 200, description = "Deals"))
)]
pub async fn list_deals(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<DealListQuery>,
) -> ApiResult<Json<Vec<Deal>>> {
    let deals = if query.mine {
        require_role(&caller, &[UserRole::Business])?;
        state.deal_service.list_business_deals(&caller.id)?
    } else {
        state.deal_service.list_deals(query.status)?
    };
    Ok(Json(deals))
}

#[utoipa::path(
    post,
    path = "/api/v1/deals",
    tag = "deals",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Draft deal created"),
        (status = 403, description = "Not a KYC-approved business")
    )
)]
pub async fn create_deal(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(new_deal): Json<NewDeal>,
) -> ApiResult<(StatusCode, Json<Deal>)> {
    require_role(&caller, &[UserRole::Business])?;
    let deal = state.deal_service.create_deal(&caller.id, new_deal).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

#[utoipa::path(
    get,
    path = "/api/v1/deals/{id}",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Deal"), (status = 404))
)]
pub async fn get_deal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Deal>> {
    Ok(Json(state.deal_service.get_deal(&id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/deals/{id}/publish",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Deal is ACTIVE"),
        (status = 409, description = "Deal is not a draft")
    )
)]
pub async fn publish_deal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Deal>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.deal_service.publish_deal(&caller.id, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/deals/{id}/cancel",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Deal cancelled and investors refunded"))
)]
pub async fn cancel_deal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Deal>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.deal_service.cancel_deal(&caller.id, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/deals/{id}/invest",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Investment recorded"),
        (status = 402, description = "Insufficient wallet balance")
    )
)]
pub async fn invest(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(request): Json<InvestmentRequest>,
) -> ApiResult<(StatusCode, Json<InvestmentResponse>)> {
    require_role(&caller, &[UserRole::Investor])?;
    let outcome = state.deal_service.invest(&caller.id, &id, request).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/deals/{id}/investments",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Investments in the caller's deal"))
)]
pub async fn list_deal_investments(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Investment>>> {
    require_role(&caller, &[UserRole::Business])?;
    let investments = state
        .deal_service
        .list_deal_investments(&caller.id, &id)?;
    Ok(Json(investments))
}

#[utoipa::path(
    get,
    path = "/api/v1/deals/{id}/reports",
    tag = "deals",
    params(("id" = String, Path, description = "Deal id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Revenue reports"))
)]
pub async fn list_deal_reports(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<RevenueReport>>> {
    let viewer = current_user(&state, &caller)?;
    Ok(Json(state.revenue_service.list_reports(&viewer, &id)?))
}

#[utoipa::path(
    get,
    path = "/api/v1/investments",
    tag = "deals",
    security(("bearer" = [])),
    responses((status = 200, description = "The caller's investments"))
)]
pub async fn list_investments(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Investment>>> {
    require_role(&caller, &[UserRole::Investor])?;
    Ok(Json(state.deal_service.list_investments(&caller.id)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deals", get(list_deals).post(create_deal))
        .route("/deals/{id}", get(get_deal))
        .route("/deals/{id}/publish", post(publish_deal))
        .route("/deals/{id}/cancel", post(cancel_deal))
        .route("/deals/{id}/invest", post(invest))
        .route("/deals/{id}/investments", get(list_deal_investments))
        .route("/deals/{id}/reports", get(list_deal_reports))
        .route("/investments", get(list_investments))
}
