use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use vuka_core::{
    recurring::{NewRecurringInvoice, RecurringInvoice, RecurringInvoiceUpdate},
    users::UserRole,
};

use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/recurring-invoices",
    tag = "recurring",
    security(("bearer" = [])),
    responses((status = 200, description = "Recurring invoice templates"))
)]
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Vec<RecurringInvoice>>> {
    require_role(&caller, &[UserRole::Business])?;
    Ok(Json(state.recurring_service.list_templates(&caller.id)?))
}

#[utoipa::path(
    post,
    path = "/api/v1/recurring-invoices",
    tag = "recurring",
    security(("bearer" = [])),
    responses((status = 201, description = "Template created"))
)]
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(template): Json<NewRecurringInvoice>,
) -> ApiResult<(StatusCode, Json<RecurringInvoice>)> {
    require_role(&caller, &[UserRole::Business])?;
    let created = state
        .recurring_service
        .create_template(&caller.id, template)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/recurring-invoices/{id}",
    tag = "recurring",
    params(("id" = String, Path, description = "Template id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Template updated"))
)]
pub async fn update_template(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(update): Json<RecurringInvoiceUpdate>,
) -> ApiResult<Json<RecurringInvoice>> {
    require_role(&caller, &[UserRole::Business])?;
    let updated = state
        .recurring_service
        .update_template(&caller.id, &id, update)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/recurring-invoices/{id}",
    tag = "recurring",
    params(("id" = String, Path, description = "Template id")),
    security(("bearer" = [])),
    responses((status = 204))
)]
pub async fn delete_template(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    require_role(&caller, &[UserRole::Business])?;
    state
        .recurring_service
        .delete_template(&caller.id, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recurring-invoices",
            get(list_templates).post(create_template),
        )
        .route(
            "/recurring-invoices/{id}",
            put(update_template).delete(delete_template),
        )
}
