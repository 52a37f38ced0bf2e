use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use vuka_core::fx::ExchangeRate;

use crate::{error::ApiResult, main_lib::AppState};

#[utoipa::path(
    get,
    path = "/api/v1/exchange-rates",
    tag = "fx",
    security(("bearer" = [])),
    responses((status = 200, description = "Stored exchange rates"))
)]
pub async fn list_rates(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<ExchangeRate>>> {
    Ok(Json(state.fx_service.list_rates()?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/exchange-rates", get(list_rates))
}
