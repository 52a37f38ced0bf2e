use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::post,
    Json, Router,
};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::CronRunResponse,
    scheduler::{run_job, CronJob},
};

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("Bearer")
        .then(|| token.trim())
}

#[utoipa::path(
    post,
    path = "/api/v1/cron/{job}",
    tag = "cron",
    params(("job" = String, Path, description = "Job name, e.g. recurring-invoices")),
    responses(
        (status = 200, description = "Job summary"),
        (status = 401, description = "Bad cron secret"),
        (status = 404, description = "Unknown job or cron disabled")
    )
)]
pub async fn run_cron(
    Path(job): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<CronRunResponse>> {
    // Cron routes do not exist without a configured secret.
    let Some(secret) = state.cron_secret.as_deref() else {
        return Err(ApiError::NotFound);
    };
    if bearer(&headers) != Some(secret) {
        return Err(ApiError::Unauthorized("Invalid cron secret".to_string()));
    }
    let job: CronJob = job.parse().map_err(|_| ApiError::NotFound)?;
    let result = run_job(&state, job).await?;
    Ok(Json(CronRunResponse {
        job: job.as_str().to_string(),
        result,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cron/{job}", post(run_cron))
}
