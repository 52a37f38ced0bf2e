use std::sync::Arc;

use axum::{extract::State, routing::post, Extension, Json, Router};
use vuka_core::users::{KycSubmission, User, UserRole};

use crate::{
    auth::{require_role, AuthUser},
    error::ApiResult,
    main_lib::AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/kyc",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, description = "User with KYC pending"))
)]
pub async fn submit_kyc(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(submission): Json<KycSubmission>,
) -> ApiResult<Json<User>> {
    require_role(&caller, &[UserRole::Business, UserRole::Investor])?;
    let user = state.user_service.submit_kyc(&caller.id, submission).await?;
    Ok(Json(user))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/kyc", post(submit_kyc))
}
