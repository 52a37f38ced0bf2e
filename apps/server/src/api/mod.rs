use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    auth::{self, require_session},
    config::Config,
    error::ApiResult,
    main_lib::AppState,
    models::{
        KycReviewRequest, LoginRequest, RegisterRequest, SessionResponse, StatusUpdateRequest,
        TransactionReviewRequest, WebhookAck, XeroCallbackRequest,
    },
};

mod admin;
mod cron;
mod deals;
mod fx;
mod invoices;
mod public;
mod recurring;
mod revenue;
mod users;
mod wallet;
mod webhooks;

#[utoipa::path(get, path = "/api/v1/healthz", tag = "health",
    responses((status = 200, description = "Healthy")))]
pub async fn healthz() -> &'static str {
    "ok"
}

/// Ready once the database answers a read.
#[utoipa::path(get, path = "/api/v1/readyz", tag = "health",
    responses((status = 200, description = "Ready")))]
pub async fn readyz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state.fx_service.list_rates()?;
    Ok("ok")
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Every route under `/api/v1`. Request bodies that are core types are
/// described in prose only.
#[derive(OpenApi)]
#[openapi(
    paths(
        healthz,
        readyz,
        auth::register,
        auth::login,
        auth::me,
        users::submit_kyc,
        wallet::get_wallet,
        wallet::list_transactions,
        wallet::withdraw,
        invoices::list_invoices,
        invoices::create_invoice,
        invoices::get_invoice,
        invoices::update_invoice,
        invoices::delete_invoice,
        invoices::update_status,
        invoices::send_invoice,
        invoices::list_emails,
        recurring::list_templates,
        recurring::create_template,
        recurring::update_template,
        recurring::delete_template,
        deals::list_deals,
        deals::create_deal,
        deals::get_deal,
        deals::publish_deal,
        deals::cancel_deal,
        deals::invest,
        deals::list_deal_investments,
        deals::list_deal_reports,
        deals::list_investments,
        revenue::list_connections,
        revenue::connect,
        revenue::xero_authorize,
        revenue::xero_callback,
        revenue::submit_report,
        revenue::distribute,
        fx::list_rates,
        admin::list_users,
        admin::review_kyc,
        admin::list_flagged,
        admin::review_transaction,
        admin::override_status,
        admin::set_rate,
        public::get_public_invoice,
        public::create_checkout,
        webhooks::yoco_webhook,
        webhooks::paystack_webhook,
        webhooks::inbound_email,
        cron::run_cron
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        SessionResponse,
        WebhookAck,
        StatusUpdateRequest,
        KycReviewRequest,
        TransactionReviewRequest,
        XeroCallbackRequest
    )),
    modifiers(&BearerAuth),
    tags((name = "vuka"))
)]
pub struct ApiDoc;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers(Any)
            .allow_methods(Any)
    };

    let openapi = ApiDoc::openapi();

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .merge(users::router())
        .merge(wallet::router())
        .merge(invoices::router())
        .merge(recurring::router())
        .merge(deals::router())
        .merge(revenue::router())
        .merge(fx::router())
        .merge(admin::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(public::router())
        .merge(webhooks::router())
        .merge(cron::router())
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .route("/openapi.json", get(|| async { Json(openapi) }))
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Loads the full caller record when a handler needs more than id and role.
pub(crate) fn current_user(
    state: &AppState,
    caller: &auth::AuthUser,
) -> ApiResult<vuka_core::users::User> {
    Ok(state.user_service.get_user(&caller.id)?)
}
