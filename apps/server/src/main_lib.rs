use std::sync::Arc;

use crate::{auth::AuthManager, auth::hash_password, config::Config, secrets::KeyRing};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use vuka_connect::{
    BankFeedSource, HttpEmailSender, LogEmailSender, PaystackClient, XeroClient, YocoClient,
};
use vuka_core::{
    deals::{DealService, DealServiceTrait},
    fx::{FxService, FxServiceTrait},
    invoices::{InvoiceService, InvoiceServiceTrait},
    notifications::EmailSender,
    payments::{PaymentGatewayClient, PaymentService, PaymentServiceTrait},
    recurring::{RecurringInvoiceService, RecurringInvoiceServiceTrait},
    revenue::{AccountingOAuth, RevenueService, RevenueServiceTrait, RevenueSource},
    users::{UserService, UserServiceTrait},
    wallets::{WalletService, WalletServiceTrait},
};
use vuka_storage_sqlite::{
    db, DealRepository, FxRepository, InvoiceRepository, PaymentRepository,
    RecurringInvoiceRepository, RevenueRepository, UserRepository, WalletRepository,
};

pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub cron_secret: Option<String>,
    pub db_path: String,
    pub user_service: Arc<dyn UserServiceTrait>,
    pub wallet_service: Arc<dyn WalletServiceTrait>,
    pub invoice_service: Arc<dyn InvoiceServiceTrait>,
    pub recurring_service: Arc<dyn RecurringInvoiceServiceTrait>,
    pub payment_service: Arc<dyn PaymentServiceTrait>,
    pub deal_service: Arc<dyn DealServiceTrait>,
    pub revenue_service: Arc<dyn RevenueServiceTrait>,
    pub fx_service: Arc<dyn FxServiceTrait>,
}

pub fn init_tracing() {
    let log_format = std::env::var("VUKA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn email_sender(config: &Config) -> anyhow::Result<Arc<dyn EmailSender>> {
    Ok(match &config.email {
        Some(email) => Arc::new(HttpEmailSender::new(&email.api_key, &email.from)?),
        None => {
            tracing::warn!("EMAIL_API_KEY not set; outgoing email will only be logged");
            Arc::new(LogEmailSender)
        }
    })
}

fn payment_gateways(config: &Config) -> anyhow::Result<Vec<Arc<dyn PaymentGatewayClient>>> {
    let mut gateways: Vec<Arc<dyn PaymentGatewayClient>> = Vec::new();
    if let Some(yoco) = &config.yoco {
        gateways.push(Arc::new(YocoClient::new(
            &yoco.secret_key,
            &yoco.webhook_secret,
        )?));
    }
    if let Some(secret_key) = &config.paystack_secret_key {
        gateways.push(Arc::new(PaystackClient::new(secret_key)?));
    }
    if gateways.is_empty() {
        tracing::warn!("No payment gateway configured; public checkout is disabled");
    }
    Ok(gateways)
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let keys = KeyRing::from_secret(&config.secret_key)?;
    let auth = Arc::new(AuthManager::new(&keys.jwt_secret()?, config.token_ttl));
    let cipher = Arc::new(keys.token_cipher()?);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone())?;

    let user_repository = Arc::new(UserRepository::new(pool.clone(), writer.clone()));
    let wallet_repository = Arc::new(WalletRepository::new(pool.clone(), writer.clone()));
    let invoice_repository = Arc::new(InvoiceRepository::new(pool.clone(), writer.clone()));
    let recurring_repository =
        Arc::new(RecurringInvoiceRepository::new(pool.clone(), writer.clone()));
    let payment_repository = Arc::new(PaymentRepository::new(pool.clone(), writer.clone()));
    let deal_repository = Arc::new(DealRepository::new(pool.clone(), writer.clone()));
    let revenue_repository = Arc::new(RevenueRepository::new(pool.clone(), writer.clone()));
    let fx_repository = Arc::new(FxRepository::new(pool.clone(), writer.clone()));

    let user_service = Arc::new(UserService::new(user_repository.clone()));
    if let Some(admin) = &config.admin {
        let password_hash = hash_password(&admin.password)
            .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {:?}", e))?;
        let admin_user = user_service
            .ensure_admin(&admin.email, password_hash)
            .await?;
        tracing::info!("Admin account ready: {}", admin_user.email);
    }

    let wallet_service = Arc::new(WalletService::new(
        wallet_repository.clone(),
        user_repository.clone(),
    ));

    let invoice_service: Arc<dyn InvoiceServiceTrait> = Arc::new(InvoiceService::new(
        invoice_repository.clone(),
        user_repository.clone(),
        email_sender(config)?,
        config.public_base_url.clone(),
    ));

    let recurring_service = Arc::new(RecurringInvoiceService::new(
        recurring_repository,
        user_repository.clone(),
        invoice_service.clone(),
    ));

    let payment_service = Arc::new(PaymentService::new(
        payment_repository,
        invoice_repository.clone(),
        payment_gateways(config)?,
        config.public_base_url.clone(),
    ));

    let deal_service = Arc::new(DealService::new(
        deal_repository.clone(),
        user_repository.clone(),
    ));

    let mut revenue_sources: Vec<Arc<dyn RevenueSource>> = Vec::new();
    if let Some(feed) = &config.bank_feed {
        revenue_sources.push(Arc::new(BankFeedSource::new(&feed.api_url, &feed.api_key)?));
    }
    let mut xero_oauth: Option<Arc<dyn AccountingOAuth>> = None;
    if let Some(settings) = &config.xero {
        let xero = Arc::new(XeroClient::new(settings.clone())?);
        revenue_sources.push(xero.clone());
        xero_oauth = Some(xero);
    }
    let revenue_service = Arc::new(RevenueService::new(
        revenue_repository,
        deal_repository,
        revenue_sources,
        xero_oauth,
        cipher,
    ));

    let fx_service = Arc::new(FxService::new(fx_repository));

    Ok(Arc::new(AppState {
        auth,
        cron_secret: config.cron_secret.clone(),
        db_path,
        user_service,
        wallet_service,
        invoice_service,
        recurring_service,
        payment_service,
        deal_service,
        revenue_service,
        fx_service,
    }))
}
