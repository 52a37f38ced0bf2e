use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use vuka_connect::XeroSettings;

#[derive(Debug, Clone)]
pub struct YocoConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct BankFeedConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Master secret; signing and encryption keys are derived from it.
    pub secret_key: String,
    pub token_ttl: Duration,
    pub public_base_url: String,
    /// Bearer token for `/cron/*`. Cron routes answer 404 when unset.
    pub cron_secret: Option<String>,
    pub scheduler_enabled: bool,
    pub yoco: Option<YocoConfig>,
    pub paystack_secret_key: Option<String>,
    pub email: Option<EmailConfig>,
    pub bank_feed: Option<BankFeedConfig>,
    pub xero: Option<XeroSettings>,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let pair = |a: &str, b: &str| get(a).zip(get(b));

        let listen_addr: SocketAddr = get("VUKA_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid VUKA_LISTEN_ADDR")?;
        let db_path = get("VUKA_DB_PATH").unwrap_or_else(|| "./db/app.db".into());
        let cors_allow = get("VUKA_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = get("VUKA_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30000);
        let secret_key = get("VUKA_SECRET_KEY").context("VUKA_SECRET_KEY must be set")?;
        let ttl_minutes: u64 = get("VUKA_TOKEN_TTL_MINUTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1440);
        let public_base_url = get("VUKA_PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        let scheduler_enabled = get("VUKA_SCHEDULER_ENABLED")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            secret_key,
            token_ttl: Duration::from_secs(ttl_minutes * 60),
            public_base_url,
            cron_secret: get("CRON_SECRET"),
            scheduler_enabled,
            yoco: pair("YOCO_SECRET_KEY", "YOCO_WEBHOOK_SECRET").map(
                |(secret_key, webhook_secret)| YocoConfig {
                    secret_key,
                    webhook_secret,
                },
            ),
            paystack_secret_key: get("PAYSTACK_SECRET_KEY"),
            email: pair("EMAIL_API_KEY", "EMAIL_FROM")
                .map(|(api_key, from)| EmailConfig { api_key, from }),
            bank_feed: pair("BANK_FEED_API_URL", "BANK_FEED_API_KEY")
                .map(|(api_url, api_key)| BankFeedConfig { api_url, api_key }),
            xero: pair("XERO_CLIENT_ID", "XERO_CLIENT_SECRET").map(|(client_id, client_secret)| {
                XeroSettings {
                    client_id,
                    client_secret,
                    redirect_uri: get("XERO_REDIRECT_URI").unwrap_or_default(),
                }
            }),
            admin: pair("VUKA_ADMIN_EMAIL", "VUKA_ADMIN_PASSWORD")
                .map(|(email, password)| AdminSeed { email, password }),
        })
    }
}
