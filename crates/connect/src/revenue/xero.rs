//! Xero accounting: OAuth2 authorization-code flow and Profit & Loss lookups.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use vuka_core::errors::{IntegrationError, Result};
use vuka_core::revenue::{
    AccountingOAuth, OAuthTokens, ReportingPeriod, RevenueConnection, RevenueProvider,
    RevenueSource,
};

use crate::http::{build_client, http_error, parse_response, unexpected};

const SERVICE: &str = "xero";
const AUTHORIZE_URL: &str = "https://login.xero.com/identity/connect/authorize";
const TOKEN_URL: &str = "https://identity.xero.com/connect/token";
const API_URL: &str = "https://api.xero.com";
const SCOPES: &str = "openid profile email accounting.reports.read offline_access";

/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Clone)]
pub struct XeroSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantConnection {
    tenant_id: String,
    #[serde(default)]
    tenant_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportsResponse {
    reports: Vec<Report>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Report {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportRow {
    row_type: String,
    #[serde(default)]
    cells: Vec<ReportCell>,
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReportCell {
    #[serde(default)]
    value: String,
}

/// Finds the "Total Income" summary row of a Profit & Loss report.
fn total_income(report: &Report) -> Option<Decimal> {
    fn search(rows: &[ReportRow]) -> Option<Decimal> {
        for row in rows {
            if row.row_type == "SummaryRow"
                && row
                    .cells
                    .first()
                    .is_some_and(|c| c.value.eq_ignore_ascii_case("Total Income"))
            {
                return row
                    .cells
                    .get(1)
                    .and_then(|c| Decimal::from_str(c.value.replace(',', "").trim()).ok());
            }
            if let Some(found) = search(&row.rows) {
                return Some(found);
            }
        }
        None
    }
    search(&report.rows)
}

fn tokens_from(
    response: TokenResponse,
    now: NaiveDateTime,
    tenant_id: Option<String>,
) -> OAuthTokens {
    OAuthTokens {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        tenant_id,
    }
}

fn needs_refresh(expires_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    expires_at.is_some_and(|at| at - now <= Duration::minutes(REFRESH_MARGIN_MINUTES))
}

pub struct XeroClient {
    client: reqwest::Client,
    settings: XeroSettings,
}

impl XeroClient {
    pub fn new(settings: XeroSettings) -> Result<Self> {
        if settings.client_id.trim().is_empty() || settings.client_secret.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("Xero".to_string()).into());
        }
        Ok(Self {
            client: build_client(SERVICE)?,
            settings,
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        parse_response(SERVICE, response).await
    }

    /// The first organisation the user authorised.
    async fn first_tenant(&self, access_token: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/connections", API_URL))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let tenants: Vec<TenantConnection> = parse_response(SERVICE, response).await?;
        Ok(tenants
            .into_iter()
            .find(|t| t.tenant_type.as_deref().map_or(true, |kind| kind == "ORGANISATION"))
            .map(|t| t.tenant_id))
    }
}

#[async_trait]
impl AccountingOAuth for XeroClient {
    fn authorize_url(&self, state: &str) -> Result<String> {
        if self.settings.redirect_uri.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("Xero redirect URI".to_string()).into());
        }
        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.settings.redirect_uri),
            ])
            .await?;
        let tenant_id = self.first_tenant(&response.access_token).await?;
        if tenant_id.is_none() {
            warn!("Xero authorisation returned no organisation");
        }
        info!("Exchanged Xero authorization code");
        Ok(tokens_from(response, Utc::now().naive_utc(), tenant_id))
    }
}

#[async_trait]
impl RevenueSource for XeroClient {
    fn provider(&self) -> RevenueProvider {
        RevenueProvider::Xero
    }

    async fn refresh_if_needed(
        &self,
        connection: &RevenueConnection,
        now: NaiveDateTime,
    ) -> Result<Option<OAuthTokens>> {
        if !needs_refresh(connection.token_expires_at, now) {
            return Ok(None);
        }
        let refresh_token = connection.refresh_token.as_deref().ok_or_else(|| {
            unexpected(SERVICE, "access token expired and no refresh token is stored")
        })?;
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        debug!("Refreshed Xero token for connection {}", connection.id);
        Ok(Some(tokens_from(
            response,
            now,
            Some(connection.external_account_id.clone()),
        )))
    }

    async fn fetch_monthly_revenue(
        &self,
        connection: &RevenueConnection,
        period: &ReportingPeriod,
    ) -> Result<Decimal> {
        let response = self
            .client
            .get(format!("{}/api.xro/2.0/Reports/ProfitAndLoss", API_URL))
            .bearer_auth(&connection.access_token)
            .header("xero-tenant-id", &connection.external_account_id)
            .header("accept", "application/json")
            .query(&[
                ("fromDate", period.first_day().to_string()),
                ("toDate", period.last_day().to_string()),
            ])
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let body: ReportsResponse = parse_response(SERVICE, response).await?;

        let report = body
            .reports
            .first()
            .ok_or_else(|| unexpected(SERVICE, "Profit and Loss report was empty"))?;
        // A month without income has no summary row.
        let total = total_income(report).unwrap_or(Decimal::ZERO);
        debug!("Xero income for {}: {}", period, total);
        Ok(total)
    }
}
