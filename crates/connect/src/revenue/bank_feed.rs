use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;

use vuka_core::errors::{IntegrationError, Result};
use vuka_core::revenue::{ReportingPeriod, RevenueConnection, RevenueProvider, RevenueSource};

use crate::http::{build_client, http_error, parse_response};

const SERVICE: &str = "bank-feed";

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<FeedTransaction>,
}

#[derive(Debug, Deserialize)]
struct FeedTransaction {
    amount: Decimal,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    date: Option<NaiveDate>,
}

/// Money in: credits with a positive amount inside the period.
fn total_credits(transactions: &[FeedTransaction], period: &ReportingPeriod) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.kind.eq_ignore_ascii_case("CREDIT") && t.amount > Decimal::ZERO)
        .filter(|t| {
            t.date
                .map(|d| d >= period.first_day() && d <= period.last_day())
                .unwrap_or(true)
        })
        .map(|t| t.amount)
        .sum()
}

/// Aggregator that exposes a business bank account's transactions.
///
/// The connection's `external_account_id` is the feed's account id and its
/// `access_token` the account-holder consent token.
pub struct BankFeedSource {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl BankFeedSource {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        let api_key = api_key.into();
        if api_url.trim().is_empty() || api_key.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("bank feed".to_string()).into());
        }
        Ok(Self {
            client: build_client(SERVICE)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl RevenueSource for BankFeedSource {
    fn provider(&self) -> RevenueProvider {
        RevenueProvider::BankFeed
    }

    async fn fetch_monthly_revenue(
        &self,
        connection: &RevenueConnection,
        period: &ReportingPeriod,
    ) -> Result<Decimal> {
        let url = format!(
            "{}/accounts/{}/transactions",
            self.api_url,
            urlencoding::encode(&connection.external_account_id)
        );
        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .bearer_auth(&connection.access_token)
            .query(&[
                ("from", period.first_day().to_string()),
                ("to", period.last_day().to_string()),
            ])
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let body: TransactionsResponse = parse_response(SERVICE, response).await?;

        let total = total_credits(&body.transactions, period);
        debug!(
            "Bank feed {} credits for {}: {} across {} transactions",
            connection.external_account_id,
            period,
            total,
            body.transactions.len()
        );
        Ok(total)
    }
}
