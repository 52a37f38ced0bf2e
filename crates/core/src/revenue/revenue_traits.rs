use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::revenue_model::{
    ConnectionStatus, DistributionOutcome, NewRevenueConnection, NewRevenueReport, OAuthTokens,
    ReportSource, ReportingPeriod, RevenueConnection, RevenueProvider, RevenueReport,
    VerificationStatus, VerificationSummary, XeroAuthorization,
};
use crate::errors::Result;
use crate::users::User;

/// A provider that can tell how much revenue a business made in a month.
///
/// Connections passed in carry decrypted tokens.
#[async_trait]
pub trait RevenueSource: Send + Sync {
    fn provider(&self) -> RevenueProvider;

    /// Returns fresh tokens when the stored ones are about to expire.
    async fn refresh_if_needed(
        &self,
        _connection: &RevenueConnection,
        _now: NaiveDateTime,
    ) -> Result<Option<OAuthTokens>> {
        Ok(None)
    }

    async fn fetch_monthly_revenue(
        &self,
        connection: &RevenueConnection,
        period: &ReportingPeriod,
    ) -> Result<Decimal>;
}

/// OAuth authorization-code flow for an accounting provider.
#[async_trait]
pub trait AccountingOAuth: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str) -> Result<OAuthTokens>;
}

/// Trait defining the contract for revenue persistence.
#[async_trait]
pub trait RevenueRepositoryTrait: Send + Sync {
    /// Tokens must already be encrypted.
    async fn create_connection(
        &self,
        user_id: &str,
        connection: NewRevenueConnection,
    ) -> Result<RevenueConnection>;

    fn list_connections(&self, user_id: &str) -> Result<Vec<RevenueConnection>>;

    /// Most recently created active connection for the user.
    fn find_active_connection(&self, user_id: &str) -> Result<Option<RevenueConnection>>;

    /// Tokens must already be encrypted.
    async fn update_connection_tokens(
        &self,
        connection_id: &str,
        tokens: OAuthTokens,
        now: NaiveDateTime,
    ) -> Result<()>;

    async fn set_connection_status(
        &self,
        connection_id: &str,
        status: ConnectionStatus,
        now: NaiveDateTime,
    ) -> Result<()>;

    async fn mark_connection_synced(&self, connection_id: &str, now: NaiveDateTime)
        -> Result<()>;

    async fn create_report(
        &self,
        report: NewRevenueReport,
        source: ReportSource,
    ) -> Result<RevenueReport>;

    fn get_report(&self, report_id: &str) -> Result<RevenueReport>;

    fn list_reports_for_deal(&self, deal_id: &str) -> Result<Vec<RevenueReport>>;

    fn list_unverified_reports(&self) -> Result<Vec<RevenueReport>>;

    async fn set_verification(
        &self,
        report_id: &str,
        verified_revenue: Decimal,
        status: VerificationStatus,
        now: NaiveDateTime,
    ) -> Result<RevenueReport>;

    /// Pays a report out to investors in one transaction.
    async fn distribute(&self, report_id: &str, now: NaiveDateTime)
        -> Result<DistributionOutcome>;
}

/// Trait defining the contract for revenue service operations.
#[async_trait]
pub trait RevenueServiceTrait: Send + Sync {
    async fn connect(
        &self,
        user_id: &str,
        connection: NewRevenueConnection,
    ) -> Result<RevenueConnection>;

    fn list_connections(&self, user_id: &str) -> Result<Vec<RevenueConnection>>;

    fn xero_authorize(&self, user_id: &str) -> Result<XeroAuthorization>;

    async fn xero_callback(&self, user_id: &str, code: &str, state: &str)
        -> Result<RevenueConnection>;

    async fn submit_report(&self, business_id: &str, report: NewRevenueReport)
        -> Result<RevenueReport>;

    /// Reports for a deal, visible to its business, its investors and admins.
    fn list_reports(&self, viewer: &User, deal_id: &str) -> Result<Vec<RevenueReport>>;

    /// Pays out a report. The caller must own the deal or be an admin.
    async fn distribute(&self, viewer: &User, report_id: &str) -> Result<DistributionOutcome>;

    async fn verify_pending(&self, now: NaiveDateTime) -> Result<VerificationSummary>;
}
