use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use super::revenue_model::{
    DistributionOutcome, NewRevenueConnection, NewRevenueReport, OAuthTokens, ReportSource,
    ReportingPeriod, RevenueConnection, RevenueProvider, RevenueReport, VerificationStatus,
    VerificationSummary, XeroAuthorization,
};
use super::revenue_share::within_tolerance;
use super::revenue_traits::{
    AccountingOAuth, RevenueRepositoryTrait, RevenueServiceTrait, RevenueSource,
};
use crate::constants::REVENUE_TOLERANCE_PERCENT;
use crate::deals::{Deal, DealRepositoryTrait, DealStatus};
use crate::errors::{Error, IntegrationError, Result};
use crate::secrets::TokenCipher;
use crate::users::{User, UserRole};
use crate::utils::money::round_money;
use crate::utils::time_utils::business_date_from_utc;

pub struct RevenueService {
    repository: Arc<dyn RevenueRepositoryTrait>,
    deals: Arc<dyn DealRepositoryTrait>,
    sources: HashMap<RevenueProvider, Arc<dyn RevenueSource>>,
    xero_oauth: Option<Arc<dyn AccountingOAuth>>,
    cipher: Arc<dyn TokenCipher>,
}

impl RevenueService {
    pub fn new(
        repository: Arc<dyn RevenueRepositoryTrait>,
        deals: Arc<dyn DealRepositoryTrait>,
        sources: Vec<Arc<dyn RevenueSource>>,
        xero_oauth: Option<Arc<dyn AccountingOAuth>>,
        cipher: Arc<dyn TokenCipher>,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.provider(), source))
            .collect();
        Self {
            repository,
            deals,
            sources,
            xero_oauth,
            cipher,
        }
    }

    fn xero(&self) -> Result<&Arc<dyn AccountingOAuth>> {
        self.xero_oauth
            .as_ref()
            .ok_or_else(|| IntegrationError::NotConfigured("Xero".to_string()).into())
    }

    fn encrypt_tokens(&self, tokens: OAuthTokens) -> Result<OAuthTokens> {
        Ok(OAuthTokens {
            access_token: self.cipher.encrypt(&tokens.access_token)?,
            refresh_token: tokens
                .refresh_token
                .as_deref()
                .map(|t| self.cipher.encrypt(t))
                .transpose()?,
            expires_at: tokens.expires_at,
            tenant_id: tokens.tenant_id,
        })
    }

    fn decrypt_connection(&self, mut connection: RevenueConnection) -> Result<RevenueConnection> {
        connection.access_token = self.cipher.decrypt(&connection.access_token)?;
        connection.refresh_token = connection
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.decrypt(t))
            .transpose()?;
        Ok(connection)
    }

    fn owned_deal(&self, business_id: &str, deal_id: &str) -> Result<Deal> {
        let deal = self.deals.get_by_id(deal_id)?;
        if deal.business_id != business_id {
            return Err(Error::Forbidden(format!(
                "Deal {} belongs to another business",
                deal_id
            )));
        }
        Ok(deal)
    }

    fn can_view_deal(&self, viewer: &User, deal: &Deal) -> Result<bool> {
        Ok(match viewer.role {
            UserRole::Admin => true,
            UserRole::Business => deal.business_id == viewer.id,
            UserRole::Investor => self
                .deals
                .list_investments_for_deal(&deal.id)?
                .iter()
                .any(|i| i.investor_id == viewer.id),
        })
    }

    /// Fetches verified revenue for one report. `Ok(None)` means no usable connection.
    async fn verify_report(
        &self,
        report: &RevenueReport,
        now: NaiveDateTime,
    ) -> Result<Option<VerificationStatus>> {
        let deal = self.deals.get_by_id(&report.deal_id)?;
        let Some(stored) = self.repository.find_active_connection(&deal.business_id)? else {
            return Ok(None);
        };
        let Some(source) = self.sources.get(&stored.provider) else {
            debug!("No revenue source configured for {}", stored.provider);
            return Ok(None);
        };

        let mut connection = self.decrypt_connection(stored)?;
        if let Some(tokens) = source.refresh_if_needed(&connection, now).await? {
            connection.access_token = tokens.access_token.clone();
            if tokens.refresh_token.is_some() {
                connection.refresh_token = tokens.refresh_token.clone();
            }
            connection.token_expires_at = tokens.expires_at;
            self.repository
                .update_connection_tokens(&connection.id, self.encrypt_tokens(tokens)?, now)
                .await?;
            debug!("Refreshed tokens for connection {}", connection.id);
        }

        let period: ReportingPeriod = report.period.parse()?;
        let verified = round_money(source.fetch_monthly_revenue(&connection, &period).await?);
        let status = if within_tolerance(report.reported_revenue, verified, REVENUE_TOLERANCE_PERCENT)
        {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Discrepancy
        };
        self.repository
            .set_verification(&report.id, verified, status, now)
            .await?;
        self.repository
            .mark_connection_synced(&connection.id, now)
            .await?;
        Ok(Some(status))
    }
}

#[async_trait]
impl RevenueServiceTrait for RevenueService {
    async fn connect(
        &self,
        user_id: &str,
        connection: NewRevenueConnection,
    ) -> Result<RevenueConnection> {
        if connection.external_account_id.trim().is_empty() {
            return Err(Error::invalid_input("External account id is required"));
        }
        if connection.access_token.trim().is_empty() {
            return Err(Error::invalid_input("Access token is required"));
        }
        let encrypted = NewRevenueConnection {
            access_token: self.cipher.encrypt(&connection.access_token)?,
            refresh_token: connection
                .refresh_token
                .as_deref()
                .map(|t| self.cipher.encrypt(t))
                .transpose()?,
            ..connection
        };
        let created = self.repository.create_connection(user_id, encrypted).await?;
        info!(
            "User {} connected {} account {}",
            user_id, created.provider, created.external_account_id
        );
        Ok(created)
    }

    fn list_connections(&self, user_id: &str) -> Result<Vec<RevenueConnection>> {
        self.repository.list_connections(user_id)
    }

    fn xero_authorize(&self, user_id: &str) -> Result<XeroAuthorization> {
        let state = format!("{}:{}", user_id, uuid::Uuid::new_v4().simple());
        let url = self.xero()?.authorize_url(&state)?;
        Ok(XeroAuthorization { url, state })
    }

    async fn xero_callback(
        &self,
        user_id: &str,
        code: &str,
        state: &str,
    ) -> Result<RevenueConnection> {
        let state_user = state.split_once(':').map(|(user, _)| user);
        if state_user != Some(user_id) {
            return Err(Error::Forbidden(
                "OAuth state does not belong to this user".to_string(),
            ));
        }
        let tokens = self.xero()?.exchange_code(code).await?;
        let tenant_id = tokens.tenant_id.clone().ok_or_else(|| {
            IntegrationError::UnexpectedResponse {
                service: "Xero".to_string(),
                message: "no organisation was authorised".to_string(),
            }
        })?;
        self.connect(
            user_id,
            NewRevenueConnection {
                provider: RevenueProvider::Xero,
                external_account_id: tenant_id,
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                token_expires_at: tokens.expires_at,
            },
        )
        .await
    }

    async fn submit_report(
        &self,
        business_id: &str,
        mut report: NewRevenueReport,
    ) -> Result<RevenueReport> {
        let deal = self.owned_deal(business_id, &report.deal_id)?;
        if deal.status != DealStatus::Funded {
            return Err(Error::Conflict(format!(
                "Revenue can only be reported for funded deals; '{}' is {}",
                deal.title, deal.status
            )));
        }
        if report.reported_revenue < Decimal::ZERO {
            return Err(Error::invalid_input("Revenue cannot be negative"));
        }
        let period: ReportingPeriod = report.period.parse()?;
        let current = ReportingPeriod::containing(business_date_from_utc(Utc::now()));
        if period > current {
            return Err(Error::invalid_input(format!(
                "Cannot report revenue for future period {}",
                period
            )));
        }
        report.period = period.to_string();
        report.reported_revenue = round_money(report.reported_revenue);

        let created = self
            .repository
            .create_report(report, ReportSource::Manual)
            .await?;
        info!(
            "Revenue of {} reported for deal {} period {}",
            created.reported_revenue, created.deal_id, created.period
        );
        Ok(created)
    }

    fn list_reports(&self, viewer: &User, deal_id: &str) -> Result<Vec<RevenueReport>> {
        let deal = self.deals.get_by_id(deal_id)?;
        if !self.can_view_deal(viewer, &deal)? {
            return Err(Error::Forbidden(
                "You do not have access to this deal's reports".to_string(),
            ));
        }
        self.repository.list_reports_for_deal(deal_id)
    }

    async fn distribute(&self, viewer: &User, report_id: &str) -> Result<DistributionOutcome> {
        let report = self.repository.get_report(report_id)?;
        let deal = self.deals.get_by_id(&report.deal_id)?;
        let allowed = viewer.role == UserRole::Admin || deal.business_id == viewer.id;
        if !allowed {
            return Err(Error::Forbidden(
                "Only the deal's business can distribute revenue".to_string(),
            ));
        }
        report.ensure_distributable()?;

        let outcome = self
            .repository
            .distribute(report_id, Utc::now().naive_utc())
            .await?;
        info!(
            "Distributed {} to {} investors for deal {} ({})",
            outcome.report.payout_amount.unwrap_or_default(),
            outcome.allocations.len(),
            outcome.deal.id,
            outcome.report.period
        );
        if outcome.deal.status == DealStatus::Completed {
            info!("Deal {} reached its repayment cap", outcome.deal.id);
        }
        Ok(outcome)
    }

    async fn verify_pending(&self, now: NaiveDateTime) -> Result<VerificationSummary> {
        let mut summary = VerificationSummary::default();
        for report in self.repository.list_unverified_reports()? {
            match self.verify_report(&report, now).await {
                Ok(Some(VerificationStatus::Verified)) => summary.verified += 1,
                Ok(Some(_)) => {
                    warn!(
                        "Revenue discrepancy for deal {} period {}",
                        report.deal_id, report.period
                    );
                    summary.discrepancies += 1;
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!(
                        "Revenue verification failed for report {}: {}",
                        report.id, e
                    );
                    summary.failures += 1;
                }
            }
        }
        info!(
            "Revenue verification: {} verified, {} discrepancies, {} skipped, {} failures",
            summary.verified, summary.discrepancies, summary.skipped, summary.failures
        );
        Ok(summary)
    }
}
