use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::deals::Deal;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevenueProvider {
    BankFeed,
    Xero,
}

crate::text_enum!(RevenueProvider {
    BankFeed => "BANK_FEED",
    Xero => "XERO",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Active,
    Expired,
    Revoked,
}

crate::text_enum!(ConnectionStatus {
    Active => "ACTIVE",
    Expired => "EXPIRED",
    Revoked => "REVOKED",
});

/// Link from a business to a source of verified revenue.
///
/// Token fields hold ciphertext at rest; services decrypt them before handing
/// the connection to a [`super::RevenueSource`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueConnection {
    pub id: String,
    pub user_id: String,
    pub provider: RevenueProvider,
    pub external_account_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<NaiveDateTime>,
    pub status: ConnectionStatus,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRevenueConnection {
    pub provider: RevenueProvider,
    pub external_account_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<NaiveDateTime>,
}

/// Tokens returned by an OAuth code exchange or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
    /// Organisation the tokens are scoped to (Xero tenant id).
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct XeroAuthorization {
    pub url: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportSource {
    Manual,
    BankFeed,
    Xero,
}

crate::text_enum!(ReportSource {
    Manual => "MANUAL",
    BankFeed => "BANK_FEED",
    Xero => "XERO",
});

impl From<RevenueProvider> for ReportSource {
    fn from(provider: RevenueProvider) -> Self {
        match provider {
            RevenueProvider::BankFeed => ReportSource::BankFeed,
            RevenueProvider::Xero => ReportSource::Xero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Discrepancy,
}

crate::text_enum!(VerificationStatus {
    Unverified => "UNVERIFIED",
    Verified => "VERIFIED",
    Discrepancy => "DISCREPANCY",
});

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportingPeriod {
    year: i32,
    month: u32,
}

impl ReportingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(2000..=9999).contains(&year) {
            return Err(Error::invalid_input(format!(
                "Invalid reporting period {}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReportingPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_input(format!("Period '{}' is not YYYY-MM", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        ReportingPeriod::new(year, month)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub id: String,
    pub deal_id: String,
    pub period: String,
    pub reported_revenue: Decimal,
    pub verified_revenue: Option<Decimal>,
    pub source: ReportSource,
    pub verification_status: VerificationStatus,
    pub payout_amount: Option<Decimal>,
    pub distributed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RevenueReport {
    /// Revenue the payout is based on: verified when known, otherwise reported.
    pub fn payout_basis(&self) -> Decimal {
        self.verified_revenue.unwrap_or(self.reported_revenue)
    }

    pub fn ensure_distributable(&self) -> Result<()> {
        if self.distributed_at.is_some() {
            return Err(Error::Conflict(format!(
                "Revenue for {} has already been distributed",
                self.period
            )));
        }
        if self.verification_status == VerificationStatus::Discrepancy {
            return Err(Error::Conflict(format!(
                "Revenue for {} does not match the verified figure",
                self.period
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRevenueReport {
    pub deal_id: String,
    pub period: String,
    pub reported_revenue: Decimal,
}

/// One investor's part of a payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutAllocation {
    pub investment_id: String,
    pub investor_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionPlan {
    pub payout: Decimal,
    pub allocations: Vec<PayoutAllocation>,
    /// The payout reaches the repayment cap.
    pub completes_deal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionOutcome {
    pub report: RevenueReport,
    pub deal: Deal,
    pub allocations: Vec<PayoutAllocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub verified: usize,
    pub discrepancies: usize,
    /// No active connection for the business.
    pub skipped: usize,
    pub failures: usize,
}
