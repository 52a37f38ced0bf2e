//! Database models for revenue connections and monthly reports.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::revenue::{RevenueConnection, RevenueReport};
use vuka_core::{Error, Result};

use crate::utils::{parse_decimal, parse_optional_decimal, parse_text};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::revenue_connections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RevenueConnectionDB {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub external_account_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<NaiveDateTime>,
    pub status: String,
    pub last_synced_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<RevenueConnectionDB> for RevenueConnection {
    type Error = Error;

    fn try_from(db: RevenueConnectionDB) -> Result<Self> {
        Ok(Self {
            provider: parse_text(&db.provider, "revenue_connections.provider")?,
            status: parse_text(&db.status, "revenue_connections.status")?,
            id: db.id,
            user_id: db.user_id,
            external_account_id: db.external_account_id,
            access_token: db.access_token,
            refresh_token: db.refresh_token,
            token_expires_at: db.token_expires_at,
            last_synced_at: db.last_synced_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::revenue_reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RevenueReportDB {
    pub id: String,
    pub deal_id: String,
    pub period: String,
    pub reported_revenue: String,
    pub verified_revenue: Option<String>,
    pub source: String,
    pub verification_status: String,
    pub payout_amount: Option<String>,
    pub distributed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<RevenueReportDB> for RevenueReport {
    type Error = Error;

    fn try_from(db: RevenueReportDB) -> Result<Self> {
        Ok(Self {
            reported_revenue: parse_decimal(
                &db.reported_revenue,
                "revenue_reports.reported_revenue",
            )?,
            verified_revenue: parse_optional_decimal(
                db.verified_revenue.as_deref(),
                "revenue_reports.verified_revenue",
            )?,
            source: parse_text(&db.source, "revenue_reports.source")?,
            verification_status: parse_text(
                &db.verification_status,
                "revenue_reports.verification_status",
            )?,
            payout_amount: parse_optional_decimal(
                db.payout_amount.as_deref(),
                "revenue_reports.payout_amount",
            )?,
            id: db.id,
            deal_id: db.deal_id,
            period: db.period,
            distributed_at: db.distributed_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
