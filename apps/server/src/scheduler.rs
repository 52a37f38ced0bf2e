//! Background jobs: recurring invoices, overdue reminders, revenue
//! verification and wallet fund release.
//!
//! The same jobs are exposed through `POST /api/v1/cron/{job}` for external
//! schedulers; the in-process loops only start with `VUKA_SCHEDULER_ENABLED`.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use vuka_core::errors::Result;

use crate::main_lib::AppState;

/// Initial delay before the first run, to let the server finish starting.
const INITIAL_DELAY_SECS: u64 = 30;

const HOURLY_SECS: u64 = 60 * 60;
const DAILY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronJob {
    RecurringInvoices,
    OverdueReminders,
    RevenueVerification,
    ReleaseFunds,
}

impl CronJob {
    pub const ALL: [CronJob; 4] = [
        CronJob::RecurringInvoices,
        CronJob::OverdueReminders,
        CronJob::RevenueVerification,
        CronJob::ReleaseFunds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CronJob::RecurringInvoices => "recurring-invoices",
            CronJob::OverdueReminders => "overdue-reminders",
            CronJob::RevenueVerification => "revenue-verification",
            CronJob::ReleaseFunds => "release-funds",
        }
    }

    fn period(&self) -> Duration {
        match self {
            CronJob::ReleaseFunds => Duration::from_secs(HOURLY_SECS),
            _ => Duration::from_secs(DAILY_SECS),
        }
    }
}

impl FromStr for CronJob {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CronJob::ALL
            .into_iter()
            .find(|job| job.as_str() == s)
            .ok_or_else(|| format!("Unknown job '{}'", s))
    }
}

/// Runs one job to completion and returns its summary as JSON.
pub async fn run_job(state: &AppState, job: CronJob) -> Result<serde_json::Value> {
    let now = Utc::now().naive_utc();
    let summary = match job {
        CronJob::RecurringInvoices => {
            serde_json::to_value(state.recurring_service.run_due(now).await?)?
        }
        CronJob::OverdueReminders => {
            serde_json::to_value(state.invoice_service.mark_overdue_and_remind(now).await?)?
        }
        CronJob::RevenueVerification => {
            serde_json::to_value(state.revenue_service.verify_pending(now).await?)?
        }
        CronJob::ReleaseFunds => {
            serde_json::to_value(state.wallet_service.release_matured_funds(now).await?)?
        }
    };
    info!("Job {} finished: {}", job.as_str(), summary);
    Ok(summary)
}

/// Starts one interval loop per job.
pub fn start_scheduler(state: Arc<AppState>) {
    for job in CronJob::ALL {
        let state = state.clone();
        tokio::spawn(async move {
            info!(
                "Scheduler started for {} (every {}s)",
                job.as_str(),
                job.period().as_secs()
            );
            tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

            // First tick is immediate.
            let mut ticker = interval(job.period());
            loop {
                ticker.tick().await;
                if let Err(e) = run_job(&state, job).await {
                    error!("Job {} failed: {}", job.as_str(), e);
                }
            }
        });
    }
}
