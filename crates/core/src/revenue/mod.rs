//! Revenue module - revenue connections, monthly reports and revenue-share payouts.

mod revenue_model;
mod revenue_service;
pub mod revenue_share;
mod revenue_traits;

#[cfg(test)]
mod revenue_service_tests;

pub use revenue_model::{
    ConnectionStatus, DistributionOutcome, DistributionPlan, NewRevenueConnection,
    NewRevenueReport, OAuthTokens, PayoutAllocation, ReportSource, ReportingPeriod,
    RevenueConnection, RevenueProvider, RevenueReport, VerificationStatus, VerificationSummary,
    XeroAuthorization,
};
pub use revenue_service::RevenueService;
pub use revenue_share::{
    compute_payout, compute_share_percentages, plan_distribution, split_payout, within_tolerance,
};
pub use revenue_traits::{
    AccountingOAuth, RevenueRepositoryTrait, RevenueServiceTrait, RevenueSource,
};
