//! Request and response bodies that are not plain core types.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use vuka_core::{
    deals::{Deal, DealStatus, Investment, InvestmentOutcome},
    invoices::{Invoice, InvoiceStatus, TransitionOutcome},
    users::{User, UserRole},
    wallets::Transaction,
};

#[derive(Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[schema(value_type = String, example = "BUSINESS")]
    pub role: UserRole,
    pub full_name: String,
    pub business_name: Option<String>,
    pub vat_number: Option<String>,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[schema(value_type = Object)]
    pub user: User,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct StatusUpdateRequest {
    #[schema(value_type = String, example = "PAID")]
    pub status: InvoiceStatus,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct KycReviewRequest {
    pub approved: bool,
}

#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
pub struct TransactionReviewRequest {
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct XeroCallbackRequest {
    pub code: String,
    pub state: String,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    #[param(value_type = Option<String>, example = "SENT")]
    pub status: Option<InvoiceStatus>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct DealListQuery {
    /// Defaults to ACTIVE.
    #[param(value_type = Option<String>, example = "ACTIVE")]
    pub status: Option<DealStatus>,
    /// Business accounts can list their own deals in every status.
    #[serde(default)]
    pub mine: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct TransitionResponse {
    pub invoice: Invoice,
    pub transaction: Option<Transaction>,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            invoice: outcome.invoice,
            transaction: outcome.transaction,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct InvestmentResponse {
    pub investment: Investment,
    pub deal: Deal,
    pub transaction: Transaction,
}

impl From<InvestmentOutcome> for InvestmentResponse {
    fn from(outcome: InvestmentOutcome) -> Self {
        Self {
            investment: outcome.investment,
            deal: outcome.deal,
            transaction: outcome.transaction,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct CronRunResponse {
    pub job: String,
    pub result: serde_json::Value,
}
