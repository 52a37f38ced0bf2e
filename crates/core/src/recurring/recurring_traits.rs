use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::recurring_model::{
    GeneratedOccurrence, NewRecurringInvoice, RecurringInvoice, RecurringInvoiceUpdate,
    RecurringRunSummary,
};
use crate::errors::Result;
use crate::invoices::Invoice;

/// Trait defining the contract for recurring-invoice persistence.
#[async_trait]
pub trait RecurringInvoiceRepositoryTrait: Send + Sync {
    async fn create(
        &self,
        user_id: &str,
        template: NewRecurringInvoice,
        currency: String,
    ) -> Result<RecurringInvoice>;

    async fn update(
        &self,
        template_id: &str,
        update: RecurringInvoiceUpdate,
        currency: String,
    ) -> Result<RecurringInvoice>;

    async fn delete(&self, template_id: &str) -> Result<()>;

    fn get_by_id(&self, template_id: &str) -> Result<RecurringInvoice>;

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringInvoice>>;

    /// Active templates with `next_run_date <= today`.
    fn list_due(&self, today: NaiveDate) -> Result<Vec<RecurringInvoice>>;

    /// Inserts the invoice and advances the template in one transaction.
    ///
    /// Returns `None` without writing when the template's `next_run_date` no
    /// longer equals `expected_run_date`.
    async fn generate_occurrence(&self, occurrence: GeneratedOccurrence)
        -> Result<Option<Invoice>>;

    async fn deactivate(&self, template_id: &str, now: NaiveDateTime) -> Result<()>;
}

/// Trait defining the contract for recurring-invoice service operations.
#[async_trait]
pub trait RecurringInvoiceServiceTrait: Send + Sync {
    async fn create_template(
        &self,
        user_id: &str,
        template: NewRecurringInvoice,
    ) -> Result<RecurringInvoice>;

    async fn update_template(
        &self,
        user_id: &str,
        template_id: &str,
        update: RecurringInvoiceUpdate,
    ) -> Result<RecurringInvoice>;

    async fn delete_template(&self, user_id: &str, template_id: &str) -> Result<()>;

    fn list_templates(&self, user_id: &str) -> Result<Vec<RecurringInvoice>>;

    /// Generates every occurrence due on or before the business date of `now`.
    async fn run_due(&self, now: NaiveDateTime) -> Result<RecurringRunSummary>;
}
