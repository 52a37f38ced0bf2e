use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::recurring_model::{
    GeneratedOccurrence, NewRecurringInvoice, RecurringInvoice, RecurringInvoiceUpdate,
    RecurringRunSummary,
};
use super::recurring_traits::{RecurringInvoiceRepositoryTrait, RecurringInvoiceServiceTrait};
use crate::constants::{DEFAULT_CURRENCY, DEFAULT_VAT_RATE};
use crate::errors::{Error, Result};
use crate::fx::normalize_currency_code;
use crate::invoices::{compute_lines, InvoiceServiceTrait};
use crate::users::{User, UserRepositoryTrait, UserRole};
use crate::utils::time_utils::business_date_from_utc;

/// Upper bound on catch-up occurrences per template in one run.
const MAX_OCCURRENCES_PER_RUN: usize = 12;

pub struct RecurringInvoiceService {
    repository: Arc<dyn RecurringInvoiceRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    invoices: Arc<dyn InvoiceServiceTrait>,
}

impl RecurringInvoiceService {
    pub fn new(
        repository: Arc<dyn RecurringInvoiceRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        invoices: Arc<dyn InvoiceServiceTrait>,
    ) -> Self {
        Self {
            repository,
            users,
            invoices,
        }
    }

    fn business(&self, user_id: &str) -> Result<User> {
        let user = self.users.get_by_id(user_id)?;
        if user.role != UserRole::Business {
            return Err(Error::Forbidden(
                "Only business accounts can issue invoices".to_string(),
            ));
        }
        Ok(user)
    }

    fn vat_rate(user: &User) -> Decimal {
        if user.vat_number.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            DEFAULT_VAT_RATE
        } else {
            Decimal::ZERO
        }
    }

    fn owned(&self, user_id: &str, template_id: &str) -> Result<RecurringInvoice> {
        let template = self.repository.get_by_id(template_id)?;
        if template.user_id != user_id {
            return Err(Error::NotFound(format!(
                "Recurring invoice {}",
                template_id
            )));
        }
        Ok(template)
    }

    fn prepare(&self, user: &User, template: &NewRecurringInvoice) -> Result<String> {
        template.validate()?;
        compute_lines(&template.items, Self::vat_rate(user))?;
        normalize_currency_code(template.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))
    }

    /// Generates every due occurrence of one template.
    async fn run_template(
        &self,
        template: RecurringInvoice,
        now: NaiveDateTime,
        summary: &mut RecurringRunSummary,
    ) -> Result<()> {
        let today = business_date_from_utc(now.and_utc());
        let user = self.users.get_by_id(&template.user_id)?;
        let vat_rate = Self::vat_rate(&user);

        let mut run_date = template.next_run_date;
        for _ in 0..MAX_OCCURRENCES_PER_RUN {
            if run_date > today {
                break;
            }
            if template.is_past_end(run_date) {
                self.repository.deactivate(&template.id, now).await?;
                summary.deactivated += 1;
                break;
            }

            let next_run_date = template.run_after(run_date);
            let mut draft = template.build_draft(run_date);
            draft.validate(DEFAULT_CURRENCY)?;
            let (lines, totals) = compute_lines(&draft.items, vat_rate)?;
            let deactivate = template.is_past_end(next_run_date);

            let generated = self
                .repository
                .generate_occurrence(GeneratedOccurrence {
                    template_id: template.id.clone(),
                    expected_run_date: run_date,
                    next_run_date,
                    deactivate,
                    draft,
                    lines,
                    totals,
                    now,
                })
                .await?;

            let Some(invoice) = generated else {
                debug!(
                    "Recurring invoice {} for {} was already generated",
                    template.id, run_date
                );
                summary.skipped += 1;
                break;
            };
            summary.generated += 1;
            info!(
                "Generated invoice {} from recurring template {} for {}",
                invoice.invoice_number, template.id, run_date
            );

            if template.auto_send {
                match self
                    .invoices
                    .send_invoice(&template.user_id, &invoice.id)
                    .await
                {
                    Ok(_) => summary.sent += 1,
                    Err(e) => {
                        warn!("Failed to send invoice {}: {}", invoice.invoice_number, e);
                        summary.failures += 1;
                    }
                }
            }

            if deactivate {
                summary.deactivated += 1;
                break;
            }
            run_date = next_run_date;
        }
        Ok(())
    }
}

#[async_trait]
impl RecurringInvoiceServiceTrait for RecurringInvoiceService {
    async fn create_template(
        &self,
        user_id: &str,
        template: NewRecurringInvoice,
    ) -> Result<RecurringInvoice> {
        let user = self.business(user_id)?;
        let currency = self.prepare(&user, &template)?;
        let created = self.repository.create(user_id, template, currency).await?;
        info!(
            "Created {} recurring invoice {} for user {}",
            created.frequency, created.id, user_id
        );
        Ok(created)
    }

    async fn update_template(
        &self,
        user_id: &str,
        template_id: &str,
        update: RecurringInvoiceUpdate,
    ) -> Result<RecurringInvoice> {
        let user = self.business(user_id)?;
        self.owned(user_id, template_id)?;
        let currency = self.prepare(&user, &update.template)?;
        self.repository.update(template_id, update, currency).await
    }

    async fn delete_template(&self, user_id: &str, template_id: &str) -> Result<()> {
        self.owned(user_id, template_id)?;
        self.repository.delete(template_id).await
    }

    fn list_templates(&self, user_id: &str) -> Result<Vec<RecurringInvoice>> {
        self.repository.list_for_user(user_id)
    }

    async fn run_due(&self, now: NaiveDateTime) -> Result<RecurringRunSummary> {
        let today = business_date_from_utc(now.and_utc());
        let mut summary = RecurringRunSummary::default();

        for template in self.repository.list_due(today)? {
            let id = template.id.clone();
            if let Err(e) = self.run_template(template, now, &mut summary).await {
                warn!("Recurring invoice {} failed: {}", id, e);
                summary.failures += 1;
            }
        }

        info!(
            "Recurring run: {} generated, {} sent, {} deactivated, {} skipped, {} failures",
            summary.generated, summary.sent, summary.deactivated, summary.skipped, summary.failures
        );
        Ok(summary)
    }
}
