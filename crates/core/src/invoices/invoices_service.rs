use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::invoices_model::{
    compute_lines, InboundEmail, Invoice, InvoiceDraft, InvoiceStatus, NewInboundEmail,
    PublicInvoice, ReminderSummary,
};
use super::invoices_traits::{
    InvoiceRepositoryTrait, InvoiceServiceTrait, TransitionOutcome, TransitionRequest,
};
use super::transition::TransitionMode;
use crate::constants::{DEFAULT_CURRENCY, DEFAULT_VAT_RATE, MAX_REMINDERS, REMINDER_INTERVAL_DAYS};
use crate::errors::{Error, Result};
use crate::notifications::{
    extract_invoice_number, templates, EmailMessage, EmailSender, InboundEmailPayload,
};
use crate::users::{User, UserRepositoryTrait, UserRole};
use crate::utils::time_utils::business_date_from_utc;

/// Service for drafting, sending and tracking invoices.
pub struct InvoiceService {
    repository: Arc<dyn InvoiceRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    email: Arc<dyn EmailSender>,
    public_base_url: String,
}

impl InvoiceService {
    pub fn new(
        repository: Arc<dyn InvoiceRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        email: Arc<dyn EmailSender>,
        public_base_url: String,
    ) -> Self {
        Self {
            repository,
            users,
            email,
            public_base_url,
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

    /// VAT-registered businesses charge the standard rate unless a line says otherwise.
    fn default_vat_rate(user: &User) -> Decimal {
        if user.vat_number.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            DEFAULT_VAT_RATE
        } else {
            Decimal::ZERO
        }
    }

    fn owned(&self, user_id: &str, invoice_id: &str) -> Result<Invoice> {
        let invoice = self.repository.get_by_id(invoice_id)?;
        if invoice.user_id != user_id {
            // Do not reveal other tenants' invoices.
            return Err(Error::NotFound(format!("Invoice {}", invoice_id)));
        }
        Ok(invoice)
    }

    async fn send_reminder(&self, invoice: &Invoice, now: NaiveDateTime) -> Result<()> {
        let business = self.users.get_by_id(&invoice.user_id)?;
        let name = business.display_name();
        let pay_url = invoice.pay_url(&self.public_base_url);
        self.email
            .send(&EmailMessage {
                to: invoice.client_email.clone(),
                subject: templates::reminder_subject(invoice, name),
                html: templates::reminder_html(invoice, name, &pay_url),
                text: templates::reminder_text(invoice, name, &pay_url),
                reply_to: Some(business.email.clone()),
            })
            .await?;
        self.repository.record_reminder(&invoice.id, now).await
    }
}

#[async_trait]
impl InvoiceServiceTrait for InvoiceService {
    async fn create_invoice(&self, user_id: &str, mut draft: InvoiceDraft) -> Result<Invoice> {
        let user = self.business(user_id)?;
        draft.validate(DEFAULT_CURRENCY)?;
        let (lines, totals) = compute_lines(&draft.items, Self::default_vat_rate(&user))?;
        let invoice = self.repository.create(user_id, draft, lines, totals).await?;
        info!(
            "Created invoice {} ({}) for user {}",
            invoice.invoice_number, invoice.id, user_id
        );
        Ok(invoice)
    }

    async fn update_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        mut draft: InvoiceDraft,
    ) -> Result<Invoice> {
        let user = self.business(user_id)?;
        let existing = self.owned(user_id, invoice_id)?;
        if !existing.is_editable() {
            return Err(Error::Conflict(format!(
                "Invoice {} is {} and can no longer be edited",
                existing.invoice_number, existing.status
            )));
        }
        draft.validate(DEFAULT_CURRENCY)?;
        let (lines, totals) = compute_lines(&draft.items, Self::default_vat_rate(&user))?;
        self.repository
            .update_draft(invoice_id, draft, lines, totals)
            .await
    }

    async fn delete_invoice(&self, user_id: &str, invoice_id: &str) -> Result<()> {
        let existing = self.owned(user_id, invoice_id)?;
        if !existing.is_editable() {
            return Err(Error::Conflict(format!(
                "Invoice {} is {} and cannot be deleted",
                existing.invoice_number, existing.status
            )));
        }
        self.repository.delete_draft(invoice_id).await?;
        debug!("Deleted draft invoice {}", invoice_id);
        Ok(())
    }

    fn get_invoice(&self, user_id: &str, invoice_id: &str) -> Result<Invoice> {
        self.owned(user_id, invoice_id)
    }

    fn list_invoices(&self, user_id: &str, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>> {
        self.repository.list_for_user(user_id, status)
    }

    async fn update_status(
        &self,
        user_id: &str,
        invoice_id: &str,
        target: InvoiceStatus,
    ) -> Result<TransitionOutcome> {
        let invoice = self.owned(user_id, invoice_id)?;
        let outcome = self
            .repository
            .apply_transition(TransitionRequest::new(
                &invoice.id,
                target,
                TransitionMode::Standard,
            ))
            .await?;
        info!(
            "Invoice {} moved from {} to {}",
            invoice.invoice_number, invoice.status, outcome.invoice.status
        );
        Ok(outcome)
    }

    async fn override_status(
        &self,
        invoice_id: &str,
        target: InvoiceStatus,
    ) -> Result<TransitionOutcome> {
        let before = self.repository.get_by_id(invoice_id)?;
        let outcome = self
            .repository
            .apply_transition(TransitionRequest::new(
                invoice_id,
                target,
                TransitionMode::AdminOverride,
            ))
            .await?;
        warn!(
            "Admin override moved invoice {} from {} to {}",
            before.invoice_number, before.status, outcome.invoice.status
        );
        Ok(outcome)
    }

    async fn send_invoice(&self, user_id: &str, invoice_id: &str) -> Result<Invoice> {
        let business = self.business(user_id)?;
        let invoice = self.owned(user_id, invoice_id)?;
        if !matches!(
            invoice.status,
            InvoiceStatus::Draft | InvoiceStatus::Sent | InvoiceStatus::Overdue
        ) {
            return Err(Error::Conflict(format!(
                "Invoice {} is {} and cannot be sent",
                invoice.invoice_number, invoice.status
            )));
        }

        let name = business.display_name();
        let pay_url = invoice.pay_url(&self.public_base_url);
        self.email
            .send(&EmailMessage {
                to: invoice.client_email.clone(),
                subject: templates::invoice_subject(&invoice, name),
                html: templates::invoice_html(&invoice, name, &pay_url),
                text: templates::invoice_text(&invoice, name, &pay_url),
                reply_to: Some(business.email.clone()),
            })
            .await?;

        if invoice.status != InvoiceStatus::Draft {
            info!("Re-sent invoice {}", invoice.invoice_number);
            return Ok(invoice);
        }
        let outcome = self
            .repository
            .apply_transition(TransitionRequest::new(
                &invoice.id,
                InvoiceStatus::Sent,
                TransitionMode::Standard,
            ))
            .await?;
        info!(
            "Sent invoice {} to {}",
            invoice.invoice_number, invoice.client_email
        );
        Ok(outcome.invoice)
    }

    fn get_public_invoice(&self, share_token: &str) -> Result<PublicInvoice> {
        let invoice = self.repository.get_by_share_token(share_token)?;
        if invoice.status == InvoiceStatus::Draft {
            return Err(Error::NotFound("Invoice".to_string()));
        }
        let business = self.users.get_by_id(&invoice.user_id)?;
        let name = business.display_name().to_string();
        Ok(PublicInvoice::from_invoice(invoice, &name))
    }

    async fn mark_overdue_and_remind(&self, now: NaiveDateTime) -> Result<ReminderSummary> {
        let mut summary = ReminderSummary::default();
        let today = business_date_from_utc(now.and_utc());

        for invoice in self.repository.list_past_due(today)? {
            let mut request =
                TransitionRequest::new(&invoice.id, InvoiceStatus::Overdue, TransitionMode::Standard);
            request.now = now;
            match self.repository.apply_transition(request).await {
                Ok(_) => summary.marked_overdue += 1,
                Err(e) => {
                    warn!("Failed to mark invoice {} overdue: {}", invoice.id, e);
                    summary.failures += 1;
                }
            }
        }

        let cutoff = now - Duration::days(REMINDER_INTERVAL_DAYS);
        for invoice in self.repository.list_reminder_due(cutoff, MAX_REMINDERS)? {
            match self.send_reminder(&invoice, now).await {
                Ok(()) => summary.reminders_sent += 1,
                Err(e) => {
                    warn!(
                        "Failed to send reminder for invoice {}: {}",
                        invoice.invoice_number, e
                    );
                    summary.failures += 1;
                }
            }
        }

        info!(
            "Overdue run: {} marked overdue, {} reminders sent, {} failures",
            summary.marked_overdue, summary.reminders_sent, summary.failures
        );
        Ok(summary)
    }

    async fn ingest_inbound_email(&self, payload: InboundEmailPayload) -> Result<InboundEmail> {
        payload.validate()?;
        let from = payload.from.trim().to_lowercase();

        let invoice_id = match extract_invoice_number(&payload.subject) {
            Some(number) => {
                let candidates = self.repository.find_by_number(&number)?;
                // Numbers are only unique per business; use the sender to pick one.
                if candidates.len() == 1 {
                    candidates.into_iter().next().map(|i| i.id)
                } else {
                    candidates
                        .into_iter()
                        .find(|i| from.contains(&i.client_email))
                        .map(|i| i.id)
                }
            }
            None => None,
        };
        if invoice_id.is_none() {
            debug!("Inbound email from {} matched no invoice", from);
        }

        self.repository
            .record_inbound_email(NewInboundEmail {
                invoice_id,
                from_address: from,
                subject: payload.subject,
                body_text: payload.text,
                received_at: Utc::now().naive_utc(),
            })
            .await
    }

    fn list_inbound_emails(&self, user_id: &str, invoice_id: &str) -> Result<Vec<InboundEmail>> {
        let invoice = self.owned(user_id, invoice_id)?;
        self.repository.list_inbound_emails(&invoice.id)
    }
}
