//! Invoice repository and service traits.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::invoices_model::{
    ComputedLine, InboundEmail, Invoice, InvoiceDraft, InvoiceStatus, InvoiceTotals,
    NewInboundEmail, PublicInvoice, ReminderSummary,
};
use super::transition::TransitionMode;
use crate::errors::Result;
use crate::notifications::InboundEmailPayload;
use crate::payments::Gateway;
use crate::wallets::Transaction;

/// Gateway details attached to the deposit when a transition records a payment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentSettlement {
    /// Fee in the invoice currency.
    pub fee: Decimal,
    pub gateway: Option<Gateway>,
    pub gateway_reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub invoice_id: String,
    pub target: InvoiceStatus,
    pub mode: TransitionMode,
    pub settlement: PaymentSettlement,
    pub now: NaiveDateTime,
}

impl TransitionRequest {
    pub fn new(invoice_id: &str, target: InvoiceStatus, mode: TransitionMode) -> Self {
        Self {
            invoice_id: invoice_id.to_string(),
            target,
            mode,
            settlement: PaymentSettlement::default(),
            now: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub invoice: Invoice,
    /// The deposit or refund row, when the transition moved money.
    pub transaction: Option<Transaction>,
}

/// Trait defining the contract for invoice persistence.
#[async_trait]
pub trait InvoiceRepositoryTrait: Send + Sync {
    /// Inserts a draft with the next invoice number for the user.
    async fn create(
        &self,
        user_id: &str,
        draft: InvoiceDraft,
        lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice>;

    /// Replaces header and items of a draft.
    async fn update_draft(
        &self,
        invoice_id: &str,
        draft: InvoiceDraft,
        lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice>;

    async fn delete_draft(&self, invoice_id: &str) -> Result<()>;

    fn get_by_id(&self, invoice_id: &str) -> Result<Invoice>;

    fn get_by_share_token(&self, share_token: &str) -> Result<Invoice>;

    fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>>;

    fn list_for_user(&self, user_id: &str, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>>;

    /// Applies one status change, and its wallet effects, atomically.
    async fn apply_transition(&self, request: TransitionRequest) -> Result<TransitionOutcome>;

    /// `Sent` invoices whose due date is before `today`.
    fn list_past_due(&self, today: NaiveDate) -> Result<Vec<Invoice>>;

    /// `Overdue` invoices with fewer than `max_reminders` reminders and none
    /// sent after `last_reminder_before`.
    fn list_reminder_due(
        &self,
        last_reminder_before: NaiveDateTime,
        max_reminders: i32,
    ) -> Result<Vec<Invoice>>;

    async fn record_reminder(&self, invoice_id: &str, sent_at: NaiveDateTime) -> Result<()>;

    async fn record_inbound_email(&self, email: NewInboundEmail) -> Result<InboundEmail>;

    fn list_inbound_emails(&self, invoice_id: &str) -> Result<Vec<InboundEmail>>;
}

/// Trait defining the contract for invoice service operations.
#[async_trait]
pub trait InvoiceServiceTrait: Send + Sync {
    async fn create_invoice(&self, user_id: &str, draft: InvoiceDraft) -> Result<Invoice>;

    async fn update_invoice(
        &self,
        user_id: &str,
        invoice_id: &str,
        draft: InvoiceDraft,
    ) -> Result<Invoice>;

    async fn delete_invoice(&self, user_id: &str, invoice_id: &str) -> Result<()>;

    /// Loads an invoice owned by `user_id`.
    fn get_invoice(&self, user_id: &str, invoice_id: &str) -> Result<Invoice>;

    fn list_invoices(&self, user_id: &str, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>>;

    async fn update_status(
        &self,
        user_id: &str,
        invoice_id: &str,
        target: InvoiceStatus,
    ) -> Result<TransitionOutcome>;

    /// Admin-only status change that may revive a cancelled invoice as paid.
    async fn override_status(
        &self,
        invoice_id: &str,
        target: InvoiceStatus,
    ) -> Result<TransitionOutcome>;

    /// Emails the payment link and moves a draft to `Sent`.
    async fn send_invoice(&self, user_id: &str, invoice_id: &str) -> Result<Invoice>;

    fn get_public_invoice(&self, share_token: &str) -> Result<PublicInvoice>;

    async fn mark_overdue_and_remind(&self, now: NaiveDateTime) -> Result<ReminderSummary>;

    async fn ingest_inbound_email(&self, payload: InboundEmailPayload) -> Result<InboundEmail>;

    fn list_inbound_emails(&self, user_id: &str, invoice_id: &str) -> Result<Vec<InboundEmail>>;
}
