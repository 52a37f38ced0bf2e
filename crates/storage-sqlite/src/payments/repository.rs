use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{info, warn};
use std::sync::Arc;

use vuka_core::constants::DEFAULT_CURRENCY;
use vuka_core::invoices::{
    Invoice, InvoiceStatus, PaymentSettlement, TransitionMode, TransitionRequest,
};
use vuka_core::payments::{
    Checkout, CheckoutStatus, NewCheckout, PaymentNotice, PaymentOutcome, PaymentRepositoryTrait,
};
use vuka_core::wallets::{ledger, TransactionStatus, TransactionType};
use vuka_core::{Error, Result};

use super::model::CheckoutDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::invoices::{apply_transition_in_transaction, load_invoice_in_transaction};
use crate::schema::{checkouts, transactions};
use crate::utils::{decimal_text, new_id};
use crate::wallets::{get_or_create_wallet_in_transaction, insert_transaction_in_transaction};

fn resolve_invoice(conn: &mut SqliteConnection, notice: &PaymentNotice) -> Result<Invoice> {
    if let Some(invoice_id) = &notice.invoice_id {
        return load_invoice_in_transaction(conn, invoice_id);
    }
    if let Some(checkout_id) = &notice.gateway_checkout_id {
        let invoice_id = checkouts::table
            .filter(checkouts::gateway.eq(notice.gateway.as_str()))
            .filter(checkouts::gateway_checkout_id.eq(checkout_id))
            .select(checkouts::invoice_id)
            .first::<String>(conn)
            .optional()
            .into_core()?;
        if let Some(invoice_id) = invoice_id {
            return load_invoice_in_transaction(conn, &invoice_id);
        }
    }
    Err(Error::NotFound(format!(
        "Invoice for {} payment {}",
        notice.gateway, notice.gateway_reference
    )))
}

/// True when a ledger row of this type and one of these statuses already
/// carries the gateway reference.
fn reference_seen(
    conn: &mut SqliteConnection,
    notice: &PaymentNotice,
    transaction_type: TransactionType,
    statuses: &[TransactionStatus],
) -> Result<bool> {
    let statuses: Vec<&str> = statuses.iter().map(TransactionStatus::as_str).collect();
    let count = transactions::table
        .filter(transactions::gateway.eq(notice.gateway.as_str()))
        .filter(transactions::gateway_reference.eq(&notice.gateway_reference))
        .filter(transactions::transaction_type.eq(transaction_type.as_str()))
        .filter(transactions::status.eq_any(statuses))
        .count()
        .get_result::<i64>(conn)
        .into_core()?;
    Ok(count > 0)
}

fn update_checkout_status(
    conn: &mut SqliteConnection,
    notice: &PaymentNotice,
    status: CheckoutStatus,
    now: NaiveDateTime,
) -> Result<()> {
    if let Some(checkout_id) = &notice.gateway_checkout_id {
        diesel::update(
            checkouts::table
                .filter(checkouts::gateway.eq(notice.gateway.as_str()))
                .filter(checkouts::gateway_checkout_id.eq(checkout_id)),
        )
        .set((
            checkouts::status.eq(status.as_str()),
            checkouts::updated_at.eq(now),
        ))
        .execute(conn)
        .into_core()?;
    }
    Ok(())
}

fn settlement(notice: &PaymentNotice) -> PaymentSettlement {
    PaymentSettlement {
        fee: notice.fee,
        gateway: Some(notice.gateway),
        gateway_reference: Some(notice.gateway_reference.clone()),
    }
}

pub struct PaymentRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PaymentRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PaymentRepositoryTrait for PaymentRepository {
    fn has_recent_completed_payment(
        &self,
        invoice_id: &str,
        since: NaiveDateTime,
    ) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        let count = transactions::table
            .filter(transactions::invoice_id.eq(invoice_id))
            .filter(transactions::transaction_type.eq(TransactionType::Deposit.as_str()))
            .filter(transactions::status.eq(TransactionStatus::Completed.as_str()))
            .filter(transactions::created_at.ge(since))
            .count()
            .get_result::<i64>(&mut conn)
            .into_core()?;
        Ok(count > 0)
    }

    async fn create_checkout(&self, checkout: NewCheckout) -> Result<Checkout> {
        let now = Utc::now().naive_utc();
        let row = CheckoutDB {
            id: new_id(),
            invoice_id: checkout.invoice_id,
            gateway: checkout.gateway.as_str().to_string(),
            gateway_checkout_id: checkout.gateway_checkout_id,
            amount: decimal_text(checkout.amount),
            currency: checkout.currency,
            status: CheckoutStatus::Pending.as_str().to_string(),
            redirect_url: checkout.redirect_url,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(checkouts::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Checkout::try_from(row)
            })
            .await
    }

    fn list_checkouts(&self, invoice_id: &str) -> Result<Vec<Checkout>> {
        let mut conn = get_connection(&self.pool)?;
        checkouts::table
            .filter(checkouts::invoice_id.eq(invoice_id))
            .order(checkouts::created_at.desc())
            .select(CheckoutDB::as_select())
            .load::<CheckoutDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(Checkout::try_from)
            .collect()
    }

    fn find_invoice_for_notice(&self, notice: &PaymentNotice) -> Result<Invoice> {
        let mut conn = get_connection(&self.pool)?;
        resolve_invoice(&mut conn, notice)
    }

    async fn record_success(
        &self,
        notice: PaymentNotice,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome> {
        self.writer
            .exec(move |conn| {
                let settled = [
                    TransactionStatus::Completed,
                    TransactionStatus::Flagged,
                    TransactionStatus::Reviewed,
                ];
                if reference_seen(conn, &notice, TransactionType::Deposit, &settled)? {
                    return Ok(PaymentOutcome::Replayed);
                }

                let invoice = resolve_invoice(conn, &notice)?;
                update_checkout_status(conn, &notice, CheckoutStatus::Completed, now)?;

                if matches!(
                    invoice.status,
                    InvoiceStatus::Paid | InvoiceStatus::Cancelled | InvoiceStatus::Refunded
                ) {
                    let wallet = get_or_create_wallet_in_transaction(
                        conn,
                        &invoice.user_id,
                        DEFAULT_CURRENCY,
                        now,
                    )?;
                    let entry = ledger::post_flagged_duplicate(
                        &wallet,
                        &invoice,
                        notice.amount,
                        notice.gateway,
                        &notice.gateway_reference,
                        now,
                    );
                    let transaction = insert_transaction_in_transaction(conn, entry)?;
                    return Ok(PaymentOutcome::Flagged { transaction });
                }

                if notice.amount != invoice.amount_due {
                    warn!(
                        "{} payment {} of {} {} does not match {} due on invoice {}",
                        notice.gateway,
                        notice.gateway_reference,
                        notice.amount,
                        notice.currency,
                        invoice.amount_due,
                        invoice.invoice_number
                    );
                }

                let mut request =
                    TransitionRequest::new(&invoice.id, InvoiceStatus::Paid, TransitionMode::Standard);
                request.settlement = settlement(&notice);
                request.now = now;
                let outcome = apply_transition_in_transaction(conn, request)?;
                Ok(PaymentOutcome::Applied {
                    invoice: outcome.invoice,
                    transaction: outcome.transaction,
                })
            })
            .await
    }

    async fn record_failure(
        &self,
        notice: PaymentNotice,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome> {
        self.writer
            .exec(move |conn| {
                if reference_seen(
                    conn,
                    &notice,
                    TransactionType::Deposit,
                    &[TransactionStatus::Failed],
                )? {
                    return Ok(PaymentOutcome::Replayed);
                }

                let invoice = resolve_invoice(conn, &notice)?;
                update_checkout_status(conn, &notice, CheckoutStatus::Failed, now)?;

                let wallet =
                    get_or_create_wallet_in_transaction(conn, &invoice.user_id, DEFAULT_CURRENCY, now)?;
                let entry = ledger::post_failed_payment(
                    &wallet,
                    &invoice,
                    notice.amount,
                    notice.gateway,
                    &notice.gateway_reference,
                    notice.failure_reason.as_deref(),
                    now,
                );
                let transaction = insert_transaction_in_transaction(conn, entry)?;
                Ok(PaymentOutcome::Failed { transaction })
            })
            .await
    }

    async fn record_refund(
        &self,
        notice: PaymentNotice,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome> {
        self.writer
            .exec(move |conn| {
                if reference_seen(
                    conn,
                    &notice,
                    TransactionType::Refund,
                    &[TransactionStatus::Completed],
                )? {
                    return Ok(PaymentOutcome::Replayed);
                }

                let invoice = resolve_invoice(conn, &notice)?;
                if invoice.status != InvoiceStatus::Paid {
                    info!(
                        "Refund {} for invoice {} ignored: invoice is {}",
                        notice.gateway_reference, invoice.invoice_number, invoice.status
                    );
                    return Ok(PaymentOutcome::Ignored);
                }

                let mut request = TransitionRequest::new(
                    &invoice.id,
                    InvoiceStatus::Refunded,
                    TransitionMode::Standard,
                );
                request.settlement = settlement(&notice);
                request.now = now;
                let outcome = apply_transition_in_transaction(conn, request)?;
                Ok(PaymentOutcome::Reversed {
                    invoice: outcome.invoice,
                    transaction: outcome.transaction,
                })
            })
            .await
    }

    async fn set_checkout_status(
        &self,
        gateway_checkout_id: &str,
        status: CheckoutStatus,
    ) -> Result<()> {
        let gateway_checkout_id = gateway_checkout_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(
                    checkouts::table.filter(checkouts::gateway_checkout_id.eq(&gateway_checkout_id)),
                )
                .set((
                    checkouts::status.eq(status.as_str()),
                    checkouts::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .into_core()?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("Checkout {}", gateway_checkout_id)));
                }
                Ok(())
            })
            .await
    }
}
