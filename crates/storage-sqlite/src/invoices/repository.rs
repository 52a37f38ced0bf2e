use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use vuka_core::constants::DEFAULT_CURRENCY;
use vuka_core::fx::ConvertedAmount;
use vuka_core::invoices::{
    format_invoice_number, plan_transition, ComputedLine, InboundEmail, Invoice, InvoiceDraft,
    InvoiceItem, InvoiceRepositoryTrait, InvoiceStatus, InvoiceTotals, NewInboundEmail,
    TransitionOutcome, TransitionPlan, TransitionRequest,
};
use vuka_core::utils::money::round_money;
use vuka_core::wallets::{ledger, Transaction, TransactionStatus, TransactionType};
use vuka_core::{Error, Result};

use super::model::{InboundEmailDB, InvoiceDB, InvoiceItemDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, OrNotFound};
use crate::fx::load_converter_in_transaction;
use crate::schema::{inbound_emails, invoice_counters, invoice_items, invoices, transactions};
use crate::utils::{chunk_for_sqlite, decimal_text, new_id};
use crate::wallets::{
    get_or_create_wallet_in_transaction, insert_transaction_in_transaction,
    save_wallet_in_transaction, TransactionDB,
};

fn load_items(
    conn: &mut SqliteConnection,
    invoice_ids: &[String],
) -> Result<HashMap<String, Vec<InvoiceItem>>> {
    let mut grouped: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
    for chunk in chunk_for_sqlite(invoice_ids) {
        let rows = invoice_items::table
            .filter(invoice_items::invoice_id.eq_any(chunk))
            .order((invoice_items::invoice_id, invoice_items::sort_order))
            .select(InvoiceItemDB::as_select())
            .load::<InvoiceItemDB>(conn)
            .into_core()?;
        for row in rows {
            let item = InvoiceItem::try_from(row)?;
            grouped.entry(item.invoice_id.clone()).or_default().push(item);
        }
    }
    Ok(grouped)
}

fn hydrate(conn: &mut SqliteConnection, rows: Vec<InvoiceDB>) -> Result<Vec<Invoice>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut items = load_items(conn, &ids)?;
    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_invoice(lines)
        })
        .collect()
}

pub(crate) fn load_invoice_in_transaction(
    conn: &mut SqliteConnection,
    invoice_id: &str,
) -> Result<Invoice> {
    let row = invoices::table
        .find(invoice_id)
        .select(InvoiceDB::as_select())
        .first::<InvoiceDB>(conn)
        .or_not_found(|| format!("Invoice {}", invoice_id))?;
    let mut found = hydrate(conn, vec![row])?;
    found
        .pop()
        .ok_or_else(|| Error::NotFound(format!("Invoice {}", invoice_id)))
}

fn insert_items(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    lines: &[ComputedLine],
) -> Result<()> {
    let rows: Vec<InvoiceItemDB> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| InvoiceItemDB::from_line(new_id(), invoice_id, line, i as i32))
        .collect();
    diesel::insert_into(invoice_items::table)
        .values(&rows)
        .execute(conn)
        .into_core()?;
    Ok(())
}

/// Claims the next invoice sequence for a user.
///
/// Numbers come from a counter row, so a deleted draft's number is never issued again.
fn next_invoice_sequence(conn: &mut SqliteConnection, user_id: &str) -> Result<i32> {
    diesel::insert_into(invoice_counters::table)
        .values((
            invoice_counters::user_id.eq(user_id),
            invoice_counters::last_sequence.eq(1),
        ))
        .on_conflict(invoice_counters::user_id)
        .do_update()
        .set(invoice_counters::last_sequence.eq(invoice_counters::last_sequence + 1))
        .execute(conn)
        .into_core()?;
    invoice_counters::table
        .find(user_id)
        .select(invoice_counters::last_sequence)
        .first::<i32>(conn)
        .into_core()
}

/// Inserts a DRAFT invoice with the next per-business invoice number.
pub(crate) fn insert_invoice_in_transaction(
    conn: &mut SqliteConnection,
    user_id: &str,
    draft: InvoiceDraft,
    lines: &[ComputedLine],
    totals: InvoiceTotals,
    recurring_invoice_id: Option<String>,
    now: NaiveDateTime,
) -> Result<Invoice> {
    let sequence = next_invoice_sequence(conn, user_id)?;

    let row = InvoiceDB {
        id: new_id(),
        user_id: user_id.to_string(),
        invoice_number: format_invoice_number(i64::from(sequence)),
        invoice_sequence: sequence,
        client_name: draft.client_name,
        client_email: draft.client_email,
        currency: draft.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        status: InvoiceStatus::Draft.as_str().to_string(),
        issue_date: draft.issue_date,
        due_date: draft.due_date,
        subtotal: decimal_text(totals.subtotal),
        vat_total: decimal_text(totals.vat_total),
        total: decimal_text(totals.total),
        amount_due: decimal_text(totals.total),
        amount_paid: decimal_text(rust_decimal::Decimal::ZERO),
        paid_date: None,
        notes: draft.notes,
        share_token: uuid::Uuid::new_v4().simple().to_string(),
        recurring_invoice_id,
        last_reminder_at: None,
        reminder_count: 0,
        created_at: now,
        updated_at: now,
    };
    let invoice_id = row.id.clone();
    diesel::insert_into(invoices::table)
        .values(&row)
        .execute(conn)
        .into_core()?;
    insert_items(conn, &invoice_id, lines)?;
    load_invoice_in_transaction(conn, &invoice_id)
}

fn save_invoice_state(conn: &mut SqliteConnection, invoice: &Invoice) -> Result<()> {
    diesel::update(invoices::table.find(&invoice.id))
        .set((
            invoices::status.eq(invoice.status.as_str()),
            invoices::amount_due.eq(decimal_text(invoice.amount_due)),
            invoices::amount_paid.eq(decimal_text(invoice.amount_paid)),
            invoices::paid_date.eq(invoice.paid_date),
            invoices::updated_at.eq(invoice.updated_at),
        ))
        .execute(conn)
        .into_core()?;
    Ok(())
}

fn is_reversed(tx: &Transaction) -> bool {
    tx.metadata
        .as_ref()
        .and_then(|m| m.get("reversed"))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Latest completed payment credited for the invoice that has not been reversed yet.
fn open_deposit(conn: &mut SqliteConnection, invoice_id: &str) -> Result<Option<Transaction>> {
    let rows = transactions::table
        .filter(transactions::invoice_id.eq(invoice_id))
        .filter(transactions::transaction_type.eq(TransactionType::Deposit.as_str()))
        .filter(transactions::status.eq(TransactionStatus::Completed.as_str()))
        .order(transactions::created_at.desc())
        .select(TransactionDB::as_select())
        .load::<TransactionDB>(conn)
        .into_core()?;
    for row in rows {
        let tx = Transaction::try_from(row)?;
        if !is_reversed(&tx) {
            return Ok(Some(tx));
        }
    }
    Ok(None)
}

fn mark_deposit_reversed(conn: &mut SqliteConnection, deposit: &Transaction) -> Result<()> {
    let mut metadata = deposit
        .metadata
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));
    if let Some(fields) = metadata.as_object_mut() {
        fields.insert("reversed".to_string(), serde_json::Value::Bool(true));
    }
    diesel::update(transactions::table.find(&deposit.id))
        .set((
            transactions::released.eq(true),
            transactions::metadata.eq(serde_json::to_string(&metadata)?),
        ))
        .execute(conn)
        .into_core()?;
    Ok(())
}

/// Applies one status transition with its wallet and ledger effects.
///
/// Runs inside the caller's write transaction so the invoice row, the wallet
/// balances and the ledger entry commit or roll back together.
pub(crate) fn apply_transition_in_transaction(
    conn: &mut SqliteConnection,
    request: TransitionRequest,
) -> Result<TransitionOutcome> {
    let mut invoice = load_invoice_in_transaction(conn, &request.invoice_id)?;
    let plan = plan_transition(&invoice, request.target, request.mode)?;
    let now = request.now;

    let transaction = match &plan {
        TransitionPlan::RecordPayment { amount } => {
            let mut wallet =
                get_or_create_wallet_in_transaction(conn, &invoice.user_id, DEFAULT_CURRENCY, now)?;
            let converted = if invoice.currency == wallet.currency {
                ConvertedAmount::same_currency(*amount, &wallet.currency)
            } else {
                load_converter_in_transaction(conn)?.convert(
                    *amount,
                    &invoice.currency,
                    &wallet.currency,
                )?
            };
            let payment = ledger::InvoicePayment {
                fee: round_money(request.settlement.fee * converted.rate),
                converted,
                gateway: request.settlement.gateway,
                gateway_reference: request.settlement.gateway_reference.clone(),
            };
            let entry = ledger::post_invoice_deposit(&mut wallet, &invoice, &payment, now)?;
            save_wallet_in_transaction(conn, &mut wallet, now)?;
            Some(insert_transaction_in_transaction(conn, entry)?)
        }
        TransitionPlan::ReversePayment { amount, target } => {
            let mut wallet =
                get_or_create_wallet_in_transaction(conn, &invoice.user_id, DEFAULT_CURRENCY, now)?;
            let deposit = open_deposit(conn, &invoice.id)?;
            let to_reverse = match &deposit {
                Some(deposit) => deposit.net_amount,
                None if invoice.currency == wallet.currency => *amount,
                None => {
                    load_converter_in_transaction(conn)?
                        .convert(*amount, &invoice.currency, &wallet.currency)?
                        .amount
                }
            };
            let reason = match target {
                InvoiceStatus::Refunded => "refunded",
                _ => "cancelled",
            };
            let mut entry =
                ledger::post_invoice_reversal(&mut wallet, &invoice, to_reverse, reason, now);
            entry.gateway = request.settlement.gateway;
            entry.gateway_reference = request.settlement.gateway_reference.clone();
            save_wallet_in_transaction(conn, &mut wallet, now)?;
            if let Some(deposit) = &deposit {
                mark_deposit_reversed(conn, deposit)?;
            }
            Some(insert_transaction_in_transaction(conn, entry)?)
        }
        TransitionPlan::StatusOnly { .. } => None,
    };

    let from = invoice.status;
    invoice.apply_plan(&plan, now);
    save_invoice_state(conn, &invoice)?;
    info!(
        "Invoice {} moved {} -> {}",
        invoice.invoice_number, from, invoice.status
    );

    Ok(TransitionOutcome {
        invoice,
        transaction,
    })
}

fn ensure_draft(invoice: &Invoice) -> Result<()> {
    if !invoice.is_editable() {
        return Err(Error::Conflict(format!(
            "Invoice {} is {} and can no longer be edited",
            invoice.invoice_number, invoice.status
        )));
    }
    Ok(())
}

pub struct InvoiceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl InvoiceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn query(&self, query: invoices::BoxedQuery<'_, Sqlite>) -> Result<Vec<Invoice>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = query
            .select(InvoiceDB::as_select())
            .load::<InvoiceDB>(&mut conn)
            .into_core()?;
        hydrate(&mut conn, rows)
    }
}

#[async_trait]
impl InvoiceRepositoryTrait for InvoiceRepository {
    async fn create(
        &self,
        user_id: &str,
        draft: InvoiceDraft,
        lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn| {
                let now = Utc::now().naive_utc();
                insert_invoice_in_transaction(conn, &user_id, draft, &lines, totals, None, now)
            })
            .await
    }

    async fn update_draft(
        &self,
        invoice_id: &str,
        draft: InvoiceDraft,
        lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice> {
        let invoice_id = invoice_id.to_string();
        self.writer
            .exec(move |conn| {
                let existing = load_invoice_in_transaction(conn, &invoice_id)?;
                ensure_draft(&existing)?;

                let now = Utc::now().naive_utc();
                diesel::update(invoices::table.find(&invoice_id))
                    .set((
                        invoices::client_name.eq(draft.client_name),
                        invoices::client_email.eq(draft.client_email),
                        invoices::currency.eq(draft.currency.unwrap_or(existing.currency)),
                        invoices::issue_date.eq(draft.issue_date),
                        invoices::due_date.eq(draft.due_date),
                        invoices::notes.eq(draft.notes),
                        invoices::subtotal.eq(decimal_text(totals.subtotal)),
                        invoices::vat_total.eq(decimal_text(totals.vat_total)),
                        invoices::total.eq(decimal_text(totals.total)),
                        invoices::amount_due.eq(decimal_text(totals.total)),
                        invoices::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;

                diesel::delete(invoice_items::table.filter(invoice_items::invoice_id.eq(&invoice_id)))
                    .execute(conn)
                    .into_core()?;
                insert_items(conn, &invoice_id, &lines)?;
                load_invoice_in_transaction(conn, &invoice_id)
            })
            .await
    }

    async fn delete_draft(&self, invoice_id: &str) -> Result<()> {
        let invoice_id = invoice_id.to_string();
        self.writer
            .exec(move |conn| {
                let existing = load_invoice_in_transaction(conn, &invoice_id)?;
                ensure_draft(&existing)?;
                diesel::delete(invoices::table.find(&invoice_id))
                    .execute(conn)
                    .into_core()?;
                debug!("Deleted draft invoice {}", existing.invoice_number);
                Ok(())
            })
            .await
    }

    fn get_by_id(&self, invoice_id: &str) -> Result<Invoice> {
        let mut conn = get_connection(&self.pool)?;
        load_invoice_in_transaction(&mut conn, invoice_id)
    }

    fn get_by_share_token(&self, share_token: &str) -> Result<Invoice> {
        self.query(
            invoices::table
                .filter(invoices::share_token.eq(share_token.to_string()))
                .into_boxed(),
        )?
        .pop()
        .ok_or_else(|| Error::NotFound("Invoice".to_string()))
    }

    fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>> {
        self.query(
            invoices::table
                .filter(invoices::invoice_number.eq(invoice_number.to_uppercase()))
                .order(invoices::created_at.desc())
                .into_boxed(),
        )
    }

    fn list_for_user(&self, user_id: &str, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>> {
        let mut query = invoices::table
            .filter(invoices::user_id.eq(user_id.to_string()))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(invoices::status.eq(status.as_str()));
        }
        self.query(query.order((invoices::issue_date.desc(), invoices::invoice_sequence.desc())))
    }

    async fn apply_transition(&self, request: TransitionRequest) -> Result<TransitionOutcome> {
        self.writer
            .exec(move |conn| apply_transition_in_transaction(conn, request))
            .await
    }

    fn list_past_due(&self, today: NaiveDate) -> Result<Vec<Invoice>> {
        self.query(
            invoices::table
                .filter(invoices::status.eq(InvoiceStatus::Sent.as_str()))
                .filter(invoices::due_date.lt(today))
                .order(invoices::due_date.asc())
                .into_boxed(),
        )
    }

    fn list_reminder_due(
        &self,
        last_reminder_before: NaiveDateTime,
        max_reminders: i32,
    ) -> Result<Vec<Invoice>> {
        self.query(
            invoices::table
                .filter(invoices::status.eq(InvoiceStatus::Overdue.as_str()))
                .filter(invoices::reminder_count.lt(max_reminders))
                .filter(
                    invoices::last_reminder_at
                        .is_null()
                        .or(invoices::last_reminder_at.le(last_reminder_before)),
                )
                .order(invoices::due_date.asc())
                .into_boxed(),
        )
    }

    async fn record_reminder(&self, invoice_id: &str, sent_at: NaiveDateTime) -> Result<()> {
        let invoice_id = invoice_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(invoices::table.find(&invoice_id))
                    .set((
                        invoices::reminder_count.eq(invoices::reminder_count + 1),
                        invoices::last_reminder_at.eq(Some(sent_at)),
                    ))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn record_inbound_email(&self, email: NewInboundEmail) -> Result<InboundEmail> {
        let row = InboundEmailDB {
            id: new_id(),
            invoice_id: email.invoice_id,
            from_address: email.from_address,
            subject: email.subject,
            body_text: email.body_text,
            received_at: email.received_at,
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(inbound_emails::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(InboundEmail::from(row))
            })
            .await
    }

    fn list_inbound_emails(&self, invoice_id: &str) -> Result<Vec<InboundEmail>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(inbound_emails::table
            .filter(inbound_emails::invoice_id.eq(invoice_id))
            .order(inbound_emails::received_at.desc())
            .select(InboundEmailDB::as_select())
            .load::<InboundEmailDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(InboundEmail::from)
            .collect())
    }
}
