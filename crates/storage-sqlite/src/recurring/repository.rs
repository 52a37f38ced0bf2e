use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use vuka_core::invoices::Invoice;
use vuka_core::recurring::{
    GeneratedOccurrence, NewRecurringInvoice, RecurringInvoice, RecurringInvoiceRepositoryTrait,
    RecurringInvoiceUpdate,
};
use vuka_core::{Error, Result};

use super::model::RecurringInvoiceDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, OrNotFound};
use crate::invoices::insert_invoice_in_transaction;
use crate::schema::recurring_invoices;
use crate::utils::new_id;

fn load_template(conn: &mut SqliteConnection, template_id: &str) -> Result<RecurringInvoice> {
    let row = recurring_invoices::table
        .find(template_id)
        .select(RecurringInvoiceDB::as_select())
        .first::<RecurringInvoiceDB>(conn)
        .or_not_found(|| format!("Recurring invoice {}", template_id))?;
    RecurringInvoice::try_from(row)
}

fn load_templates(rows: Vec<RecurringInvoiceDB>) -> Result<Vec<RecurringInvoice>> {
    rows.into_iter().map(RecurringInvoice::try_from).collect()
}

pub struct RecurringInvoiceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl RecurringInvoiceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl RecurringInvoiceRepositoryTrait for RecurringInvoiceRepository {
    async fn create(
        &self,
        user_id: &str,
        template: NewRecurringInvoice,
        currency: String,
    ) -> Result<RecurringInvoice> {
        let now = Utc::now().naive_utc();
        let row = RecurringInvoiceDB {
            id: new_id(),
            user_id: user_id.to_string(),
            client_name: template.client_name.trim().to_string(),
            client_email: template.client_email.trim().to_lowercase(),
            currency,
            items: serde_json::to_string(&template.items)?,
            notes: template.notes,
            frequency: template.frequency.as_str().to_string(),
            start_date: template.start_date,
            next_run_date: template.start_date,
            end_date: template.end_date,
            days_until_due: template.days_until_due,
            is_active: true,
            auto_send: template.auto_send,
            last_generated_at: None,
            created_at: now,
            updated_at: now,
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(recurring_invoices::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                RecurringInvoice::try_from(row)
            })
            .await
    }

    async fn update(
        &self,
        template_id: &str,
        update: RecurringInvoiceUpdate,
        currency: String,
    ) -> Result<RecurringInvoice> {
        let template_id = template_id.to_string();
        let items = serde_json::to_string(&update.template.items)?;
        self.writer
            .exec(move |conn| {
                let existing = load_template(conn, &template_id)?;
                // Moving the start earlier never re-generates periods already invoiced.
                let next_run_date = existing.next_run_date.max(update.template.start_date);
                let template = update.template;

                diesel::update(recurring_invoices::table.find(&template_id))
                    .set((
                        recurring_invoices::client_name.eq(template.client_name.trim()),
                        recurring_invoices::client_email
                            .eq(template.client_email.trim().to_lowercase()),
                        recurring_invoices::currency.eq(currency),
                        recurring_invoices::items.eq(items),
                        recurring_invoices::notes.eq(template.notes),
                        recurring_invoices::frequency.eq(template.frequency.as_str()),
                        recurring_invoices::start_date.eq(template.start_date),
                        recurring_invoices::next_run_date.eq(next_run_date),
                        recurring_invoices::end_date.eq(template.end_date),
                        recurring_invoices::days_until_due.eq(template.days_until_due),
                        recurring_invoices::is_active.eq(update.is_active),
                        recurring_invoices::auto_send.eq(template.auto_send),
                        recurring_invoices::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                load_template(conn, &template_id)
            })
            .await
    }

    async fn delete(&self, template_id: &str) -> Result<()> {
        let template_id = template_id.to_string();
        self.writer
            .exec(move |conn| {
                let deleted = diesel::delete(recurring_invoices::table.find(&template_id))
                    .execute(conn)
                    .into_core()?;
                if deleted == 0 {
                    return Err(Error::NotFound(format!("Recurring invoice {}", template_id)));
                }
                Ok(())
            })
            .await
    }

    fn get_by_id(&self, template_id: &str) -> Result<RecurringInvoice> {
        let mut conn = get_connection(&self.pool)?;
        load_template(&mut conn, template_id)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringInvoice>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = recurring_invoices::table
            .filter(recurring_invoices::user_id.eq(user_id))
            .order(recurring_invoices::created_at.desc())
            .select(RecurringInvoiceDB::as_select())
            .load::<RecurringInvoiceDB>(&mut conn)
            .into_core()?;
        load_templates(rows)
    }

    fn list_due(&self, today: NaiveDate) -> Result<Vec<RecurringInvoice>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = recurring_invoices::table
            .filter(recurring_invoices::is_active.eq(true))
            .filter(recurring_invoices::next_run_date.le(today))
            .order(recurring_invoices::next_run_date.asc())
            .select(RecurringInvoiceDB::as_select())
            .load::<RecurringInvoiceDB>(&mut conn)
            .into_core()?;
        load_templates(rows)
    }

    async fn generate_occurrence(
        &self,
        occurrence: GeneratedOccurrence,
    ) -> Result<Option<Invoice>> {
        self.writer
            .exec(move |conn| {
                // Claim the period first: only the run that still sees the
                // expected next_run_date may generate it.
                let claimed = diesel::update(
                    recurring_invoices::table
                        .filter(recurring_invoices::id.eq(&occurrence.template_id))
                        .filter(recurring_invoices::is_active.eq(true))
                        .filter(recurring_invoices::next_run_date.eq(occurrence.expected_run_date)),
                )
                .set((
                    recurring_invoices::next_run_date.eq(occurrence.next_run_date),
                    recurring_invoices::is_active.eq(!occurrence.deactivate),
                    recurring_invoices::last_generated_at.eq(Some(occurrence.now)),
                    recurring_invoices::updated_at.eq(occurrence.now),
                ))
                .execute(conn)
                .into_core()?;
                if claimed == 0 {
                    return Ok(None);
                }

                let template = load_template(conn, &occurrence.template_id)?;
                let invoice = insert_invoice_in_transaction(
                    conn,
                    &template.user_id,
                    occurrence.draft,
                    &occurrence.lines,
                    occurrence.totals,
                    Some(template.id),
                    occurrence.now,
                )?;
                Ok(Some(invoice))
            })
            .await
    }

    async fn deactivate(&self, template_id: &str, now: NaiveDateTime) -> Result<()> {
        let template_id = template_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(recurring_invoices::table.find(&template_id))
                    .set((
                        recurring_invoices::is_active.eq(false),
                        recurring_invoices::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}
