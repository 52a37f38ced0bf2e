//! Database model for recurring invoice templates.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use vuka_core::invoices::InvoiceLine;
use vuka_core::recurring::RecurringInvoice;
use vuka_core::{Error, Result};

use crate::errors::StorageError;
use crate::utils::parse_text;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recurring_invoices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecurringInvoiceDB {
    pub id: String,
    pub user_id: String,
    pub client_name: String,
    pub client_email: String,
    pub currency: String,
    pub items: String,
    pub notes: Option<String>,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub next_run_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub days_until_due: i32,
    pub is_active: bool,
    pub auto_send: bool,
    pub last_generated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<RecurringInvoiceDB> for RecurringInvoice {
    type Error = Error;

    fn try_from(db: RecurringInvoiceDB) -> Result<Self> {
        let items: Vec<InvoiceLine> = serde_json::from_str(&db.items).map_err(|e| {
            StorageError::CorruptValue(format!("recurring_invoices.items: {}", e))
        })?;
        Ok(Self {
            items,
            frequency: parse_text(&db.frequency, "recurring_invoices.frequency")?,
            id: db.id,
            user_id: db.user_id,
            client_name: db.client_name,
            client_email: db.client_email,
            currency: db.currency,
            notes: db.notes,
            start_date: db.start_date,
            next_run_date: db.next_run_date,
            end_date: db.end_date,
            days_until_due: db.days_until_due,
            is_active: db.is_active,
            auto_send: db.auto_send,
            last_generated_at: db.last_generated_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
