//! Database models for invoices.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use vuka_core::invoices::{ComputedLine, InboundEmail, Invoice, InvoiceItem};
use vuka_core::Result;

use crate::utils::{decimal_text, parse_decimal, parse_text};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::invoices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InvoiceDB {
    pub id: String,
    pub user_id: String,
    pub invoice_number: String,
    pub invoice_sequence: i32,
    pub client_name: String,
    pub client_email: String,
    pub currency: String,
    pub status: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: String,
    pub vat_total: String,
    pub total: String,
    pub amount_due: String,
    pub amount_paid: String,
    pub paid_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub share_token: String,
    pub recurring_invoice_id: Option<String>,
    pub last_reminder_at: Option<NaiveDateTime>,
    pub reminder_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl InvoiceDB {
    pub fn into_invoice(self, items: Vec<InvoiceItem>) -> Result<Invoice> {
        Ok(Invoice {
            status: parse_text(&self.status, "invoices.status")?,
            subtotal: parse_decimal(&self.subtotal, "invoices.subtotal")?,
            vat_total: parse_decimal(&self.vat_total, "invoices.vat_total")?,
            total: parse_decimal(&self.total, "invoices.total")?,
            amount_due: parse_decimal(&self.amount_due, "invoices.amount_due")?,
            amount_paid: parse_decimal(&self.amount_paid, "invoices.amount_paid")?,
            id: self.id,
            user_id: self.user_id,
            invoice_number: self.invoice_number,
            client_name: self.client_name,
            client_email: self.client_email,
            currency: self.currency,
            issue_date: self.issue_date,
            due_date: self.due_date,
            paid_date: self.paid_date,
            notes: self.notes,
            share_token: self.share_token,
            recurring_invoice_id: self.recurring_invoice_id,
            last_reminder_at: self.last_reminder_at,
            reminder_count: self.reminder_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::invoice_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InvoiceItemDB {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub vat_rate: String,
    pub line_subtotal: String,
    pub line_vat: String,
    pub line_total: String,
    pub sort_order: i32,
}

impl InvoiceItemDB {
    pub fn from_line(id: String, invoice_id: &str, line: &ComputedLine, sort_order: i32) -> Self {
        Self {
            id,
            invoice_id: invoice_id.to_string(),
            description: line.description.clone(),
            quantity: decimal_text(line.quantity),
            unit_price: decimal_text(line.unit_price),
            vat_rate: decimal_text(line.vat_rate),
            line_subtotal: decimal_text(line.line_subtotal),
            line_vat: decimal_text(line.line_vat),
            line_total: decimal_text(line.line_total),
            sort_order,
        }
    }
}

impl TryFrom<InvoiceItemDB> for InvoiceItem {
    type Error = vuka_core::Error;

    fn try_from(db: InvoiceItemDB) -> Result<Self> {
        Ok(Self {
            quantity: parse_decimal(&db.quantity, "invoice_items.quantity")?,
            unit_price: parse_decimal(&db.unit_price, "invoice_items.unit_price")?,
            vat_rate: parse_decimal(&db.vat_rate, "invoice_items.vat_rate")?,
            line_subtotal: parse_decimal(&db.line_subtotal, "invoice_items.line_subtotal")?,
            line_vat: parse_decimal(&db.line_vat, "invoice_items.line_vat")?,
            line_total: parse_decimal(&db.line_total, "invoice_items.line_total")?,
            id: db.id,
            invoice_id: db.invoice_id,
            description: db.description,
            sort_order: db.sort_order,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::inbound_emails)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InboundEmailDB {
    pub id: String,
    pub invoice_id: Option<String>,
    pub from_address: String,
    pub subject: String,
    pub body_text: String,
    pub received_at: NaiveDateTime,
}

impl From<InboundEmailDB> for InboundEmail {
    fn from(db: InboundEmailDB) -> Self {
        Self {
            id: db.id,
            invoice_id: db.invoice_id,
            from_address: db.from_address,
            subject: db.subject,
            body_text: db.body_text,
            received_at: db.received_at,
        }
    }
}
