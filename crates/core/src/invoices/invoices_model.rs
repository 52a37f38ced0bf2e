//! Invoice domain models and VAT arithmetic.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constants::INVOICE_NUMBER_PREFIX;
use crate::errors::{Error, Result};
use crate::fx::normalize_currency_code;
use crate::utils::money::{percent_of, round_money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    Refunded,
}

crate::text_enum!(InvoiceStatus {
    Draft => "DRAFT",
    Sent => "SENT",
    Paid => "PAID",
    Overdue => "OVERDUE",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub user_id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub total: Decimal,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub paid_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub share_token: String,
    pub recurring_invoice_id: Option<String>,
    pub last_reminder_at: Option<NaiveDateTime>,
    pub reminder_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
}

impl Invoice {
    pub fn is_editable(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Sent && self.due_date < today
    }

    pub fn pay_url(&self, public_base_url: &str) -> String {
        format!(
            "{}/pay/{}",
            public_base_url.trim_end_matches('/'),
            self.share_token
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    pub line_subtotal: Decimal,
    pub line_vat: Decimal,
    pub line_total: Decimal,
    pub sort_order: i32,
}

/// A line as entered by the business. `vat_rate` falls back to the invoice default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vat_rate: Decimal,
    pub line_subtotal: Decimal,
    pub line_vat: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub total: Decimal,
}

/// Prices every line and sums the invoice. Each figure is rounded to cents
/// per line, and the invoice totals are sums of the rounded line figures.
pub fn compute_lines(
    lines: &[InvoiceLine],
    default_vat_rate: Decimal,
) -> Result<(Vec<ComputedLine>, InvoiceTotals)> {
    if lines.is_empty() {
        return Err(Error::invalid_input("An invoice needs at least one item"));
    }

    let mut computed = Vec::with_capacity(lines.len());
    let mut totals = InvoiceTotals::default();
    for line in lines {
        if line.description.trim().is_empty() {
            return Err(Error::invalid_input("Item description cannot be empty"));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(Error::invalid_input("Item quantity must be positive"));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(Error::invalid_input("Item price cannot be negative"));
        }
        let vat_rate = line.vat_rate.unwrap_or(default_vat_rate);
        if !(Decimal::ZERO..=dec!(100)).contains(&vat_rate) {
            return Err(Error::invalid_input(format!(
                "VAT rate {} is out of range",
                vat_rate
            )));
        }

        let line_subtotal = round_money(line.quantity * line.unit_price);
        let line_vat = percent_of(line_subtotal, vat_rate);
        let line_total = line_subtotal + line_vat;

        totals.subtotal += line_subtotal;
        totals.vat_total += line_vat;
        totals.total += line_total;
        computed.push(ComputedLine {
            description: line.description.trim().to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            vat_rate,
            line_subtotal,
            line_vat,
            line_total,
        });
    }
    Ok((computed, totals))
}

pub fn format_invoice_number(sequence: i64) -> String {
    format!("{}{:05}", INVOICE_NUMBER_PREFIX, sequence)
}

/// Input for creating or replacing a draft invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub client_name: String,
    pub client_email: String,
    pub currency: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<InvoiceLine>,
}

impl InvoiceDraft {
    /// Checks the header fields and normalizes the currency code.
    pub fn validate(&mut self, default_currency: &str) -> Result<()> {
        if self.client_name.trim().is_empty() {
            return Err(Error::invalid_input("Client name cannot be empty"));
        }
        if !self.client_email.contains('@') {
            return Err(Error::invalid_input("A valid client email is required"));
        }
        if self.due_date < self.issue_date {
            return Err(Error::invalid_input(
                "Due date cannot be before the issue date",
            ));
        }
        let currency = self.currency.as_deref().unwrap_or(default_currency);
        self.currency = Some(normalize_currency_code(currency)?);
        self.client_email = self.client_email.trim().to_lowercase();
        self.client_name = self.client_name.trim().to_string();
        Ok(())
    }
}

/// What a payer sees behind the share link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicInvoice {
    pub invoice_number: String,
    pub business_name: String,
    pub client_name: String,
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    pub total: Decimal,
    pub amount_due: Decimal,
    pub items: Vec<InvoiceItem>,
    pub payable: bool,
}

impl PublicInvoice {
    pub fn from_invoice(invoice: Invoice, business_name: &str) -> Self {
        let payable = matches!(
            invoice.status,
            InvoiceStatus::Sent | InvoiceStatus::Overdue
        );
        Self {
            invoice_number: invoice.invoice_number,
            business_name: business_name.to_string(),
            client_name: invoice.client_name,
            currency: invoice.currency,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            subtotal: invoice.subtotal,
            vat_total: invoice.vat_total,
            total: invoice.total,
            amount_due: invoice.amount_due,
            items: invoice.items,
            payable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundEmail {
    pub id: String,
    pub invoice_id: Option<String>,
    pub from_address: String,
    pub subject: String,
    pub body_text: String,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewInboundEmail {
    pub invoice_id: Option<String>,
    pub from_address: String,
    pub subject: String,
    pub body_text: String,
    pub received_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    pub marked_overdue: usize,
    pub reminders_sent: usize,
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: Decimal, price: Decimal, vat: Option<Decimal>) -> InvoiceLine {
        InvoiceLine {
            description: "Consulting".to_string(),
            quantity: qty,
            unit_price: price,
            vat_rate: vat,
        }
    }

    #[test]
    fn totals_apply_default_vat() {
        let (lines, totals) = compute_lines(
            &[line(dec!(2), dec!(500), None), line(dec!(1), dec!(99.99), Some(dec!(0)))],
            dec!(15),
        )
        .unwrap();
        assert_eq!(lines[0].line_vat, dec!(150.00));
        assert_eq!(lines[1].line_vat, dec!(0.00));
        assert_eq!(totals.subtotal, dec!(1099.99));
        assert_eq!(totals.vat_total, dec!(150.00));
        assert_eq!(totals.total, dec!(1249.99));
    }

    #[test]
    fn vat_rounds_per_line_to_cents() {
        let (lines, totals) = compute_lines(&[line(dec!(3), dec!(0.33), None)], dec!(15)).unwrap();
        assert_eq!(lines[0].line_subtotal, dec!(0.99));
        assert_eq!(lines[0].line_vat, dec!(0.15));
        assert_eq!(totals.total, dec!(1.14));
    }

    #[test]
    fn rejects_empty_and_invalid_lines() {
        assert!(compute_lines(&[], dec!(15)).is_err());
        assert!(compute_lines(&[line(dec!(0), dec!(1), None)], dec!(15)).is_err());
        assert!(compute_lines(&[line(dec!(1), dec!(1), Some(dec!(101)))], dec!(15)).is_err());
    }

    #[test]
    fn invoice_numbers_are_zero_padded() {
        assert_eq!(format_invoice_number(1), "INV-00001");
        assert_eq!(format_invoice_number(123456), "INV-123456");
    }

    #[test]
    fn draft_validation_normalizes_currency() {
        let mut draft = InvoiceDraft {
            client_name: " Thandi ".to_string(),
            client_email: "Thandi@Example.com".to_string(),
            currency: Some("usd".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            notes: None,
            items: vec![],
        };
        draft.validate("ZAR").unwrap();
        assert_eq!(draft.currency.as_deref(), Some("USD"));
        assert_eq!(draft.client_email, "thandi@example.com");
        assert_eq!(draft.client_name, "Thandi");
    }
}
