//! Email bodies for invoices and reminders.

use crate::invoices::Invoice;

fn money(invoice: &Invoice, amount: rust_decimal::Decimal) -> String {
    format!("{} {:.2}", invoice.currency, amount)
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn invoice_subject(invoice: &Invoice, business_name: &str) -> String {
    format!("Invoice {} from {}", invoice.invoice_number, business_name)
}

pub fn invoice_text(invoice: &Invoice, business_name: &str, pay_url: &str) -> String {
    format!(
        "Hi {client},\n\n{business} has sent you invoice {number} for {total}, due {due}.\n\nPay online: {url}\n",
        client = invoice.client_name,
        business = business_name,
        number = invoice.invoice_number,
        total = money(invoice, invoice.total),
        due = invoice.due_date.format("%d %B %Y"),
        url = pay_url,
    )
}

pub fn invoice_html(invoice: &Invoice, business_name: &str, pay_url: &str) -> String {
    format!(
        "<p>Hi {client},</p>\
         <p>{business} has sent you invoice <strong>{number}</strong> for <strong>{total}</strong>, due {due}.</p>\
         <p><a href=\"{url}\">View and pay invoice</a></p>",
        client = escape(&invoice.client_name),
        business = escape(business_name),
        number = escape(&invoice.invoice_number),
        total = money(invoice, invoice.total),
        due = invoice.due_date.format("%d %B %Y"),
        url = escape(pay_url),
    )
}

pub fn reminder_subject(invoice: &Invoice, business_name: &str) -> String {
    format!(
        "Reminder: invoice {} from {} is overdue",
        invoice.invoice_number, business_name
    )
}

pub fn reminder_text(invoice: &Invoice, business_name: &str, pay_url: &str) -> String {
    format!(
        "Hi {client},\n\nInvoice {number} from {business} for {due_amount} was due on {due}.\n\nPay online: {url}\n",
        client = invoice.client_name,
        number = invoice.invoice_number,
        business = business_name,
        due_amount = money(invoice, invoice.amount_due),
        due = invoice.due_date.format("%d %B %Y"),
        url = pay_url,
    )
}

pub fn reminder_html(invoice: &Invoice, business_name: &str, pay_url: &str) -> String {
    format!(
        "<p>Hi {client},</p>\
         <p>Invoice <strong>{number}</strong> from {business} for <strong>{due_amount}</strong> was due on {due}.</p>\
         <p><a href=\"{url}\">Pay now</a></p>",
        client = escape(&invoice.client_name),
        number = escape(&invoice.invoice_number),
        business = escape(business_name),
        due_amount = money(invoice, invoice.amount_due),
        due = invoice.due_date.format("%d %B %Y"),
        url = escape(pay_url),
    )
}
