//! Posting rules: each function mutates a wallet and returns the matching ledger row.
//!
//! Callers run these inside one database transaction together with the
//! wallet update and the ledger insert.

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::json;

use super::wallets_model::{NewTransaction, TransactionStatus, TransactionType, Wallet};
use crate::constants::WALLET_LOCK_PERIOD_DAYS;
use crate::errors::Result;
use crate::fx::ConvertedAmount;
use crate::invoices::Invoice;
use crate::payments::Gateway;
use crate::utils::money::round_money;

/// Money received for an invoice, already converted into the wallet currency.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePayment {
    pub converted: ConvertedAmount,
    /// Gateway fee in the wallet currency.
    pub fee: Decimal,
    pub gateway: Option<Gateway>,
    pub gateway_reference: Option<String>,
}

fn entry(
    wallet: &Wallet,
    transaction_type: TransactionType,
    status: TransactionStatus,
    amount: Decimal,
    fee: Decimal,
    description: String,
    now: NaiveDateTime,
) -> NewTransaction {
    let amount = round_money(amount);
    let fee = round_money(fee);
    NewTransaction {
        wallet_id: wallet.id.clone(),
        user_id: wallet.user_id.clone(),
        transaction_type,
        status,
        amount,
        fee,
        net_amount: amount - fee,
        currency: wallet.currency.clone(),
        description,
        metadata: None,
        invoice_id: None,
        deal_id: None,
        gateway: None,
        gateway_reference: None,
        locked_until: None,
        released: false,
        created_at: now,
    }
}

pub fn lock_expiry(now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::days(WALLET_LOCK_PERIOD_DAYS)
}

/// Credits an invoice payment into locked funds for the settlement period.
pub fn post_invoice_deposit(
    wallet: &mut Wallet,
    invoice: &Invoice,
    payment: &InvoicePayment,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    let gross = round_money(payment.converted.amount);
    let fee = round_money(payment.fee).min(gross);
    wallet.credit_locked(gross - fee)?;

    let mut tx = entry(
        wallet,
        TransactionType::Deposit,
        TransactionStatus::Completed,
        gross,
        fee,
        format!("Payment received for invoice {}", invoice.invoice_number),
        now,
    );
    tx.invoice_id = Some(invoice.id.clone());
    tx.gateway = payment.gateway;
    tx.gateway_reference = payment.gateway_reference.clone();
    tx.locked_until = Some(lock_expiry(now));
    if payment.converted.is_conversion() {
        tx.metadata = Some(json!({
            "originalAmount": payment.converted.original_amount,
            "originalCurrency": payment.converted.original_currency,
            "rate": payment.converted.rate,
        }));
    }
    Ok(tx)
}

/// Takes back an invoice deposit after cancellation or refund.
///
/// The row records what was actually removed, so it can be smaller than
/// `amount` when the wallet had already been drawn down.
pub fn post_invoice_reversal(
    wallet: &mut Wallet,
    invoice: &Invoice,
    amount: Decimal,
    reason: &str,
    now: NaiveDateTime,
) -> NewTransaction {
    let requested = round_money(amount);
    let removed = wallet.reverse_credit(requested);

    let mut tx = entry(
        wallet,
        TransactionType::Refund,
        TransactionStatus::Completed,
        -removed,
        Decimal::ZERO,
        format!("Invoice {} {}", invoice.invoice_number, reason),
        now,
    );
    tx.invoice_id = Some(invoice.id.clone());
    if removed < requested {
        tx.metadata = Some(json!({
            "requested": requested,
            "shortfall": requested - removed,
        }));
    }
    tx
}

/// A success notification for an invoice that is already paid. No money moves;
/// the row waits for an admin to decide.
pub fn post_flagged_duplicate(
    wallet: &Wallet,
    invoice: &Invoice,
    amount: Decimal,
    gateway: Gateway,
    gateway_reference: &str,
    now: NaiveDateTime,
) -> NewTransaction {
    let mut tx = entry(
        wallet,
        TransactionType::Deposit,
        TransactionStatus::Flagged,
        amount,
        Decimal::ZERO,
        format!(
            "Possible duplicate payment for invoice {}",
            invoice.invoice_number
        ),
        now,
    );
    tx.invoice_id = Some(invoice.id.clone());
    tx.gateway = Some(gateway);
    tx.gateway_reference = Some(gateway_reference.to_string());
    tx.metadata = Some(json!({
        "duplicate": true,
        "invoiceStatus": invoice.status.as_str(),
        "paidDate": invoice.paid_date,
    }));
    tx
}

/// A failed gateway payment, kept for the audit trail.
pub fn post_failed_payment(
    wallet: &Wallet,
    invoice: &Invoice,
    amount: Decimal,
    gateway: Gateway,
    gateway_reference: &str,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> NewTransaction {
    let mut tx = entry(
        wallet,
        TransactionType::Deposit,
        TransactionStatus::Failed,
        amount,
        Decimal::ZERO,
        format!("Failed payment for invoice {}", invoice.invoice_number),
        now,
    );
    tx.invoice_id = Some(invoice.id.clone());
    tx.gateway = Some(gateway);
    tx.gateway_reference = Some(gateway_reference.to_string());
    tx.metadata = reason.map(|r| json!({ "reason": r }));
    tx
}

pub fn post_withdrawal(
    wallet: &mut Wallet,
    amount: Decimal,
    fee: Decimal,
    bank_account_reference: Option<&str>,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    wallet.debit_available(round_money(amount) + round_money(fee))?;
    let mut tx = entry(
        wallet,
        TransactionType::Withdrawal,
        TransactionStatus::Completed,
        -amount,
        fee,
        "Withdrawal to bank account".to_string(),
        now,
    );
    tx.metadata = bank_account_reference.map(|r| json!({ "bankAccount": r }));
    Ok(tx)
}

pub fn post_investment(
    wallet: &mut Wallet,
    deal_id: &str,
    deal_title: &str,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    wallet.debit_available(round_money(amount))?;
    let mut tx = entry(
        wallet,
        TransactionType::Investment,
        TransactionStatus::Completed,
        -amount,
        Decimal::ZERO,
        format!("Investment in {}", deal_title),
        now,
    );
    tx.deal_id = Some(deal_id.to_string());
    Ok(tx)
}

/// Returns an investment to the investor when a deal is cancelled.
pub fn post_investment_refund(
    wallet: &mut Wallet,
    deal_id: &str,
    deal_title: &str,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    wallet.credit_available(round_money(amount))?;
    let mut tx = entry(
        wallet,
        TransactionType::Refund,
        TransactionStatus::Completed,
        amount,
        Decimal::ZERO,
        format!("Refund for cancelled deal {}", deal_title),
        now,
    );
    tx.deal_id = Some(deal_id.to_string());
    Ok(tx)
}

/// Pays raised capital to the business, less the platform fee, into locked funds.
pub fn post_deal_funding(
    wallet: &mut Wallet,
    deal_id: &str,
    deal_title: &str,
    raised: Decimal,
    platform_fee: Decimal,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    let raised = round_money(raised);
    let fee = round_money(platform_fee).min(raised);
    wallet.credit_locked(raised - fee)?;
    let mut tx = entry(
        wallet,
        TransactionType::DealFunding,
        TransactionStatus::Completed,
        raised,
        fee,
        format!("Funding raised for {}", deal_title),
        now,
    );
    tx.deal_id = Some(deal_id.to_string());
    tx.locked_until = Some(lock_expiry(now));
    Ok(tx)
}

pub fn post_revenue_share_payment(
    wallet: &mut Wallet,
    deal_id: &str,
    period: &str,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    wallet.debit_available(round_money(amount))?;
    let mut tx = entry(
        wallet,
        TransactionType::RevenueSharePayment,
        TransactionStatus::Completed,
        -amount,
        Decimal::ZERO,
        format!("Revenue share for {}", period),
        now,
    );
    tx.deal_id = Some(deal_id.to_string());
    Ok(tx)
}

pub fn post_revenue_share(
    wallet: &mut Wallet,
    deal_id: &str,
    period: &str,
    amount: Decimal,
    now: NaiveDateTime,
) -> Result<NewTransaction> {
    wallet.credit_available(round_money(amount))?;
    let mut tx = entry(
        wallet,
        TransactionType::RevenueShare,
        TransactionStatus::Completed,
        amount,
        Decimal::ZERO,
        format!("Revenue share payout for {}", period),
        now,
    );
    tx.deal_id = Some(deal_id.to_string());
    Ok(tx)
}
