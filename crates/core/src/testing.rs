//! In-memory repositories shared by service tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::deals::{Deal, DealRepositoryTrait, DealStatus, Investment, InvestmentOutcome, NewDeal};
use crate::errors::{Error, IntegrationError, Result};
use crate::invoices::{
    format_invoice_number, plan_transition, ComputedLine, InboundEmail, Invoice, InvoiceDraft,
    InvoiceLine, InvoiceRepositoryTrait, InvoiceStatus, InvoiceTotals, NewInboundEmail,
    TransitionOutcome, TransitionRequest,
};
use crate::notifications::{EmailMessage, EmailSender};
use crate::recurring::{
    Frequency, GeneratedOccurrence, NewRecurringInvoice, RecurringInvoice,
    RecurringInvoiceRepositoryTrait, RecurringInvoiceUpdate,
};
use crate::revenue::{
    ConnectionStatus, DistributionOutcome, NewRevenueConnection, NewRevenueReport, OAuthTokens,
    ReportSource, ReportingPeriod, RevenueConnection, RevenueProvider, RevenueReport,
    RevenueRepositoryTrait, RevenueSource, VerificationStatus,
};
use crate::secrets::TokenCipher;
use crate::users::{KycStatus, NewUser, User, UserCredentials, UserRepositoryTrait, UserRole};
use crate::wallets::{Transaction, TransactionStatus, TransactionType};

#[derive(Default)]
pub struct MockUserRepository {
    users: Mutex<Vec<UserCredentials>>,
}

impl MockUserRepository {
    /// Repository pre-seeded with the given users.
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(
                users
                    .into_iter()
                    .map(|user| UserCredentials {
                        user,
                        password_hash: "hash".to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

pub fn user(id: &str, role: UserRole, kyc_status: KycStatus) -> User {
    let now = Utc::now().naive_utc();
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role,
        full_name: format!("User {}", id),
        business_name: (role == UserRole::Business).then(|| format!("{} (Pty) Ltd", id)),
        vat_number: None,
        kyc_status,
        id_number: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UserRepositoryTrait for MockUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = Utc::now().naive_utc();
        let user = User {
            id: format!("user-{}", self.users.lock().unwrap().len() + 1),
            email: new_user.email,
            role: new_user.role,
            full_name: new_user.full_name,
            business_name: new_user.business_name,
            vat_number: new_user.vat_number,
            kyc_status: KycStatus::NotSubmitted,
            id_number: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().push(UserCredentials {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });
        Ok(user)
    }

    fn get_by_id(&self, user_id: &str) -> Result<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.user.id == user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.user.email == email)
            .cloned())
    }

    fn list(&self) -> Result<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.user.clone())
            .collect())
    }

    async fn update_kyc(
        &self,
        user_id: &str,
        status: KycStatus,
        id_number: Option<String>,
    ) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        let creds = users
            .iter_mut()
            .find(|c| c.user.id == user_id)
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))?;
        creds.user.kyc_status = status;
        creds.user.id_number = id_number;
        Ok(creds.user.clone())
    }
}

/// Email sender that keeps every message in memory.
#[derive(Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: bool,
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail {
            return Err(IntegrationError::Http {
                service: "email".to_string(),
                message: "connection refused".to_string(),
            }
            .into());
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Invoice store applying transitions in memory, without wallet effects.
#[derive(Default)]
pub struct MockInvoiceRepository {
    pub invoices: Mutex<Vec<Invoice>>,
    pub inbound: Mutex<Vec<InboundEmail>>,
}

impl MockInvoiceRepository {
    pub fn insert(&self, invoice: Invoice) {
        self.invoices.lock().unwrap().push(invoice);
    }

    pub fn find(&self, invoice_id: &str) -> Option<Invoice> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == invoice_id)
            .cloned()
    }
}

pub fn invoice(id: &str, user_id: &str, status: InvoiceStatus, total: Decimal) -> Invoice {
    let now = Utc::now().naive_utc();
    let issue = now.date();
    Invoice {
        id: id.to_string(),
        user_id: user_id.to_string(),
        invoice_number: format!("INV-{:0>5}", id.trim_start_matches("inv-")),
        client_name: "Naledi Mokoena".to_string(),
        client_email: "naledi@example.com".to_string(),
        currency: "ZAR".to_string(),
        status,
        issue_date: issue,
        due_date: issue,
        subtotal: total,
        vat_total: Decimal::ZERO,
        total,
        amount_due: if status == InvoiceStatus::Paid {
            Decimal::ZERO
        } else {
            total
        },
        amount_paid: if status == InvoiceStatus::Paid {
            total
        } else {
            Decimal::ZERO
        },
        paid_date: None,
        notes: None,
        share_token: format!("token-{}", id),
        recurring_invoice_id: None,
        last_reminder_at: None,
        reminder_count: 0,
        created_at: now,
        updated_at: now,
        items: Vec::new(),
    }
}

#[async_trait]
impl InvoiceRepositoryTrait for MockInvoiceRepository {
    async fn create(
        &self,
        user_id: &str,
        draft: InvoiceDraft,
        _lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice> {
        let count = self.invoices.lock().unwrap().len() + 1;
        let mut created = invoice(
            &format!("inv-{}", count),
            user_id,
            InvoiceStatus::Draft,
            totals.total,
        );
        created.invoice_number = format_invoice_number(count as i64);
        created.client_name = draft.client_name;
        created.client_email = draft.client_email;
        created.currency = draft.currency.unwrap_or_else(|| "ZAR".to_string());
        created.issue_date = draft.issue_date;
        created.due_date = draft.due_date;
        created.subtotal = totals.subtotal;
        created.vat_total = totals.vat_total;
        self.insert(created.clone());
        Ok(created)
    }

    async fn update_draft(
        &self,
        invoice_id: &str,
        draft: InvoiceDraft,
        _lines: Vec<ComputedLine>,
        totals: InvoiceTotals,
    ) -> Result<Invoice> {
        let mut invoices = self.invoices.lock().unwrap();
        let inv = invoices
            .iter_mut()
            .find(|i| i.id == invoice_id)
            .ok_or_else(|| Error::NotFound(format!("Invoice {}", invoice_id)))?;
        inv.client_name = draft.client_name;
        inv.total = totals.total;
        inv.amount_due = totals.total;
        Ok(inv.clone())
    }

    async fn delete_draft(&self, invoice_id: &str) -> Result<()> {
        self.invoices.lock().unwrap().retain(|i| i.id != invoice_id);
        Ok(())
    }

    fn get_by_id(&self, invoice_id: &str) -> Result<Invoice> {
        self.find(invoice_id)
            .ok_or_else(|| Error::NotFound(format!("Invoice {}", invoice_id)))
    }

    fn get_by_share_token(&self, share_token: &str) -> Result<Invoice> {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.share_token == share_token)
            .cloned()
            .ok_or_else(|| Error::NotFound("Invoice".to_string()))
    }

    fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.invoice_number == invoice_number)
            .cloned()
            .collect())
    }

    fn list_for_user(&self, user_id: &str, status: Option<InvoiceStatus>) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id && status.map_or(true, |s| i.status == s))
            .cloned()
            .collect())
    }

    async fn apply_transition(&self, request: TransitionRequest) -> Result<TransitionOutcome> {
        let mut invoices = self.invoices.lock().unwrap();
        let inv = invoices
            .iter_mut()
            .find(|i| i.id == request.invoice_id)
            .ok_or_else(|| Error::NotFound(format!("Invoice {}", request.invoice_id)))?;
        let plan = plan_transition(inv, request.target, request.mode)?;
        inv.apply_plan(&plan, request.now);
        Ok(TransitionOutcome {
            invoice: inv.clone(),
            transaction: None,
        })
    }

    fn list_past_due(&self, today: NaiveDate) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.is_overdue_on(today))
            .cloned()
            .collect())
    }

    fn list_reminder_due(
        &self,
        last_reminder_before: NaiveDateTime,
        max_reminders: i32,
    ) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.status == InvoiceStatus::Overdue
                    && i.reminder_count < max_reminders
                    && i.last_reminder_at.map_or(true, |at| at <= last_reminder_before)
            })
            .cloned()
            .collect())
    }

    async fn record_reminder(&self, invoice_id: &str, sent_at: NaiveDateTime) -> Result<()> {
        let mut invoices = self.invoices.lock().unwrap();
        if let Some(inv) = invoices.iter_mut().find(|i| i.id == invoice_id) {
            inv.reminder_count += 1;
            inv.last_reminder_at = Some(sent_at);
        }
        Ok(())
    }

    async fn record_inbound_email(&self, email: NewInboundEmail) -> Result<InboundEmail> {
        let mut inbound = self.inbound.lock().unwrap();
        let stored = InboundEmail {
            id: format!("mail-{}", inbound.len() + 1),
            invoice_id: email.invoice_id,
            from_address: email.from_address,
            subject: email.subject,
            body_text: email.body_text,
            received_at: email.received_at,
        };
        inbound.push(stored.clone());
        Ok(stored)
    }

    fn list_inbound_emails(&self, invoice_id: &str) -> Result<Vec<InboundEmail>> {
        Ok(self
            .inbound
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.invoice_id.as_deref() == Some(invoice_id))
            .cloned()
            .collect())
    }
}

pub fn deal(id: &str, business_id: &str, status: DealStatus, funding_goal: Decimal) -> Deal {
    let now = Utc::now().naive_utc();
    Deal {
        id: id.to_string(),
        business_id: business_id.to_string(),
        title: format!("Deal {}", id),
        description: "Expansion capital".to_string(),
        funding_goal,
        current_funding: Decimal::ZERO,
        min_investment: dec!(1000),
        revenue_share_percentage: dec!(10),
        repayment_multiple: dec!(1.5),
        total_repaid: Decimal::ZERO,
        status,
        funded_at: None,
        closes_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Deal store that records investments without touching wallets.
#[derive(Default)]
pub struct MockDealRepository {
    pub deals: Mutex<Vec<Deal>>,
    pub investments: Mutex<Vec<Investment>>,
}

impl MockDealRepository {
    pub fn with_deals(deals: Vec<Deal>) -> Self {
        Self {
            deals: Mutex::new(deals),
            investments: Mutex::new(Vec::new()),
        }
    }

    pub fn find(&self, deal_id: &str) -> Option<Deal> {
        self.deals
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == deal_id)
            .cloned()
    }

    fn update<F: FnOnce(&mut Deal)>(&self, deal_id: &str, change: F) -> Result<Deal> {
        let mut deals = self.deals.lock().unwrap();
        let deal = deals
            .iter_mut()
            .find(|d| d.id == deal_id)
            .ok_or_else(|| Error::NotFound(format!("Deal {}", deal_id)))?;
        change(deal);
        Ok(deal.clone())
    }
}

#[async_trait]
impl DealRepositoryTrait for MockDealRepository {
    async fn create(&self, business_id: &str, new_deal: NewDeal) -> Result<Deal> {
        let count = self.deals.lock().unwrap().len() + 1;
        let mut created = deal(
            &format!("deal-{}", count),
            business_id,
            DealStatus::Draft,
            new_deal.funding_goal,
        );
        created.title = new_deal.title;
        created.description = new_deal.description;
        created.min_investment = new_deal.min_investment;
        created.revenue_share_percentage = new_deal.revenue_share_percentage;
        created.repayment_multiple = new_deal.repayment_multiple;
        created.closes_at = new_deal.closes_at;
        self.deals.lock().unwrap().push(created.clone());
        Ok(created)
    }

    fn get_by_id(&self, deal_id: &str) -> Result<Deal> {
        self.find(deal_id)
            .ok_or_else(|| Error::NotFound(format!("Deal {}", deal_id)))
    }

    fn list(&self, status: Option<DealStatus>) -> Result<Vec<Deal>> {
        Ok(self
            .deals
            .lock()
            .unwrap()
            .iter()
            .filter(|d| status.map_or(true, |s| d.status == s))
            .cloned()
            .collect())
    }

    fn list_for_business(&self, business_id: &str) -> Result<Vec<Deal>> {
        Ok(self
            .deals
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        deal_id: &str,
        status: DealStatus,
        now: NaiveDateTime,
    ) -> Result<Deal> {
        self.update(deal_id, |d| {
            d.status = status;
            d.updated_at = now;
        })
    }

    async fn invest(
        &self,
        deal_id: &str,
        investor_id: &str,
        amount: Decimal,
        now: NaiveDateTime,
    ) -> Result<InvestmentOutcome> {
        self.get_by_id(deal_id)?.validate_investment(amount, now)?;
        let deal = self.update(deal_id, |d| {
            d.current_funding += amount;
            if d.is_fully_funded() {
                d.status = DealStatus::Funded;
                d.funded_at = Some(now);
            }
        })?;

        let mut investments = self.investments.lock().unwrap();
        let investment = Investment {
            id: format!("inv-{}", investments.len() + 1),
            deal_id: deal_id.to_string(),
            investor_id: investor_id.to_string(),
            amount,
            share_percentage: Decimal::ZERO,
            total_received: Decimal::ZERO,
            created_at: now,
        };
        investments.push(investment.clone());
        let transaction = Transaction {
            id: format!("tx-{}", investment.id),
            wallet_id: format!("wallet-{}", investor_id),
            user_id: investor_id.to_string(),
            transaction_type: TransactionType::Investment,
            status: TransactionStatus::Completed,
            amount: -amount,
            fee: Decimal::ZERO,
            net_amount: -amount,
            currency: "ZAR".to_string(),
            description: format!("Investment in {}", deal.title),
            metadata: None,
            invoice_id: None,
            deal_id: Some(deal_id.to_string()),
            gateway: None,
            gateway_reference: None,
            locked_until: None,
            released: true,
            created_at: now,
        };
        Ok(InvestmentOutcome {
            investment,
            deal,
            transaction,
        })
    }

    async fn cancel(&self, deal_id: &str, now: NaiveDateTime) -> Result<Deal> {
        self.set_status(deal_id, DealStatus::Cancelled, now).await
    }

    fn list_investments_for_deal(&self, deal_id: &str) -> Result<Vec<Investment>> {
        Ok(self
            .investments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.deal_id == deal_id)
            .cloned()
            .collect())
    }

    fn list_investments_for_investor(&self, investor_id: &str) -> Result<Vec<Investment>> {
        Ok(self
            .investments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.investor_id == investor_id)
            .cloned()
            .collect())
    }
}

/// Cipher that marks ciphertext with an `enc:` prefix.
#[derive(Default)]
pub struct PrefixCipher;

impl TokenCipher for PrefixCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(format!("enc:{}", plaintext))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| Error::Secret("token was not encrypted".to_string()))
    }
}

pub fn connection(
    id: &str,
    user_id: &str,
    provider: RevenueProvider,
    access_token: &str,
    expires_at: Option<NaiveDateTime>,
) -> RevenueConnection {
    let now = Utc::now().naive_utc();
    RevenueConnection {
        id: id.to_string(),
        user_id: user_id.to_string(),
        provider,
        external_account_id: format!("acct-{}", id),
        access_token: access_token.to_string(),
        refresh_token: Some(format!("enc:refresh-{}", id)),
        token_expires_at: expires_at,
        status: ConnectionStatus::Active,
        last_synced_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn report(id: &str, deal_id: &str, period: &str, reported_revenue: Decimal) -> RevenueReport {
    let now = Utc::now().naive_utc();
    RevenueReport {
        id: id.to_string(),
        deal_id: deal_id.to_string(),
        period: period.to_string(),
        reported_revenue,
        verified_revenue: None,
        source: ReportSource::Manual,
        verification_status: VerificationStatus::Unverified,
        payout_amount: None,
        distributed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct MockRevenueRepository {
    pub connections: Mutex<Vec<RevenueConnection>>,
    pub reports: Mutex<Vec<RevenueReport>>,
}

impl MockRevenueRepository {
    pub fn connection(&self, connection_id: &str) -> Option<RevenueConnection> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == connection_id)
            .cloned()
    }

    pub fn report(&self, report_id: &str) -> Option<RevenueReport> {
        self.reports
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
    }

    fn update_connection<F: FnOnce(&mut RevenueConnection)>(
        &self,
        connection_id: &str,
        change: F,
    ) -> Result<()> {
        let mut connections = self.connections.lock().unwrap();
        let found = connections
            .iter_mut()
            .find(|c| c.id == connection_id)
            .ok_or_else(|| Error::NotFound(format!("Revenue connection {}", connection_id)))?;
        change(found);
        Ok(())
    }
}

#[async_trait]
impl RevenueRepositoryTrait for MockRevenueRepository {
    async fn create_connection(
        &self,
        user_id: &str,
        new_connection: NewRevenueConnection,
    ) -> Result<RevenueConnection> {
        let mut connections = self.connections.lock().unwrap();
        let mut created = connection(
            &format!("conn-{}", connections.len() + 1),
            user_id,
            new_connection.provider,
            &new_connection.access_token,
            new_connection.token_expires_at,
        );
        created.external_account_id = new_connection.external_account_id;
        created.refresh_token = new_connection.refresh_token;
        connections.push(created.clone());
        Ok(created)
    }

    fn list_connections(&self, user_id: &str) -> Result<Vec<RevenueConnection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_active_connection(&self, user_id: &str) -> Result<Option<RevenueConnection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.user_id == user_id && c.status == ConnectionStatus::Active)
            .cloned())
    }

    async fn update_connection_tokens(
        &self,
        connection_id: &str,
        tokens: OAuthTokens,
        now: NaiveDateTime,
    ) -> Result<()> {
        self.update_connection(connection_id, |c| {
            c.access_token = tokens.access_token;
            if tokens.refresh_token.is_some() {
                c.refresh_token = tokens.refresh_token;
            }
            c.token_expires_at = tokens.expires_at;
            c.updated_at = now;
        })
    }

    async fn set_connection_status(
        &self,
        connection_id: &str,
        status: ConnectionStatus,
        now: NaiveDateTime,
    ) -> Result<()> {
        self.update_connection(connection_id, |c| {
            c.status = status;
            c.updated_at = now;
        })
    }

    async fn mark_connection_synced(
        &self,
        connection_id: &str,
        now: NaiveDateTime,
    ) -> Result<()> {
        self.update_connection(connection_id, |c| c.last_synced_at = Some(now))
    }

    async fn create_report(
        &self,
        new_report: NewRevenueReport,
        source: ReportSource,
    ) -> Result<RevenueReport> {
        let mut reports = self.reports.lock().unwrap();
        if reports
            .iter()
            .any(|r| r.deal_id == new_report.deal_id && r.period == new_report.period)
        {
            return Err(Error::Conflict(format!(
                "Revenue for {} was already reported",
                new_report.period
            )));
        }
        let mut created = report(
            &format!("rep-{}", reports.len() + 1),
            &new_report.deal_id,
            &new_report.period,
            new_report.reported_revenue,
        );
        created.source = source;
        reports.push(created.clone());
        Ok(created)
    }

    fn get_report(&self, report_id: &str) -> Result<RevenueReport> {
        self.report(report_id)
            .ok_or_else(|| Error::NotFound(format!("Revenue report {}", report_id)))
    }

    fn list_reports_for_deal(&self, deal_id: &str) -> Result<Vec<RevenueReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.deal_id == deal_id)
            .cloned()
            .collect())
    }

    fn list_unverified_reports(&self) -> Result<Vec<RevenueReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.verification_status == VerificationStatus::Unverified
                    && r.distributed_at.is_none()
            })
            .cloned()
            .collect())
    }

    async fn set_verification(
        &self,
        report_id: &str,
        verified_revenue: Decimal,
        status: VerificationStatus,
        now: NaiveDateTime,
    ) -> Result<RevenueReport> {
        let mut reports = self.reports.lock().unwrap();
        let found = reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| Error::NotFound(format!("Revenue report {}", report_id)))?;
        found.verified_revenue = Some(verified_revenue);
        found.verification_status = status;
        found.updated_at = now;
        Ok(found.clone())
    }

    async fn distribute(
        &self,
        report_id: &str,
        _now: NaiveDateTime,
    ) -> Result<DistributionOutcome> {
        Err(Error::Unexpected(format!(
            "in-memory store cannot distribute report {}",
            report_id
        )))
    }
}

/// Revenue source answering from a fixed table of monthly figures.
///
/// Periods missing from the table fail with an upstream error.
pub struct MockRevenueSource {
    provider: RevenueProvider,
    revenue: HashMap<String, Decimal>,
    refreshed: Option<OAuthTokens>,
    /// Access tokens the source was called with.
    pub seen_tokens: Mutex<Vec<String>>,
}

impl MockRevenueSource {
    pub fn new(provider: RevenueProvider) -> Self {
        Self {
            provider,
            revenue: HashMap::new(),
            refreshed: None,
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn with_revenue(mut self, period: &str, amount: Decimal) -> Self {
        self.revenue.insert(period.to_string(), amount);
        self
    }

    /// Tokens handed out when the stored ones have expired.
    pub fn with_refresh(mut self, tokens: OAuthTokens) -> Self {
        self.refreshed = Some(tokens);
        self
    }
}

#[async_trait]
impl RevenueSource for MockRevenueSource {
    fn provider(&self) -> RevenueProvider {
        self.provider
    }

    async fn refresh_if_needed(
        &self,
        connection: &RevenueConnection,
        now: NaiveDateTime,
    ) -> Result<Option<OAuthTokens>> {
        let expired = connection.token_expires_at.is_some_and(|at| at <= now);
        Ok(if expired { self.refreshed.clone() } else { None })
    }

    async fn fetch_monthly_revenue(
        &self,
        connection: &RevenueConnection,
        period: &ReportingPeriod,
    ) -> Result<Decimal> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(connection.access_token.clone());
        self.revenue.get(&period.to_string()).copied().ok_or_else(|| {
            IntegrationError::UpstreamStatus {
                service: self.provider.to_string(),
                status: 503,
                body: "statement unavailable".to_string(),
            }
            .into()
        })
    }
}

pub fn recurring_template(
    id: &str,
    user_id: &str,
    frequency: Frequency,
    start_date: NaiveDate,
) -> RecurringInvoice {
    let now = Utc::now().naive_utc();
    RecurringInvoice {
        id: id.to_string(),
        user_id: user_id.to_string(),
        client_name: "Thandi Nkosi".to_string(),
        client_email: "thandi@example.com".to_string(),
        currency: "ZAR".to_string(),
        items: vec![InvoiceLine {
            description: "Monthly bookkeeping".to_string(),
            quantity: Decimal::ONE,
            unit_price: dec!(2000),
            vat_rate: None,
        }],
        notes: None,
        frequency,
        start_date,
        next_run_date: start_date,
        end_date: None,
        days_until_due: 14,
        is_active: true,
        auto_send: false,
        last_generated_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Recurring template store that writes generated invoices to a shared
/// [`MockInvoiceRepository`].
pub struct MockRecurringRepository {
    pub templates: Mutex<Vec<RecurringInvoice>>,
    invoices: Arc<MockInvoiceRepository>,
}

impl MockRecurringRepository {
    pub fn new(invoices: Arc<MockInvoiceRepository>) -> Self {
        Self {
            templates: Mutex::new(Vec::new()),
            invoices,
        }
    }

    pub fn insert(&self, template: RecurringInvoice) {
        self.templates.lock().unwrap().push(template);
    }

    pub fn find(&self, template_id: &str) -> Option<RecurringInvoice> {
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == template_id)
            .cloned()
    }
}

#[async_trait]
impl RecurringInvoiceRepositoryTrait for MockRecurringRepository {
    async fn create(
        &self,
        user_id: &str,
        template: NewRecurringInvoice,
        currency: String,
    ) -> Result<RecurringInvoice> {
        let mut templates = self.templates.lock().unwrap();
        let mut created = recurring_template(
            &format!("rec-{}", templates.len() + 1),
            user_id,
            template.frequency,
            template.start_date,
        );
        created.client_name = template.client_name;
        created.client_email = template.client_email;
        created.currency = currency;
        created.items = template.items;
        created.notes = template.notes;
        created.end_date = template.end_date;
        created.days_until_due = template.days_until_due;
        created.auto_send = template.auto_send;
        templates.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        template_id: &str,
        update: RecurringInvoiceUpdate,
        currency: String,
    ) -> Result<RecurringInvoice> {
        let mut templates = self.templates.lock().unwrap();
        let existing = templates
            .iter_mut()
            .find(|t| t.id == template_id)
            .ok_or_else(|| Error::NotFound(format!("Recurring invoice {}", template_id)))?;
        let template = update.template;
        existing.client_name = template.client_name;
        existing.client_email = template.client_email;
        existing.currency = currency;
        existing.items = template.items;
        existing.frequency = template.frequency;
        existing.start_date = template.start_date;
        existing.next_run_date = existing.next_run_date.max(template.start_date);
        existing.end_date = template.end_date;
        existing.is_active = update.is_active;
        existing.auto_send = template.auto_send;
        Ok(existing.clone())
    }

    async fn delete(&self, template_id: &str) -> Result<()> {
        self.templates.lock().unwrap().retain(|t| t.id != template_id);
        Ok(())
    }

    fn get_by_id(&self, template_id: &str) -> Result<RecurringInvoice> {
        self.find(template_id)
            .ok_or_else(|| Error::NotFound(format!("Recurring invoice {}", template_id)))
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringInvoice>> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn list_due(&self, today: NaiveDate) -> Result<Vec<RecurringInvoice>> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_active && t.next_run_date <= today)
            .cloned()
            .collect())
    }

    async fn generate_occurrence(
        &self,
        occurrence: GeneratedOccurrence,
    ) -> Result<Option<Invoice>> {
        let user_id = {
            let mut templates = self.templates.lock().unwrap();
            let Some(template) = templates.iter_mut().find(|t| {
                t.id == occurrence.template_id
                    && t.is_active
                    && t.next_run_date == occurrence.expected_run_date
            }) else {
                return Ok(None);
            };
            template.next_run_date = occurrence.next_run_date;
            template.is_active = !occurrence.deactivate;
            template.last_generated_at = Some(occurrence.now);
            template.user_id.clone()
        };

        let mut created = self
            .invoices
            .create(&user_id, occurrence.draft, occurrence.lines, occurrence.totals)
            .await?;
        created.recurring_invoice_id = Some(occurrence.template_id.clone());
        let mut invoices = self.invoices.invoices.lock().unwrap();
        if let Some(stored) = invoices.iter_mut().find(|i| i.id == created.id) {
            stored.recurring_invoice_id = created.recurring_invoice_id.clone();
        }
        Ok(Some(created))
    }

    async fn deactivate(&self, template_id: &str, now: NaiveDateTime) -> Result<()> {
        let mut templates = self.templates.lock().unwrap();
        if let Some(template) = templates.iter_mut().find(|t| t.id == template_id) {
            template.is_active = false;
            template.updated_at = now;
        }
        Ok(())
    }
}
