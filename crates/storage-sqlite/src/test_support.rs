//! Fixtures shared by the repository tests.

use chrono::{NaiveDate, Utc};
use diesel::RunQueryDsl;
use rust_decimal::Decimal;
use std::sync::Arc;
use tempfile::TempDir;

use vuka_core::invoices::{
    compute_lines, Invoice, InvoiceDraft, InvoiceLine, InvoiceRepositoryTrait,
};

use crate::db::{create_pool, get_connection, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::invoices::InvoiceRepository;
use crate::utils::new_id;

pub struct TestDb {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    _dir: TempDir,
}

/// Fresh migrated database in a temp directory.
pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db").to_string_lossy().to_string();
    let pool = create_pool(&db_path).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    let writer = spawn_writer((*pool).clone()).expect("Failed to spawn writer");
    TestDb {
        pool,
        writer,
        _dir: dir,
    }
}

pub fn insert_user(db: &TestDb, role: &str) -> String {
    let id = new_id();
    let mut conn = get_connection(&db.pool).expect("Failed to get connection");
    diesel::sql_query(format!(
        "INSERT INTO users (id, email, password_hash, role, full_name, kyc_status, created_at, updated_at) \
         VALUES ('{id}', '{id}@example.co.za', 'hash', '{role}', 'Test User', 'APPROVED', datetime('now'), datetime('now'))"
    ))
    .execute(&mut conn)
    .expect("Failed to create test user");
    id
}

/// Gives the user a wallet with spendable funds.
pub fn fund_wallet(db: &TestDb, user_id: &str, available: Decimal) {
    let mut conn = get_connection(&db.pool).expect("Failed to get connection");
    diesel::sql_query(format!(
        "INSERT INTO wallets (id, user_id, currency, balance, available_balance, locked_balance, created_at, updated_at) \
         VALUES ('{}', '{user_id}', 'ZAR', '{available}', '{available}', '0', datetime('now'), datetime('now'))",
        new_id()
    ))
    .execute(&mut conn)
    .expect("Failed to fund wallet");
}

pub fn draft(currency: &str, unit_price: Decimal) -> InvoiceDraft {
    InvoiceDraft {
        client_name: "Acme Trading".to_string(),
        client_email: "accounts@acme.co.za".to_string(),
        currency: Some(currency.to_string()),
        issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        notes: None,
        items: vec![InvoiceLine {
            description: "Consulting".to_string(),
            quantity: Decimal::ONE,
            unit_price,
            vat_rate: None,
        }],
    }
}

/// Creates a draft invoice priced at `unit_price` plus 15% VAT.
pub async fn create_invoice(
    db: &TestDb,
    user_id: &str,
    currency: &str,
    unit_price: Decimal,
) -> Invoice {
    let draft = draft(currency, unit_price);
    let (lines, totals) =
        compute_lines(&draft.items, vuka_core::constants::DEFAULT_VAT_RATE).unwrap();
    InvoiceRepository::new(db.pool.clone(), db.writer.clone())
        .create(user_id, draft, lines, totals)
        .await
        .expect("Failed to create invoice")
}

pub fn now() -> chrono::NaiveDateTime {
    Utc::now().naive_utc()
}

pub struct DealFixture {
    pub deal: vuka_core::deals::Deal,
    pub business_id: String,
    pub investor_ids: Vec<String>,
}

pub fn new_deal(funding_goal: Decimal) -> vuka_core::deals::NewDeal {
    vuka_core::deals::NewDeal {
        title: "Solar Kiosk Expansion".to_string(),
        description: "Three new kiosks in Soweto".to_string(),
        funding_goal,
        min_investment: Decimal::ONE_THOUSAND,
        revenue_share_percentage: Decimal::TEN,
        repayment_multiple: Decimal::new(15, 1),
        closes_at: None,
    }
}

/// Active deal for a fresh business. Investors get `investor_funds` each.
pub async fn active_deal(
    db: &TestDb,
    funding_goal: Decimal,
    investors: usize,
    investor_funds: Decimal,
) -> DealFixture {
    use vuka_core::deals::{DealRepositoryTrait, DealStatus};

    let business_id = insert_user(db, "BUSINESS");
    let investor_ids = (0..investors)
        .map(|_| {
            let id = insert_user(db, "INVESTOR");
            fund_wallet(db, &id, investor_funds);
            id
        })
        .collect();
    let repo = crate::deals::DealRepository::new(db.pool.clone(), db.writer.clone());
    let deal = repo
        .create(&business_id, new_deal(funding_goal))
        .await
        .expect("Failed to create deal");
    let deal = repo
        .set_status(&deal.id, DealStatus::Active, now())
        .await
        .expect("Failed to publish deal");
    DealFixture {
        deal,
        business_id,
        investor_ids,
    }
}
