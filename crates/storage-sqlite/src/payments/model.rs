//! Database model for gateway checkouts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::payments::Checkout;
use vuka_core::{Error, Result};

use crate::utils::{parse_decimal, parse_text};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::checkouts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CheckoutDB {
    pub id: String,
    pub invoice_id: String,
    pub gateway: String,
    pub gateway_checkout_id: String,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub redirect_url: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<CheckoutDB> for Checkout {
    type Error = Error;

    fn try_from(db: CheckoutDB) -> Result<Self> {
        Ok(Self {
            gateway: parse_text(&db.gateway, "checkouts.gateway")?,
            amount: parse_decimal(&db.amount, "checkouts.amount")?,
            status: parse_text(&db.status, "checkouts.status")?,
            id: db.id,
            invoice_id: db.invoice_id,
            gateway_checkout_id: db.gateway_checkout_id,
            currency: db.currency,
            redirect_url: db.redirect_url,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
