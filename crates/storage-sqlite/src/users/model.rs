//! Database models for users.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use vuka_core::users::{User, UserCredentials};
use vuka_core::{Error, Result};

use crate::utils::parse_text;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserDB {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub full_name: String,
    pub business_name: Option<String>,
    pub vat_number: Option<String>,
    pub kyc_status: String,
    pub id_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<UserDB> for User {
    type Error = Error;

    fn try_from(db: UserDB) -> Result<Self> {
        Ok(Self {
            role: parse_text(&db.role, "users.role")?,
            kyc_status: parse_text(&db.kyc_status, "users.kyc_status")?,
            id: db.id,
            email: db.email,
            full_name: db.full_name,
            business_name: db.business_name,
            vat_number: db.vat_number,
            id_number: db.id_number,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<UserDB> for UserCredentials {
    type Error = Error;

    fn try_from(db: UserDB) -> Result<Self> {
        let password_hash = db.password_hash.clone();
        Ok(Self {
            user: User::try_from(db)?,
            password_hash,
        })
    }
}
