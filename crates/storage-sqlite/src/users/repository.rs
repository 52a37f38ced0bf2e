use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;

use vuka_core::users::{KycStatus, NewUser, User, UserCredentials, UserRepositoryTrait};
use vuka_core::{Error, Result};

use super::model::UserDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, OrNotFound};
use crate::schema::users;
use crate::utils::new_id;

pub struct UserRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl UserRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = Utc::now().naive_utc();
        let row = UserDB {
            id: new_id(),
            email: new_user.normalized_email(),
            password_hash: new_user.password_hash,
            role: new_user.role.as_str().to_string(),
            full_name: new_user.full_name.trim().to_string(),
            business_name: new_user.business_name.map(|n| n.trim().to_string()),
            vat_number: new_user.vat_number.filter(|v| !v.trim().is_empty()),
            kyc_status: KycStatus::NotSubmitted.as_str().to_string(),
            id_number: None,
            created_at: now,
            updated_at: now,
        };

        self.writer
            .exec(move |conn| {
                let taken = users::table
                    .filter(users::email.eq(&row.email))
                    .count()
                    .get_result::<i64>(conn)
                    .into_core()?;
                if taken > 0 {
                    return Err(Error::Conflict(format!(
                        "An account for {} already exists",
                        row.email
                    )));
                }

                diesel::insert_into(users::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                User::try_from(row)
            })
            .await
    }

    fn get_by_id(&self, user_id: &str) -> Result<User> {
        let mut conn = get_connection(&self.pool)?;
        let row = users::table
            .find(user_id)
            .select(UserDB::as_select())
            .first::<UserDB>(&mut conn)
            .or_not_found(|| format!("User {}", user_id))?;
        User::try_from(row)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let mut conn = get_connection(&self.pool)?;
        users::table
            .filter(users::email.eq(email.trim().to_lowercase()))
            .select(UserDB::as_select())
            .first::<UserDB>(&mut conn)
            .optional()
            .into_core()?
            .map(UserCredentials::try_from)
            .transpose()
    }

    fn list(&self) -> Result<Vec<User>> {
        let mut conn = get_connection(&self.pool)?;
        users::table
            .select(UserDB::as_select())
            .order(users::created_at.asc())
            .load::<UserDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_kyc(
        &self,
        user_id: &str,
        status: KycStatus,
        id_number: Option<String>,
    ) -> Result<User> {
        let user_id = user_id.to_string();
        self.writer
            .exec(move |conn| {
                let now = Utc::now().naive_utc();
                let target = users::table.find(&user_id);
                let updated = match id_number {
                    Some(number) => diesel::update(target)
                        .set((
                            users::kyc_status.eq(status.as_str()),
                            users::id_number.eq(number),
                            users::updated_at.eq(now),
                        ))
                        .execute(conn),
                    None => diesel::update(target)
                        .set((
                            users::kyc_status.eq(status.as_str()),
                            users::updated_at.eq(now),
                        ))
                        .execute(conn),
                }
                .into_core()?;
                if updated == 0 {
                    return Err(Error::NotFound(format!("User {}", user_id)));
                }

                let row = users::table
                    .find(&user_id)
                    .select(UserDB::as_select())
                    .first::<UserDB>(conn)
                    .into_core()?;
                User::try_from(row)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use vuka_core::users::UserRole;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "$argon2id$hash".to_string(),
            role: UserRole::Business,
            full_name: "Thandi Nkosi".to_string(),
            business_name: Some("Nkosi Bakery".to_string()),
            vat_number: Some(" ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_emails_are_unique_ignoring_case() {
        let db = test_db();
        let repo = UserRepository::new(db.pool.clone(), db.writer.clone());

        let user = repo.create(new_user("Thandi@Bakery.co.za")).await.unwrap();
        assert_eq!(user.email, "thandi@bakery.co.za");
        assert_eq!(user.vat_number, None);

        let taken = repo.create(new_user("thandi@bakery.co.za ")).await;
        assert!(matches!(taken, Err(Error::Conflict(_))));

        let credentials = repo.find_by_email("THANDI@bakery.co.za").unwrap().unwrap();
        assert_eq!(credentials.user.id, user.id);
        assert_eq!(credentials.password_hash, "$argon2id$hash");
    }

    #[tokio::test]
    async fn test_kyc_update_keeps_id_number() {
        let db = test_db();
        let repo = UserRepository::new(db.pool.clone(), db.writer.clone());
        let user = repo.create(new_user("kyc@bakery.co.za")).await.unwrap();

        let pending = repo
            .update_kyc(&user.id, KycStatus::Pending, Some("8001015009087".to_string()))
            .await
            .unwrap();
        assert_eq!(pending.kyc_status, KycStatus::Pending);

        let approved = repo
            .update_kyc(&user.id, KycStatus::Approved, None)
            .await
            .unwrap();
        assert_eq!(approved.kyc_status, KycStatus::Approved);
        assert_eq!(approved.id_number.as_deref(), Some("8001015009087"));

        assert!(matches!(
            repo.get_by_id("missing"),
            Err(Error::NotFound(_))
        ));
    }
}
