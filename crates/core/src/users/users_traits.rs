//! User repository and service traits.

use async_trait::async_trait;

use super::users_model::{KycStatus, KycSubmission, NewUser, User, UserCredentials};
use crate::errors::Result;

/// Trait defining the contract for user persistence.
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Inserts a user. The email must already be normalized.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    fn get_by_id(&self, user_id: &str) -> Result<User>;

    fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>>;

    fn list(&self) -> Result<Vec<User>>;

    async fn update_kyc(
        &self,
        user_id: &str,
        status: KycStatus,
        id_number: Option<String>,
    ) -> Result<User>;
}

/// Trait defining the contract for user service operations.
#[async_trait]
pub trait UserServiceTrait: Send + Sync {
    /// Registers an investor or business account.
    async fn register(&self, new_user: NewUser) -> Result<User>;

    fn get_user(&self, user_id: &str) -> Result<User>;

    fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>>;

    fn list_users(&self) -> Result<Vec<User>>;

    async fn submit_kyc(&self, user_id: &str, submission: KycSubmission) -> Result<User>;

    async fn review_kyc(&self, user_id: &str, approved: bool) -> Result<User>;

    /// Creates the admin account if no user with that email exists yet.
    async fn ensure_admin(&self, email: &str, password_hash: String) -> Result<User>;
}
