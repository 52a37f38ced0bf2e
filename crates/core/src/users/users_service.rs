use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;

use super::users_model::{
    validate_sa_id_number, KycStatus, KycSubmission, NewUser, User, UserCredentials, UserRole,
};
use super::users_traits::{UserRepositoryTrait, UserServiceTrait};
use crate::errors::{Error, Result};

/// Service for registering users and driving KYC review.
pub struct UserService {
    repository: Arc<dyn UserRepositoryTrait>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { repository }
    }

    async fn create_user(&self, mut new_user: NewUser) -> Result<User> {
        new_user.validate()?;
        new_user.email = new_user.normalized_email();

        if self.repository.find_by_email(&new_user.email)?.is_some() {
            return Err(Error::Conflict(format!(
                "An account for {} already exists",
                new_user.email
            )));
        }

        self.repository.create(new_user).await
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn register(&self, new_user: NewUser) -> Result<User> {
        if new_user.role == UserRole::Admin {
            return Err(Error::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }
        let user = self.create_user(new_user).await?;
        info!("Registered {} user {}", user.role, user.id);
        Ok(user)
    }

    fn get_user(&self, user_id: &str) -> Result<User> {
        self.repository.get_by_id(user_id)
    }

    fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.repository.find_by_email(&email.trim().to_lowercase())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.repository.list()
    }

    async fn submit_kyc(&self, user_id: &str, submission: KycSubmission) -> Result<User> {
        let user = self.repository.get_by_id(user_id)?;
        match user.kyc_status {
            KycStatus::Approved => {
                return Err(Error::Conflict("KYC is already approved".to_string()))
            }
            KycStatus::Pending => {
                return Err(Error::Conflict("KYC is already under review".to_string()))
            }
            KycStatus::NotSubmitted | KycStatus::Rejected => {}
        }

        validate_sa_id_number(&submission.id_number)?;
        debug!("KYC submitted for user {}", user_id);
        self.repository
            .update_kyc(
                user_id,
                KycStatus::Pending,
                Some(submission.id_number.trim().to_string()),
            )
            .await
    }

    async fn review_kyc(&self, user_id: &str, approved: bool) -> Result<User> {
        let user = self.repository.get_by_id(user_id)?;
        if user.kyc_status != KycStatus::Pending {
            return Err(Error::Conflict(format!(
                "KYC for user {} is {}, not PENDING",
                user_id, user.kyc_status
            )));
        }
        let status = if approved {
            KycStatus::Approved
        } else {
            KycStatus::Rejected
        };
        info!("KYC for user {} reviewed: {}", user_id, status);
        self.repository.update_kyc(user_id, status, user.id_number).await
    }

    async fn ensure_admin(&self, email: &str, password_hash: String) -> Result<User> {
        if let Some(existing) = self.find_credentials(email)? {
            return Ok(existing.user);
        }
        let admin = self
            .create_user(NewUser {
                email: email.to_string(),
                password_hash,
                role: UserRole::Admin,
                full_name: "Platform Administrator".to_string(),
                business_name: None,
                vat_number: None,
            })
            .await?;
        let approved = self
            .repository
            .update_kyc(&admin.id, KycStatus::Approved, None)
            .await?;
        info!("Seeded admin account {}", approved.email);
        Ok(approved)
    }
}
