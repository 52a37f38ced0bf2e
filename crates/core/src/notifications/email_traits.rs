use async_trait::async_trait;

use super::email_model::EmailMessage;
use crate::errors::Result;

/// Delivers transactional email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}
