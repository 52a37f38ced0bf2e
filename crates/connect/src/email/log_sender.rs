use async_trait::async_trait;
use log::info;

use vuka_core::errors::Result;
use vuka_core::notifications::{EmailMessage, EmailSender};

/// Logs messages instead of delivering them. Used when no email API is configured.
#[derive(Debug, Default, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            "Email (not delivered) to {}: {}\n{}",
            message.to, message.subject, message.text
        );
        Ok(())
    }
}
