use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use vuka_core::errors::{IntegrationError, Result};
use vuka_core::notifications::{EmailMessage, EmailSender};

use crate::http::{build_client, http_error, parse_response};

const SERVICE: &str = "email";
const DEFAULT_API_URL: &str = "https://api.resend.com";

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Sends mail through a Resend-compatible HTTP API.
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, api_key, from)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let from = from.into();
        if api_key.trim().is_empty() || from.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("email API".to_string()).into());
        }
        Ok(Self {
            client: build_client(SERVICE)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key,
            from,
        })
    }

    fn body<'a>(&'a self, message: &'a EmailMessage) -> SendBody<'a> {
        SendBody {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
            reply_to: message.reply_to.as_deref(),
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(message))
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;
        let sent: SendResponse = parse_response(SERVICE, response).await?;
        info!("Sent email {} to {}", sent.id, message.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_omits_absent_reply_to() {
        let sender = HttpEmailSender::new("re_key", "Vuka <billing@vuka.test>").unwrap();
        let message = EmailMessage {
            to: "client@example.com".to_string(),
            subject: "Invoice INV-00001".to_string(),
            html: "<p>Pay</p>".to_string(),
            text: "Pay".to_string(),
            reply_to: None,
        };
        let json = serde_json::to_value(sender.body(&message)).unwrap();
        assert_eq!(json["to"], serde_json::json!(["client@example.com"]));
        assert_eq!(json["from"], "Vuka <billing@vuka.test>");
        assert!(json.get("reply_to").is_none());

        let with_reply = EmailMessage {
            reply_to: Some("owner@biz.test".to_string()),
            ..message
        };
        let json = serde_json::to_value(sender.body(&with_reply)).unwrap();
        assert_eq!(json["reply_to"], "owner@biz.test");
    }

    #[test]
    fn requires_key_and_sender() {
        assert!(HttpEmailSender::new("", "billing@vuka.test").is_err());
        assert!(HttpEmailSender::new("re_key", " ").is_err());
    }
}
