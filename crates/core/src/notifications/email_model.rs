use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub reply_to: Option<String>,
}

/// Body of the inbound-mail webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmailPayload {
    pub from: String,
    pub subject: String,
    #[serde(default)]
    pub text: String,
}

impl InboundEmailPayload {
    pub fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(Error::invalid_input("Inbound email has no sender"));
        }
        Ok(())
    }
}

lazy_static! {
    /// Invoice number anywhere in a subject, case-insensitive.
    static ref INVOICE_NUMBER_REGEX: Regex =
        Regex::new(r"(?i)\bINV-(\d{5,})\b").expect("Invalid regex pattern");
}

/// Finds the first invoice number (`INV-00042`) in a subject line.
pub fn extract_invoice_number(subject: &str) -> Option<String> {
    INVOICE_NUMBER_REGEX
        .captures(subject)
        .map(|caps| format!("INV-{}", &caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_invoice_number_from_reply_subject() {
        assert_eq!(
            extract_invoice_number("RE: Invoice inv-00042 from Acme").as_deref(),
            Some("INV-00042")
        );
    }

    #[test]
    fn ignores_subjects_without_number() {
        assert_eq!(extract_invoice_number("Question about my bill"), None);
        assert_eq!(extract_invoice_number("INV-12"), None);
    }
}
