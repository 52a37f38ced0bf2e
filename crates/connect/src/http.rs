//! Shared HTTP plumbing for the outbound integrations.
//!
//! Every provider client wraps one `reqwest::Client` with a fixed timeout and
//! funnels responses through [`parse_response`], so upstream failures surface
//! as [`IntegrationError`]s carrying the service name.

use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

use vuka_core::errors::{IntegrationError, Result};

/// Default timeout for provider requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest slice of an error body kept in the error message.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

pub(crate) fn build_client(service: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| http_error(service, e))
}

pub(crate) fn http_error(service: &str, err: impl std::fmt::Display) -> vuka_core::Error {
    IntegrationError::Http {
        service: service.to_string(),
        message: err.to_string(),
    }
    .into()
}

pub(crate) fn unexpected(service: &str, message: impl Into<String>) -> vuka_core::Error {
    IntegrationError::UnexpectedResponse {
        service: service.to_string(),
        message: message.into(),
    }
    .into()
}

/// Reads the body, maps non-2xx statuses to `UpstreamStatus`, and decodes JSON.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(|e| http_error(service, e))?;
    debug!("[{}] HTTP {}", service, status);

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .ok()
            .and_then(|err| err.message.or(err.error_description).or(err.error))
            .unwrap_or_else(|| body.chars().take(ERROR_BODY_LIMIT).collect());
        return Err(IntegrationError::UpstreamStatus {
            service: service.to_string(),
            status: status.as_u16(),
            body: message,
        }
        .into());
    }

    serde_json::from_str(&body).map_err(|e| {
        unexpected(
            service,
            format!(
                "{} in {}",
                e,
                body.chars().take(ERROR_BODY_LIMIT).collect::<String>()
            ),
        )
    })
}
