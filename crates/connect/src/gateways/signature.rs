//! Webhook signature checks.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use vuka_core::errors::{IntegrationError, Result};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Signed webhooks older or newer than this are rejected.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

fn rejected(reason: impl Into<String>) -> vuka_core::Error {
    IntegrationError::InvalidSignature(reason.into()).into()
}

/// Key bytes for a `whsec_`-prefixed secret (base64 after the prefix), or the
/// raw secret otherwise.
fn signing_key(secret: &str) -> Result<Vec<u8>> {
    match secret.strip_prefix("whsec_") {
        Some(encoded) => BASE64
            .decode(encoded)
            .map_err(|e| rejected(format!("webhook secret is not valid base64: {}", e))),
        None => Ok(secret.as_bytes().to_vec()),
    }
}

/// Verifies a `webhook-signature` header: space-separated `v1,<base64>`
/// entries, each an HMAC-SHA256 of `{id}.{timestamp}.{body}`.
pub fn verify_standard_webhook(
    secret: &str,
    webhook_id: &str,
    timestamp: &str,
    signature_header: &str,
    body: &[u8],
    now: NaiveDateTime,
) -> Result<()> {
    let sent_at = timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| rejected("missing or malformed webhook-timestamp"))?;
    let skew = (now.and_utc().timestamp() - sent_at.timestamp()).abs();
    if skew > TIMESTAMP_TOLERANCE_SECS {
        return Err(rejected(format!("timestamp is {}s away from now", skew)));
    }

    let key = signing_key(secret)?;
    let mut signed = format!("{}.{}.", webhook_id, timestamp.trim()).into_bytes();
    signed.extend_from_slice(body);

    let candidates = signature_header
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .filter_map(|(_, sig)| BASE64.decode(sig).ok());

    for candidate in candidates {
        let mut mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| rejected(format!("unusable webhook secret: {}", e)))?;
        mac.update(&signed);
        if mac.verify_slice(&candidate).is_ok() {
            return Ok(());
        }
    }
    Err(rejected("no v1 signature matched"))
}

/// Verifies a hex HMAC-SHA512 of the raw body.
pub fn verify_hex_sha512(secret: &str, signature: &str, body: &[u8]) -> Result<()> {
    let expected =
        hex::decode(signature.trim()).map_err(|_| rejected("signature is not hex"))?;
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .map_err(|e| rejected(format!("unusable webhook secret: {}", e)))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| rejected("signature does not match body"))
}

#[cfg(test)]
pub(crate) fn sign_standard_webhook(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(&signing_key(secret).unwrap()).unwrap();
    mac.update(format!("{}.{}.", id, timestamp).as_bytes());
    mac.update(body);
    format!("v1,{}", BASE64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
pub(crate) fn sign_hex_sha512(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
