//! Mailgun webhook signature verification.
//!
//! Mailgun signs webhook requests using HMAC-SHA256.
//! Reference: https://documentation.mailgun.com/docs/mailgun/user-manual/events/webhooks/#securing-webhooks

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of an HMAC-SHA256 digest.
const SIGNATURE_HEX_LEN: usize = 64;

/// Mailgun sends the digest as lowercase hex. Anything else is malformed.
fn is_lowercase_hex_digest(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Verify an HMAC-SHA256 webhook signature.
///
/// The expected signature is the hex digest of `timestamp + token` keyed with
/// `signing_key`. The supplied string must be exactly that lowercase hex
/// digest: no surrounding whitespace, no uppercase letters. The byte
/// comparison runs in constant time. Missing or malformed input is simply
/// "not verified".
pub fn verify_signature(signing_key: &str, timestamp: &str, token: &str, signature: &str) -> bool {
    if signing_key.is_empty() || timestamp.is_empty() || token.is_empty() || signature.is_empty() {
        warn!(
            has_timestamp = !timestamp.is_empty(),
            has_token = !token.is_empty(),
            has_signature = !signature.is_empty(),
            "mailgun_signature_missing_fields"
        );
        return false;
    }

    if !is_lowercase_hex_digest(signature) {
        warn!(signature_length = signature.len(), "mailgun_signature_not_hex");
        return false;
    }

    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "mailgun_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(signing_key.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("mailgun_signature_invalid_key");
            return false;
        }
    };

    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(actual_length = signature.len(), "mailgun_signature_mismatch");
    }

    valid
}

/// Check that a webhook timestamp is within `max_age_seconds` of now.
pub fn is_timestamp_fresh(timestamp: &str, max_age_seconds: u64) -> bool {
    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    is_timestamp_fresh_at(timestamp, max_age_seconds, current_time)
}

fn is_timestamp_fresh_at(timestamp: &str, max_age_seconds: u64, current_time: u64) -> bool {
    let webhook_time: u64 = match timestamp.trim().parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "mailgun_signature_invalid_timestamp");
            return false;
        }
    };

    let age = current_time.abs_diff(webhook_time);

    if age > max_age_seconds {
        warn!(
            webhook_time = webhook_time,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "mailgun_signature_stale"
        );
        return false;
    }

    true
}

/// Verify a Mailgun webhook: valid signature and a timestamp that is not stale.
pub fn verify_mailgun_signature(
    signing_key: &str,
    timestamp: &str,
    token: &str,
    signature: &str,
    max_age_seconds: u64,
) -> bool {
    verify_signature(signing_key, timestamp, token, signature)
        && is_timestamp_fresh(timestamp, max_age_seconds)
}

/// Compute the signature Mailgun would send for `timestamp` and `token`.
#[cfg(test)]
pub(crate) fn sign(signing_key: &str, timestamp: &str, token: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
