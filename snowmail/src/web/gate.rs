//! Admission checks for inbound Mailgun webhook events.
//!
//! Authentication runs before any field validation. The replay guard runs last,
//! so a rejected event never consumes its token.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::replay::ReplayGuard;
use super::signature::verify_mailgun_signature;
use crate::types::{InboundMessage, WebhookEvent};

/// Outcome of admitting one event.
#[derive(Debug)]
pub enum Admission {
    /// Authenticated, complete and new: hand it to the pipeline
    Accepted(InboundMessage),
    /// Authenticated but already seen inside the replay window
    Duplicate,
    /// Bad signature or stale timestamp
    Unauthorized,
    /// Authenticated but structurally unusable
    NotAcceptable(String),
}

#[derive(Debug)]
pub struct WebhookGate {
    signing_key: SecretString,
    max_age_seconds: u64,
    domain: Option<String>,
    replay: ReplayGuard,
}

impl WebhookGate {
    pub fn new(signing_key: SecretString, max_age_seconds: u64) -> Self {
        Self {
            signing_key,
            max_age_seconds,
            domain: None,
            replay: ReplayGuard::new(Duration::from_secs(max_age_seconds)),
        }
    }

    /// Only accept recipients at `domain`.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into().to_ascii_lowercase());
        self
    }

    pub fn admit(&self, event: WebhookEvent) -> Admission {
        if !verify_mailgun_signature(
            self.signing_key.expose_secret(),
            &event.timestamp,
            &event.token,
            &event.signature,
            self.max_age_seconds,
        ) {
            return Admission::Unauthorized;
        }

        let token = event.token.clone();

        let message = match event.into_inbound() {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "mailgun_event_incomplete");
                return Admission::NotAcceptable(e.to_string());
            }
        };

        if let Some(domain) = &self.domain {
            let suffix = format!("@{}", domain);
            if !message.recipient.to_ascii_lowercase().ends_with(&suffix) {
                warn!(
                    recipient = %message.recipient,
                    expected_domain = %domain,
                    "mailgun_invalid_recipient_domain"
                );
                return Admission::NotAcceptable("recipient outside configured domain".to_string());
            }
        }

        if !self.replay.check_and_record(&token) {
            warn!(
                recipient = %message.recipient,
                tracked_tokens = self.replay.len(),
                "mailgun_duplicate_token"
            );
            return Admission::Duplicate;
        }

        debug!(tracked_tokens = self.replay.len(), "mailgun_token_recorded");

        Admission::Accepted(message)
    }
}
