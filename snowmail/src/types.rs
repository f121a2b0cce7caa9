//! Message and result types that flow through the moderation pipeline.
//!
//! ```text
//! WebhookEvent → InboundMessage → ModerationVerdict → RewriteResult → ProcessingOutcome
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Inbound Types
// =============================================================================

/// Raw Mailgun webhook event (form-encoded data).
///
/// Every field defaults to empty so that a structurally incomplete event
/// reaches our own validation instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default, rename = "body-plain")]
    pub body_plain: Option<String>,
    #[serde(default, rename = "body-html")]
    pub body_html: Option<String>,
}

impl WebhookEvent {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recipient.trim().is_empty() {
            missing.push("recipient");
        }
        if self.sender.trim().is_empty() {
            missing.push("sender");
        }
        if self.subject.trim().is_empty() {
            missing.push("subject");
        }
        if self
            .body_plain
            .as_deref()
            .map(|b| b.trim().is_empty())
            .unwrap_or(true)
        {
            missing.push("body-plain");
        }
        missing
    }

    /// Convert an authenticated event into a pipeline message.
    ///
    /// The signature material is dropped here; nothing downstream sees it.
    pub fn into_inbound(self) -> Result<InboundMessage> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let received_at = self
            .timestamp
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(InboundMessage {
            recipient: self.recipient,
            sender: self.sender,
            subject: self.subject,
            content: self.body_plain.unwrap_or_default(),
            html: self.body_html.filter(|h| !h.trim().is_empty()),
            received_at,
        })
    }
}

/// A message accepted into the pipeline. Owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundMessage {
    /// Original recipient at our Mailgun domain
    pub recipient: String,
    /// Sender email address
    pub sender: String,
    /// Email subject
    pub subject: String,
    /// Plain text body; this is what gets moderated
    pub content: String,
    /// HTML body, forwarded only when the text is forwarded unchanged
    pub html: Option<String>,
    pub received_at: DateTime<Utc>,
}

// =============================================================================
// Gateway Results
// =============================================================================

/// Normalized classifier judgement for one piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// True categories in classifier order, without duplicates
    pub categories: Vec<String>,
}

/// Output of the rewrite step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteResult {
    pub body: String,
    /// Empty when the subject was not rewritten
    pub subject: String,
}

/// A link worth saving for later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub url: String,
    pub title: String,
}

impl LinkCandidate {
    /// Build a candidate, using the URL as title when none is given.
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        let url = url.into();
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.clone());
        Self { url, title }
    }
}

// =============================================================================
// Pipeline Result
// =============================================================================

/// Terminal artifact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingOutcome {
    pub flagged: bool,
    pub flags: Vec<String>,
    pub final_subject: String,
    pub final_body: String,
    pub delivered: bool,
}
