//! Forwarding of finalized messages to the review address.
//!
//! Every message goes to the single configured forwarding address, whatever
//! its original recipient was. Delivery is best-effort: failures are logged by
//! the caller and never retried.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::MailSender;
use crate::error::{Error, Result, Stage};

pub const FLAGGED_HEADER: &str = "X-Snowmail-Flagged";
pub const FLAGS_HEADER: &str = "X-Snowmail-Flags";

/// A fully assembled outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    /// Extra MIME headers, name then value
    pub headers: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct Forwarder {
    sender: Arc<dyn MailSender>,
    forward_to: String,
    forward_from: Option<String>,
}

impl Forwarder {
    pub fn new(sender: Arc<dyn MailSender>, forward_to: impl Into<String>) -> Self {
        Self {
            sender,
            forward_to: forward_to.into(),
            forward_from: None,
        }
    }

    /// Send from a fixed address instead of the original sender.
    pub fn with_from(mut self, from: Option<String>) -> Self {
        self.forward_from = from;
        self
    }

    pub fn forward_to(&self) -> &str {
        &self.forward_to
    }

    /// Deliver a message to the forwarding address.
    ///
    /// `flags` is attached as headers so the reviewer sees the moderation
    /// result even when the body could not be rewritten.
    pub async fn deliver(
        &self,
        sender: &str,
        subject: &str,
        html_body: Option<&str>,
        text_body: &str,
        flags: &[String],
    ) -> Result<()> {
        let mut headers = vec![(FLAGGED_HEADER.to_string(), (!flags.is_empty()).to_string())];
        if !flags.is_empty() {
            headers.push((FLAGS_HEADER.to_string(), flags.join(", ")));
        }

        let mail = OutboundMail {
            from: self.forward_from.clone().unwrap_or_else(|| sender.to_string()),
            to: vec![self.forward_to.clone()],
            subject: subject.to_string(),
            text: text_body.to_string(),
            html: html_body.map(str::to_string),
            headers,
        };

        info!(
            to = %self.forward_to,
            subject_length = mail.subject.len(),
            has_html = mail.html.is_some(),
            flagged = !flags.is_empty(),
            "dispatch_sending"
        );

        self.sender.send(&mail).await.map_err(|e| {
            warn!(error = %e, to = %self.forward_to, "dispatch_failed");
            Error::dependency(Stage::Delivery, e)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeMailer;
    use super::*;

    #[tokio::test]
    async fn test_deliver_goes_to_forward_address() {
        let mailer = Arc::new(FakeMailer::new());
        let forwarder = Forwarder::new(mailer.clone(), "review@example.com");

        forwarder
            .deliver("alice@example.org", "Hello", Some("<p>hello</p>"), "hello", &[])
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["review@example.com"]);
        assert_eq!(sent[0].from, "alice@example.org");
        assert_eq!(sent[0].html.as_deref(), Some("<p>hello</p>"));
        assert_eq!(
            sent[0].headers,
            vec![(FLAGGED_HEADER.to_string(), "false".to_string())]
        );
    }

    #[tokio::test]
    async fn test_deliver_attaches_flags() {
        let mailer = Arc::new(FakeMailer::new());
        let forwarder = Forwarder::new(mailer.clone(), "review@example.com")
            .with_from(Some("relay@mail.example.com".to_string()));

        let flags = vec!["harassment".to_string(), "violence".to_string()];
        forwarder
            .deliver("alice@example.org", "Hello", None, "text", &flags)
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent[0].from, "relay@mail.example.com");
        assert!(sent[0]
            .headers
            .contains(&(FLAGS_HEADER.to_string(), "harassment, violence".to_string())));
        assert!(sent[0]
            .headers
            .contains(&(FLAGGED_HEADER.to_string(), "true".to_string())));
    }

    #[tokio::test]
    async fn test_deliver_failure_is_dependency_error() {
        let forwarder = Forwarder::new(Arc::new(FakeMailer::failing()), "review@example.com");

        assert!(matches!(
            forwarder.deliver("a@b.c", "s", None, "t", &[]).await,
            Err(Error::Dependency { stage: Stage::Delivery, .. })
        ));
    }
}
