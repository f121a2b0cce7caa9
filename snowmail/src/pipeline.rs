//! Pipeline orchestration: moderation, conditional rewrite and forwarding.
//!
//! ## Run States
//!
//! ```text
//! Received → Authenticated → Moderated ─┬→ Clean ───┬→ Finalized → Dispatched
//!                  │                    └→ Flagged ─┘
//!                  └──────(moderation failure)──────────────────→ Aborted
//! ```
//!
//! Webhook runs enter at `Received` and are authenticated by the web layer
//! before the pipeline sees them. Direct runs start at `Authenticated` and stop
//! at `Finalized` without dispatching.

use std::fmt;

use tracing::{error, info, warn};

use crate::dispatch::Forwarder;
use crate::error::Result;
use crate::gateway::{ModerationGateway, RewriteGateway};
use crate::types::{InboundMessage, ProcessingOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Received,
    Authenticated,
    Moderated,
    Clean,
    Flagged,
    Finalized,
    Dispatched,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Dispatched | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a webhook-triggered run ended.
#[derive(Debug)]
pub struct RunReport {
    /// Either `Dispatched` or `Aborted`
    pub state: RunState,
    /// Present when the run reached `Dispatched`
    pub outcome: Option<ProcessingOutcome>,
    /// Why the run aborted
    pub error: Option<String>,
}

/// Content settled for one run, before any dispatch.
#[derive(Debug)]
struct Finalized {
    flags: Vec<String>,
    subject: String,
    body: String,
    /// Original HTML, kept only while the text is the original text
    html: Option<String>,
}

impl Finalized {
    fn into_outcome(self, delivered: bool) -> ProcessingOutcome {
        ProcessingOutcome {
            flagged: !self.flags.is_empty(),
            flags: self.flags,
            final_subject: self.subject,
            final_body: self.body,
            delivered,
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    moderation: ModerationGateway,
    rewrite: RewriteGateway,
    forwarder: Forwarder,
    tone: String,
}

impl Pipeline {
    pub fn new(
        moderation: ModerationGateway,
        rewrite: RewriteGateway,
        forwarder: Forwarder,
        tone: impl Into<String>,
    ) -> Self {
        Self {
            moderation,
            rewrite,
            forwarder,
            tone: tone.into(),
        }
    }

    /// Run a direct (API-triggered) message through moderation and rewrite.
    ///
    /// Nothing is dispatched; the outcome always has `delivered = false`.
    pub async fn process(&self, message: &InboundMessage) -> Result<ProcessingOutcome> {
        let finalized = self.finalize(message).await?;
        Ok(finalized.into_outcome(false))
    }

    /// Run an authenticated webhook message to a terminal state.
    ///
    /// Never fails: moderation failures end in `Aborted`, and delivery
    /// failures end in `Dispatched` with `delivered = false`. Both are logged.
    pub async fn run_webhook(&self, message: InboundMessage) -> RunReport {
        transition(&message, RunState::Received, RunState::Authenticated);

        let finalized = match self.finalize(&message).await {
            Ok(f) => f,
            Err(e) => {
                error!(
                    recipient = %message.recipient,
                    error = %e,
                    "pipeline_aborted"
                );
                transition(&message, RunState::Authenticated, RunState::Aborted);
                return RunReport {
                    state: RunState::Aborted,
                    outcome: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let delivered = match self
            .forwarder
            .deliver(
                &message.sender,
                &finalized.subject,
                finalized.html.as_deref(),
                &finalized.body,
                &finalized.flags,
            )
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    recipient = %message.recipient,
                    forward_to = %self.forwarder.forward_to(),
                    error = %e,
                    "pipeline_delivery_failed"
                );
                false
            }
        };

        transition(&message, RunState::Finalized, RunState::Dispatched);

        let outcome = finalized.into_outcome(delivered);

        info!(
            recipient = %message.recipient,
            flagged = outcome.flagged,
            flags = ?outcome.flags,
            delivered = outcome.delivered,
            "pipeline_complete"
        );

        RunReport {
            state: RunState::Dispatched,
            outcome: Some(outcome),
            error: None,
        }
    }

    /// Authenticated → Moderated → {Clean, Flagged} → Finalized.
    async fn finalize(&self, message: &InboundMessage) -> Result<Finalized> {
        let verdict = self.moderation.moderate(&message.content).await?;
        transition(message, RunState::Authenticated, RunState::Moderated);

        if !verdict.flagged {
            transition(message, RunState::Moderated, RunState::Clean);
            transition(message, RunState::Clean, RunState::Finalized);
            return Ok(Finalized {
                flags: Vec::new(),
                subject: message.subject.clone(),
                body: message.content.clone(),
                html: message.html.clone(),
            });
        }

        transition(message, RunState::Moderated, RunState::Flagged);
        let flags = verdict.categories;

        let finalized = match self.rewrite.rewrite(&message.content, &self.tone).await {
            Ok(rewrite) => {
                let subject = if rewrite.subject.trim().is_empty() {
                    message.subject.clone()
                } else {
                    rewrite.subject
                };
                Finalized {
                    flags,
                    subject,
                    body: rewrite.body,
                    html: None,
                }
            }
            Err(e) => {
                warn!(
                    recipient = %message.recipient,
                    error = %e,
                    flags = ?flags,
                    "pipeline_rewrite_fallback"
                );
                Finalized {
                    flags,
                    subject: message.subject.clone(),
                    body: message.content.clone(),
                    html: message.html.clone(),
                }
            }
        };

        transition(message, RunState::Flagged, RunState::Finalized);
        Ok(finalized)
    }
}

fn transition(message: &InboundMessage, from: RunState, to: RunState) {
    info!(
        recipient = %message.recipient,
        from = %from,
        to = %to,
        "pipeline_transition"
    );
}
