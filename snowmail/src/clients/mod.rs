//! Upstream service clients.
//!
//! Each external collaborator sits behind a small trait so the pipeline can be
//! driven by fakes in tests and by the HTTP clients below in production:
//!
//! - [`Classifier`]: content moderation (OpenAI moderations)
//! - [`TextGenerator`]: instruction-following generation (OpenAI chat)
//! - [`MailSender`]: outbound delivery (Mailgun messages API)
//! - [`BookmarkStore`]: read-later store (Pocket)

pub mod mailgun;
pub mod openai;
pub mod pocket;

use async_trait::async_trait;
use reqwest::Response;

use crate::dispatch::OutboundMail;
use crate::error::ClientError;
use crate::types::LinkCandidate;

pub use mailgun::MailgunClient;
pub use openai::OpenAiClient;
pub use pocket::PocketClient;

/// One result block returned by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierResult {
    pub flagged: bool,
    /// Category judgements in the order the classifier reported them
    pub categories: Vec<(String, bool)>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, input: &str) -> Result<Vec<ClassifierResult>, ClientError>;
}

/// One generated choice. `content` is `None` when the upstream sent no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedChoice {
    pub content: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Submit a two-turn exchange: the system `instruction`, then `input`.
    async fn generate(
        &self,
        instruction: &str,
        input: &str,
    ) -> Result<Vec<GeneratedChoice>, ClientError>;
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<(), ClientError>;
}

#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn add(&self, link: &LinkCandidate) -> Result<(), ClientError>;
}

/// Turn a non-success HTTP status into a [`ClientError::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.chars().take(500).collect();

    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}
