//! Rewrite gateway: sanitizes flagged content while keeping its meaning.

use std::sync::Arc;

use tracing::{info, warn};

use super::{first_choice_text, require_content};
use crate::clients::TextGenerator;
use crate::config::DEFAULT_TONE;
use crate::error::{Error, Result, Stage};
use crate::types::RewriteResult;

const REWRITE_INSTRUCTION: &str = "You are an expert communicator and editor. Rewrite the \
message you are given so that it is clear and concise. Remove any offensive content, but \
preserve the meaning of the message and every fact it states. Respond only with the \
rewritten message. Do not reply to the message and do not add any new content or context. \
Only the tone and the offending content may change. Use this tone: ";

#[derive(Clone)]
pub struct RewriteGateway {
    generator: Arc<dyn TextGenerator>,
}

impl RewriteGateway {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Rewrite `content` in the given tone (the default tone when blank).
    pub async fn rewrite(&self, content: &str, tone: &str) -> Result<RewriteResult> {
        require_content(content)?;

        let tone = if tone.trim().is_empty() { DEFAULT_TONE } else { tone.trim() };
        let instruction = format!("{}{}", REWRITE_INSTRUCTION, tone);

        let choices = self
            .generator
            .generate(&instruction, content)
            .await
            .map_err(|e| {
                warn!(error = %e, "rewrite_upstream_failed");
                Error::dependency(Stage::Rewrite, e)
            })?;

        let body = first_choice_text(Stage::Rewrite, choices)?;

        let result = RewriteResult {
            body,
            subject: String::new(),
        };

        info!(
            input_length = content.len(),
            body_length = result.body.len(),
            tone = %tone,
            "rewrite_complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GeneratedChoice;
    use crate::gateway::fakes::FakeGenerator;

    #[tokio::test]
    async fn test_rewrite_success() {
        let generator = Arc::new(FakeGenerator::replying("cleaned text"));
        let gateway = RewriteGateway::new(generator.clone());

        let result = gateway.rewrite("you idiot, the meeting is at 3", DEFAULT_TONE).await.unwrap();

        assert_eq!(
            result,
            RewriteResult {
                body: "cleaned text".to_string(),
                subject: String::new(),
            }
        );
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rewrite_instruction_carries_tone() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let gateway = RewriteGateway::new(generator.clone());

        gateway.rewrite("text", "warm, apologetic").await.unwrap();

        let instruction = generator.last_instruction().unwrap();
        assert!(instruction.starts_with(REWRITE_INSTRUCTION));
        assert!(instruction.ends_with("warm, apologetic"));
    }

    #[tokio::test]
    async fn test_rewrite_blank_tone_uses_default() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let gateway = RewriteGateway::new(generator.clone());

        gateway.rewrite("text", " ").await.unwrap();

        assert!(generator.last_instruction().unwrap().ends_with(DEFAULT_TONE));
    }

    #[tokio::test]
    async fn test_rewrite_empty_content() {
        let generator = Arc::new(FakeGenerator::replying("ok"));
        let gateway = RewriteGateway::new(generator.clone());

        assert!(matches!(gateway.rewrite("", DEFAULT_TONE).await, Err(Error::Validation(_))));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rewrite_no_choices() {
        let generator = Arc::new(FakeGenerator::new());
        generator.push(Ok(vec![]));
        let gateway = RewriteGateway::new(generator);

        assert!(matches!(
            gateway.rewrite("text", DEFAULT_TONE).await,
            Err(Error::Dependency { stage: Stage::Rewrite, .. })
        ));
    }

    #[tokio::test]
    async fn test_rewrite_choice_without_text() {
        let generator = Arc::new(FakeGenerator::new());
        generator.push(Ok(vec![GeneratedChoice { content: None }]));
        let gateway = RewriteGateway::new(generator);

        assert!(matches!(
            gateway.rewrite("text", DEFAULT_TONE).await,
            Err(Error::Dependency { stage: Stage::Rewrite, .. })
        ));
    }

    #[tokio::test]
    async fn test_rewrite_upstream_failure() {
        let gateway = RewriteGateway::new(Arc::new(FakeGenerator::failing()));

        assert!(matches!(
            gateway.rewrite("text", DEFAULT_TONE).await,
            Err(Error::Dependency { stage: Stage::Rewrite, .. })
        ));
    }
}
