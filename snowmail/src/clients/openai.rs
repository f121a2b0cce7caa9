//! OpenAI HTTP client for moderation and chat completions.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{check_status, Classifier, ClassifierResult, GeneratedChoice, TextGenerator};
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    chat_model: String,
    moderation_model: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: SecretString,
        chat_model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            chat_model: chat_model.into(),
            moderation_model: None,
        }
    }

    pub fn with_moderation_model(mut self, model: Option<String>) -> Self {
        self.moderation_model = model;
        self
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResultBlock>,
}

#[derive(Deserialize)]
struct ModerationResultBlock {
    #[serde(default)]
    flagged: bool,
    /// Kept as an ordered map so category order survives decoding
    #[serde(default)]
    categories: Map<String, Value>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl Classifier for OpenAiClient {
    async fn classify(&self, input: &str) -> Result<Vec<ClassifierResult>, ClientError> {
        let url = format!("{}/moderations", self.base_url);
        debug!(input_length = input.len(), "openai_moderation_request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&ModerationRequest {
                input,
                model: self.moderation_model.as_deref(),
            })
            .send()
            .await?;

        let body: ModerationResponse = check_status(response).await?.json().await?;

        let results: Vec<ClassifierResult> = body
            .results
            .into_iter()
            .map(|block| ClassifierResult {
                flagged: block.flagged,
                categories: block
                    .categories
                    .into_iter()
                    .map(|(name, value)| (name, value.as_bool().unwrap_or(false)))
                    .collect(),
            })
            .collect();

        info!(
            result_blocks = results.len(),
            flagged = results.iter().any(|r| r.flagged),
            "openai_moderation_complete"
        );

        Ok(results)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate(
        &self,
        instruction: &str,
        input: &str,
    ) -> Result<Vec<GeneratedChoice>, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %self.chat_model,
            input_length = input.len(),
            "openai_chat_request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&ChatRequest {
                model: &self.chat_model,
                messages: [
                    ChatMessage {
                        role: "system",
                        content: instruction,
                    },
                    ChatMessage {
                        role: "user",
                        content: input,
                    },
                ],
            })
            .send()
            .await?;

        let body: ChatResponse = check_status(response).await?.json().await?;

        let choices: Vec<GeneratedChoice> = body
            .choices
            .into_iter()
            .map(|choice| GeneratedChoice {
                content: choice.message.and_then(|m| m.content),
            })
            .collect();

        info!(choices = choices.len(), "openai_chat_complete");

        Ok(choices)
    }
}
