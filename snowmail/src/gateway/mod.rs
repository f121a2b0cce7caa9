//! Gateways wrapping the classifier and text-generation services.
//!
//! Each gateway validates its input, makes exactly one upstream call and
//! normalizes the answer, mapping every upstream failure to
//! [`Error::Dependency`](crate::error::Error::Dependency) tagged with its stage.

pub mod moderation;
pub mod rewrite;
pub mod threats;

use crate::clients::GeneratedChoice;
use crate::error::{Error, Result, Stage};

pub use moderation::{verdict_from_results, ModerationGateway};
pub use rewrite::RewriteGateway;
pub use threats::ThreatGateway;

/// Reject empty or whitespace-only content before any upstream call.
pub(crate) fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::validation("content is required"));
    }
    Ok(())
}

/// Text of the first generated choice.
///
/// No choice, a choice without content, or blank content is a dependency error.
pub(crate) fn first_choice_text(stage: Stage, choices: Vec<GeneratedChoice>) -> Result<String> {
    choices
        .into_iter()
        .next()
        .and_then(|choice| choice.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| Error::unexpected(stage, "no generated choice with text content"))
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Scripted stand-ins for the upstream services.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::clients::{Classifier, ClassifierResult, GeneratedChoice, TextGenerator};
    use crate::error::ClientError;

    pub fn upstream_down() -> ClientError {
        ClientError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }

    /// Classifier returning a fixed result (or failing) and counting calls.
    pub struct FakeClassifier {
        results: Option<Vec<ClassifierResult>>,
        pub calls: AtomicUsize,
    }

    impl FakeClassifier {
        pub fn clean() -> Self {
            Self::with(vec![ClassifierResult {
                flagged: false,
                categories: vec![("harassment".to_string(), false), ("violence".to_string(), false)],
            }])
        }

        pub fn flagging(categories: &[&str]) -> Self {
            Self::with(vec![ClassifierResult {
                flagged: true,
                categories: categories.iter().map(|c| (c.to_string(), true)).collect(),
            }])
        }

        pub fn with(results: Vec<ClassifierResult>) -> Self {
            Self {
                results: Some(results),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                results: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&self, _input: &str) -> Result<Vec<ClassifierResult>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.clone().ok_or_else(upstream_down)
        }
    }

    /// Generator replaying queued responses; an exhausted queue is a failure.
    pub struct FakeGenerator {
        responses: Mutex<VecDeque<Result<Vec<GeneratedChoice>, ClientError>>>,
        pub instructions: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                instructions: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn replying(text: &str) -> Self {
            let fake = Self::new();
            fake.push_text(text);
            fake
        }

        pub fn failing() -> Self {
            let fake = Self::new();
            fake.push(Err(upstream_down()));
            fake
        }

        pub fn push_text(&self, text: &str) {
            self.push(Ok(vec![GeneratedChoice {
                content: Some(text.to_string()),
            }]));
        }

        pub fn push(&self, response: Result<Vec<GeneratedChoice>, ClientError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_instruction(&self) -> Option<String> {
            self.instructions.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(
            &self,
            instruction: &str,
            _input: &str,
        ) -> Result<Vec<GeneratedChoice>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.instructions.lock().unwrap().push(instruction.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(upstream_down()))
        }
    }
}
