//! Moderation gateway: one classifier call, normalized into a verdict.

use std::sync::Arc;

use tracing::{info, warn};

use super::require_content;
use crate::clients::{Classifier, ClassifierResult};
use crate::error::{Error, Result, Stage};
use crate::types::ModerationVerdict;

#[derive(Clone)]
pub struct ModerationGateway {
    classifier: Arc<dyn Classifier>,
}

impl ModerationGateway {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Classify `content`. Upstream failures are never read as clean or flagged.
    pub async fn moderate(&self, content: &str) -> Result<ModerationVerdict> {
        require_content(content)?;

        let results = self.classifier.classify(content).await.map_err(|e| {
            warn!(error = %e, "moderation_upstream_failed");
            Error::dependency(Stage::Moderation, e)
        })?;

        if results.is_empty() {
            warn!("moderation_empty_results");
            return Err(Error::unexpected(Stage::Moderation, "classifier returned no results"));
        }

        let verdict = verdict_from_results(&results);

        info!(
            flagged = verdict.flagged,
            categories = ?verdict.categories,
            result_blocks = results.len(),
            "moderation_complete"
        );

        Ok(verdict)
    }
}

/// Fold classifier result blocks into one verdict.
///
/// Categories are the union of every true category across all blocks, in the
/// order first reported. `flagged` is derived from the categories alone, so a
/// block's own `flagged` field never overrides them.
pub fn verdict_from_results(results: &[ClassifierResult]) -> ModerationVerdict {
    let mut categories: Vec<String> = Vec::new();

    for result in results {
        for (name, is_true) in &result.categories {
            if *is_true && !categories.iter().any(|c| c == name) {
                categories.push(name.clone());
            }
        }
    }

    ModerationVerdict {
        flagged: !categories.is_empty(),
        categories,
    }
}
