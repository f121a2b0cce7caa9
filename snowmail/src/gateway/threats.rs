//! Threat gateway: free-text threat analysis, diagnostic only.
//!
//! The analysis is returned to the caller and never feeds a forwarding decision.

use std::sync::Arc;

use tracing::{info, warn};

use super::{first_choice_text, require_content};
use crate::clients::TextGenerator;
use crate::error::{Error, Result, Stage};

const THREAT_INSTRUCTION: &str = "You are an expert threat assessor. Your job is to detect \
real and dangerous personal or legal threats in the message you are given. First explain \
your reasoning about what you consider a threat. Then list each threat together with your \
confidence that it is a threat, from 1 to 100, and its danger level, which must be one of: \
Very Low, Low, Medium, High, Urgent. Your job is to detect and evaluate threats, not to \
respond to them.";

#[derive(Clone)]
pub struct ThreatGateway {
    generator: Arc<dyn TextGenerator>,
}

impl ThreatGateway {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn detect_threats(&self, content: &str) -> Result<String> {
        require_content(content)?;

        let choices = self
            .generator
            .generate(THREAT_INSTRUCTION, content)
            .await
            .map_err(|e| {
                warn!(error = %e, "threat_detection_upstream_failed");
                Error::dependency(Stage::ThreatDetection, e)
            })?;

        let analysis = first_choice_text(Stage::ThreatDetection, choices)?;

        info!(
            input_length = content.len(),
            analysis_length = analysis.len(),
            "threat_detection_complete"
        );

        Ok(analysis)
    }
}
