//! Direct-invocation endpoints.
//!
//! These run a gateway or the pipeline synchronously and return its result.
//! The moderation, rewrite, threat and process endpoints are switched by
//! [`Features`](crate::config::Features). A disabled one is never routed and
//! answers 404 like any unknown path, whatever the request body.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::ApiJson;
use super::handlers::AppState;
use crate::error::{Error, Result};
use crate::links::SaveFailure;
use crate::types::{InboundMessage, LinkCandidate, ModerationVerdict, ProcessingOutcome, RewriteResult};

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: String,
}

/// A full message for the process endpoint. Only `content` is required.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipient: String,
}

#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThreatResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct LinksResponse {
    pub links: Vec<LinkCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct SaveLinksRequest {
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveLinksResponse {
    pub status: &'static str,
    pub saved: usize,
    pub failed: Vec<SaveFailure>,
}

/// Fallback for unknown and switched-off routes.
pub async fn not_found() -> Error {
    Error::Disabled
}

fn ensure_enabled(enabled: bool) -> Result<()> {
    if enabled {
        Ok(())
    } else {
        Err(Error::Disabled)
    }
}

// =============================================================================
// Gated Endpoints
// =============================================================================

/// Run a message through moderation and rewrite without forwarding it.
pub async fn process(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ProcessRequest>,
) -> Result<Json<ProcessingOutcome>> {
    ensure_enabled(state.features.expose_process)?;

    let message = InboundMessage {
        recipient: request.recipient,
        sender: request.sender,
        subject: request.subject,
        content: request.content,
        html: None,
        received_at: Utc::now(),
    };

    let outcome = state.pipeline.process(&message).await?;

    info!(
        flagged = outcome.flagged,
        flags = ?outcome.flags,
        "api_process_complete"
    );

    Ok(Json(outcome))
}

pub async fn moderate(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> Result<Json<ModerationVerdict>> {
    ensure_enabled(state.features.expose_moderate)?;
    Ok(Json(state.moderation.moderate(&request.content).await?))
}

pub async fn rewrite(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RewriteRequest>,
) -> Result<Json<RewriteResult>> {
    ensure_enabled(state.features.expose_rewrite)?;
    let tone = request.tone.unwrap_or_default();
    Ok(Json(state.rewrite.rewrite(&request.content, &tone).await?))
}

pub async fn threats(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> Result<Json<ThreatResponse>> {
    ensure_enabled(state.features.expose_threats)?;
    let analysis = state.threats.detect_threats(&request.content).await?;
    Ok(Json(ThreatResponse { analysis }))
}

// =============================================================================
// Link Endpoints
// =============================================================================

pub async fn extract_links(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> Result<Json<LinksResponse>> {
    let links = state.links.extract_links(&request.content).await?;
    Ok(Json(LinksResponse { links }))
}

/// Save caller-supplied URLs. Blank entries are ignored; failures are listed.
pub async fn save_links(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SaveLinksRequest>,
) -> Json<SaveLinksResponse> {
    let links: Vec<LinkCandidate> = request
        .links
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| LinkCandidate::new(l, None))
        .collect();

    let report = state.saver.save_all(&links).await;

    Json(SaveLinksResponse {
        status: "ok",
        saved: report.saved,
        failed: report.failed,
    })
}
