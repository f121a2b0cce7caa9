//! Webhook endpoint handlers.
//!
//! The Mailgun handler only authenticates and validates. An accepted event is
//! handed to the pipeline on a tracked task and acknowledged immediately; the
//! response never reflects moderation, rewrite or delivery results.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::gate::{Admission, WebhookGate};
use crate::config::{Config, Features};
use crate::dispatch::Forwarder;
use crate::gateway::{ModerationGateway, RewriteGateway, ThreatGateway};
use crate::links::{LinkExtractor, LinkSaver};
use crate::pipeline::Pipeline;
use crate::types::WebhookEvent;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<WebhookGate>,
    pub features: Features,
    pub pipeline: Pipeline,
    pub moderation: ModerationGateway,
    pub rewrite: RewriteGateway,
    pub threats: ThreatGateway,
    pub links: LinkExtractor,
    pub saver: LinkSaver,
    /// Background pipeline runs; drained on shutdown
    pub tasks: TaskTracker,
}

/// Upstream service handles the state is assembled from.
#[derive(Clone)]
pub struct Services {
    pub moderation: ModerationGateway,
    pub rewrite: RewriteGateway,
    pub threats: ThreatGateway,
    pub links: LinkExtractor,
    pub saver: LinkSaver,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: &Config, services: Services) -> Self {
        let gate = WebhookGate::new(
            config.mailgun_signing_key.clone(),
            config.mailgun_signature_max_age,
        )
        .with_domain(config.mailgun_domain.clone());

        Self::from_parts(gate, config.features, config.rewrite_tone.clone(), services)
    }

    pub fn from_parts(
        gate: WebhookGate,
        features: Features,
        tone: String,
        services: Services,
    ) -> Self {
        let pipeline = Pipeline::new(
            services.moderation.clone(),
            services.rewrite.clone(),
            services.forwarder,
            tone,
        );

        Self {
            gate: Arc::new(gate),
            features,
            pipeline,
            moderation: services.moderation,
            rewrite: services.rewrite,
            threats: services.threats,
            links: services.links,
            saver: services.saver,
            tasks: TaskTracker::new(),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Mailgun Webhook
// =============================================================================

/// Webhook response. Only ever carries the admission status.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Mailgun webhook endpoint.
///
/// - 200 `accepted`: authenticated and complete; processing continues in the background
/// - 200 `duplicate`: token already seen; not processed again
/// - 401 `unauthorized`: bad signature or stale timestamp
/// - 406 `not_acceptable`: missing required fields or foreign recipient
pub async fn mailgun_webhook(
    State(state): State<AppState>,
    Form(event): Form<WebhookEvent>,
) -> impl IntoResponse {
    info!(
        recipient = %event.recipient,
        has_body_plain = event.body_plain.is_some(),
        body_plain_length = event.body_plain.as_ref().map(|s| s.len()).unwrap_or(0),
        has_signature = !event.signature.is_empty(),
        "mailgun_webhook_received"
    );

    match state.gate.admit(event) {
        Admission::Accepted(message) => {
            info!(recipient = %message.recipient, "mailgun_accepted");

            let pipeline = state.pipeline.clone();
            state.tasks.spawn(async move {
                pipeline.run_webhook(message).await;
            });

            (StatusCode::OK, Json(WebhookResponse { status: "accepted" }))
        }
        Admission::Duplicate => (StatusCode::OK, Json(WebhookResponse { status: "duplicate" })),
        Admission::Unauthorized => {
            warn!("mailgun_signature_invalid");
            (
                StatusCode::UNAUTHORIZED,
                Json(WebhookResponse {
                    status: "unauthorized",
                }),
            )
        }
        Admission::NotAcceptable(reason) => {
            warn!(reason = %reason, "mailgun_not_acceptable");
            (
                StatusCode::NOT_ACCEPTABLE,
                Json(WebhookResponse {
                    status: "not_acceptable",
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use secrecy::SecretString;
    use tokio::sync::mpsc;

    use super::*;
    use crate::dispatch::fakes::FakeMailer;
    use crate::dispatch::OutboundMail;
    use crate::gateway::fakes::{FakeClassifier, FakeGenerator};
    use crate::links::LinkSaver;
    use crate::web::gate::test_support::{DOMAIN, SIGNING_KEY};

    pub struct TestApp {
        pub state: AppState,
        pub classifier: Arc<FakeClassifier>,
        pub generator: Arc<FakeGenerator>,
        pub sent: mpsc::UnboundedReceiver<OutboundMail>,
    }

    pub fn test_app(
        classifier: FakeClassifier,
        generator: FakeGenerator,
        features: Features,
        store: Arc<dyn crate::clients::BookmarkStore>,
    ) -> TestApp {
        let classifier = Arc::new(classifier);
        let generator = Arc::new(generator);
        let (mailer, sent) = FakeMailer::notifying();

        let services = Services {
            moderation: ModerationGateway::new(classifier.clone()),
            rewrite: RewriteGateway::new(generator.clone()),
            threats: ThreatGateway::new(generator.clone()),
            links: LinkExtractor::new(generator.clone()),
            saver: LinkSaver::new(store),
            forwarder: Forwarder::new(Arc::new(mailer), "review@example.com"),
        };

        let gate = WebhookGate::new(SecretString::from(SIGNING_KEY), 300).with_domain(DOMAIN);

        TestApp {
            state: AppState::from_parts(gate, features, "professional, friendly".to_string(), services),
            classifier,
            generator,
            sent,
        }
    }
}
