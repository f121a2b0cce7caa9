//! Web server module.
//!
//! - `POST /webhooks/mailgun`: authenticated inbound mail, acknowledged before processing
//! - `POST /email/*`: direct moderation, rewrite, threat and link endpoints
//! - `GET /health`

pub mod api;
pub mod extract;
pub mod gate;
pub mod handlers;
pub mod replay;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};

pub use extract::ApiJson;
pub use gate::{Admission, WebhookGate};
pub use handlers::{health, mailgun_webhook, AppState, HealthResponse, Services, WebhookResponse};
pub use signature::{is_timestamp_fresh, verify_mailgun_signature, verify_signature};

/// Build the application router.
///
/// Direct endpoints switched off in [`Features`](crate::config::Features) are
/// not registered at all and fall through to the JSON 404 fallback.
pub fn router(state: AppState) -> Router {
    let features = state.features;

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/webhooks/mailgun", post(mailgun_webhook))
        .route("/email/links/extract", post(api::extract_links))
        .route("/email/links/save", post(api::save_links));

    if features.expose_process {
        router = router.route("/email/process", post(api::process));
    }
    if features.expose_moderate {
        router = router.route("/email/moderate", post(api::moderate));
    }
    if features.expose_rewrite {
        router = router.route("/email/rewrite", post(api::rewrite));
    }
    if features.expose_threats {
        router = router.route("/email/threats", post(api::threats));
    }

    router.fallback(api::not_found).with_state(state)
}
