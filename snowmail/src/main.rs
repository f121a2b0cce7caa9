//! Snowmail web server.
//!
//! Receives Mailgun webhooks, acknowledges them once authenticated, and runs
//! moderation, rewrite and forwarding in the background.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snowmail::clients::{MailgunClient, OpenAiClient, PocketClient};
use snowmail::gateway::{ModerationGateway, RewriteGateway, ThreatGateway};
use snowmail::links::{LinkExtractor, LinkSaver};
use snowmail::{router, AppState, Config, Forwarder, Services};

/// How long accepted pipeline runs may take to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Missing credentials are fatal here, before anything binds
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        request_timeout_ms = config.request_timeout_ms,
        openai_base_url = %config.openai_base_url,
        openai_chat_model = %config.openai_chat_model,
        mailgun_domain = %config.mailgun_domain,
        forward_to = %config.forward_to,
        expose_process = config.features.expose_process,
        expose_moderate = config.features.expose_moderate,
        expose_rewrite = config.features.expose_rewrite,
        expose_threats = config.features.expose_threats,
        "config_loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .pool_max_idle_per_host(16)
        .build()
        .context("Failed to build HTTP client")?;

    let openai = Arc::new(
        OpenAiClient::new(
            http.clone(),
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_chat_model.clone(),
        )
        .with_moderation_model(config.openai_moderation_model.clone()),
    );

    let mailgun = Arc::new(MailgunClient::new(
        http.clone(),
        config.mailgun_api_base.clone(),
        config.mailgun_domain.clone(),
        config.mailgun_api_key.clone(),
    ));

    let pocket = Arc::new(PocketClient::new(
        http,
        config.pocket_api_base.clone(),
        config.pocket_consumer_key.clone(),
        config.pocket_access_token.clone(),
    ));

    let services = Services {
        moderation: ModerationGateway::new(openai.clone()),
        rewrite: RewriteGateway::new(openai.clone()),
        threats: ThreatGateway::new(openai.clone()),
        links: LinkExtractor::new(openai),
        saver: LinkSaver::new(pocket),
        forwarder: Forwarder::new(mailgun, config.forward_to.clone())
            .with_from(config.forward_from.clone()),
    };

    let state = AppState::new(&config, services);
    let tasks = state.tasks.clone();

    let app = router(state).layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Already-acknowledged runs get to reach a terminal state
    tasks.close();
    info!(in_flight = tasks.len(), "pipeline_drain_started");

    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        tracing::warn!(
            in_flight = tasks.len(),
            timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "pipeline_drain_timed_out"
        );
    }

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
