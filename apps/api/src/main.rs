mod compare;
mod config;
mod drawer;
mod errors;
mod explain;
mod instrumentation;
mod models;
mod plan;
mod routes;
mod state;
mod why_client;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::compare::session::CompareSessions;
use crate::config::Config;
use crate::instrumentation::WhySink;
use crate::routes::build_router;
use crate::state::AppState;
use crate::why_client::HttpWhyClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruiter API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize WHY service client
    let why = HttpWhyClient::new(
        &config.why_service_url,
        Duration::from_secs(config.why_service_timeout_secs),
    )?
    .with_token(config.why_service_token.clone())
    .with_max_attempts(config.why_service_max_attempts);
    info!("WHY client initialized (endpoint: {})", why.endpoint());

    // Initialize why_opened sink
    let sink = match &config.why_log_path {
        Some(path) => WhySink::open(path.clone()).await,
        None => WhySink::in_memory(),
    };
    info!("WHY event sink ready ({} events)", sink.len().await);

    // Build app state
    let state = AppState {
        why: Arc::new(why),
        sink: Arc::new(sink),
        sessions: CompareSessions::with_limits(
            Duration::from_secs(config.compare_idle_secs),
            config.compare_max_sessions,
        ),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
