mod assistant;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assistant::forwarder::ChatCompletionForwarder;
use crate::assistant::knowledge::KnowledgeBase;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Agroassist API v{}", env!("CARGO_PKG_VERSION"));

    // Reference blocks: built-in unless a directory overrides them
    let knowledge = match &config.knowledge_dir {
        Some(dir) => KnowledgeBase::from_dir(dir)?,
        None => KnowledgeBase::builtin(),
    };

    // Initialize chat-completion forwarder (no network I/O yet)
    let connection = config.connection();
    info!(
        "Chat client initialized (endpoint: {}, deployment: {})",
        connection.endpoint, connection.deployment
    );
    let forwarder = ChatCompletionForwarder::connect(connection, config.llm_timeout, knowledge)?;

    let state = AppState { forwarder };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web front-end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
