mod config;
mod metrics;
mod routes;
mod state;

use anyhow::{Context, Result};
use chat::{ChatBridge, ChatClient};
use config::AppConfig;
use metrics::Metrics;
use registry::{DocumentFetcher, builtin_definitions, load_cases, load_definitions};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    if std::env::var("NIPS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let config = AppConfig::load()?;
    tracing::info!(mode = ?config.mode, data_root = ?config.data.root, "Configuration loaded");

    // Case definitions
    let definitions = match &config.data.cases_file {
        Some(path) => load_definitions(path).await?,
        None => builtin_definitions(),
    };

    // Attach extraction documents
    let fetcher = DocumentFetcher::new(config.data.root.clone());
    let loaded = load_cases(&fetcher, definitions).await;

    let metrics = Metrics::new();
    metrics.record_failed_documents(loaded.failed_documents);

    // Chat backend
    let client = ChatClient::new(
        &config.chat.base_url,
        Duration::from_secs(config.chat.request_timeout_secs),
    )?;
    let bridge = ChatBridge::new(client, config.chat.history_window, config.chat.client_tag.clone());

    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::new(config, loaded.cases, bridge, metrics));
    let app = routes::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
