mod config;
mod db;
mod errors;
mod harvest;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::harvest::build_harvester;
use crate::jobs::store::PgJobStore;
use crate::matching::service::MatchConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (aborts on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Job Scout API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let harvester = build_harvester(&config);
    info!(
        "Harvester ready (source timeout {}s, {} browser sessions)",
        config.source_timeout_secs, config.max_browser_sessions
    );

    let match_config = MatchConfig::from_config(&config);
    info!(
        "Model routing: local {} ({}), remote {}",
        match_config.local_url,
        match_config.local_model,
        if match_config.remote_api_key.is_empty() {
            "disabled"
        } else {
            "enabled"
        }
    );

    let state = AppState {
        store: Arc::new(PgJobStore::new(db)),
        harvester,
        match_config,
    };

    let origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("CORS_ORIGIN '{}' is not a valid origin", config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
