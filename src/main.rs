mod backend;
mod catalog;
mod config;
mod error;
mod extractors;
mod models;
mod preferences;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::backend::Backend;
use crate::catalog::CategoryCatalog;
use crate::config::{Cli, Config};
use crate::session::token_cache::TokenCache;
use crate::session::SessionContext;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Build the backend client and the session mirror
    let backend = Backend::new(&config.backend)?;
    let session = SessionContext::new(backend.clone(), TokenCache::new(&data_dir));

    // Initialization is one explicit step; the event loop and refresh task
    // start only after it completes.
    session.initialize().await;
    session.spawn_event_loop();
    session.spawn_refresh_task();

    // Take a first snapshot of the remote category table. The built-in
    // catalog covers for it when the backend is unreachable.
    let catalog = Arc::new(CategoryCatalog::new(backend.clone()));
    if let Err(err) = catalog.refresh().await {
        tracing::warn!(error = %err, "could not fetch categories at startup");
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        backend,
        session,
        catalog,
    };

    // Build router
    let app = Router::new()
        .route("/", get(routes::home::index))
        .route("/assets/{*path}", get(routes::assets::serve))
        .merge(routes::auth::router())
        .merge(routes::intro::router())
        .merge(routes::categories::router())
        .merge(routes::feeds::router())
        .merge(routes::dashboard::router())
        .merge(routes::create_post::router())
        .merge(routes::publisher::router())
        .merge(routes::authors::router())
        .merge(routes::debug::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
