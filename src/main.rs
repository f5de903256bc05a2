use anyhow::Result;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::session::SessionStore;
use services::store::{InMemoryStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    let app = routes::router(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    store: Arc<dyn Store>,
    sessions: SessionStore,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let sessions = SessionStore::new(config.session_capacity, config.session_ttl);
        Self {
            config,
            store,
            sessions,
        }
    }
}
