//! pluto-cloud — Pluto shop backend
//!
//! Long-running service that:
//! - Serves the product catalog and order API
//! - Maintains product stock against the order line-item lifecycle
//! - Creates Stripe checkout sessions and reconciles payment webhooks
//! - Sweeps stale unpaid orders on a fixed interval

mod api;
mod config;
mod db;
mod error;
mod ledger;
mod reaper;
mod state;
mod stripe;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pluto_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting pluto-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Stale-order reaper (periodic)
    reaper::spawn(
        state.clone(),
        std::time::Duration::from_secs(config.reaper_interval_secs),
        std::time::Duration::from_secs(config.reaper_threshold_secs),
    );

    // Start HTTP server
    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("pluto-cloud HTTP listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
