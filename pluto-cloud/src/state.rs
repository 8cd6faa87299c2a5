//! Application state for pluto-cloud

use sqlx::PgPool;

use crate::config::Config;
use crate::stripe::StripeGateway;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Stripe REST gateway (credentials and redirect URLs injected at
    /// construction)
    pub stripe: StripeGateway,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let stripe = StripeGateway::new(config)?;

        Ok(Self { pool, stripe })
    }
}
