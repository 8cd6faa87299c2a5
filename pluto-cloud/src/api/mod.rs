//! API routes for pluto-cloud

pub mod health;
pub mod orders;
pub mod payment;
pub mod products;
pub mod stripe_webhook;

use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::error::ServiceError;
use crate::state::AppState;

/// Handler result: JSON body or a service error rendered through AppError
pub type ApiResult<T> = Result<Json<T>, ServiceError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Product catalog (reads public, writes admin)
    let catalog = Router::new()
        .route("/api/products", get(products::list).post(products::create))
        .route(
            "/api/products/{id}",
            get(products::get)
                .patch(products::update)
                .delete(products::delete),
        );

    // Orders and the ledger operations they trigger
    let orders = Router::new()
        .route("/api/orders", get(orders::list).post(orders::create))
        .route("/api/orders/{id}", get(orders::get))
        .route("/api/orders/{id}/status", patch(orders::update_status))
        .route("/api/orders/{id}/items", post(orders::add_item))
        .route(
            "/api/orders/{id}/items/{item_id}",
            patch(orders::update_item).delete(orders::remove_item),
        )
        .route("/api/orders/{id}/payment", post(payment::create_checkout));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(catalog)
        .merge(orders)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
