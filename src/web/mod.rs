//! HTTP interface - the axum router and its handlers.
//!
//! Handlers are thin: they extract the request, call into [`crate::core`]
//! and wrap the result in JSON. Failures become responses through the
//! `IntoResponse` impl in [`response`].

use crate::config::AppConfig;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod products;
pub mod response;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: Arc<DatabaseConnection>,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Bundles a connection and a configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}

async fn healthz(State(state): State<AppState>) -> crate::errors::Result<Json<Value>> {
    state.db.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// Builds the application router with request tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(catalog::home))
        .route("/categories", get(catalog::categories))
        .route("/category/{slug}", get(catalog::category_products))
        .route("/search", get(catalog::search))
        .route("/product/{slug}", get(catalog::product_detail))
        .route("/products", post(products::create))
        .route("/products/mine", get(products::mine))
        .route("/products/{id}/update", post(products::update))
        .route("/products/{id}/delete", post(products::delete))
        .route("/cart", get(cart::view))
        .route("/cart/add/{product_id}", post(cart::add))
        .route("/cart/remove/{cart_item_id}", post(cart::remove))
        .route("/cart/update/{cart_item_id}", post(cart::update))
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .route("/accounts/logout", post(accounts::logout))
        .route(
            "/accounts/profile",
            get(accounts::profile).post(accounts::update_profile),
        )
        .route("/orders", get(orders::list))
        .route("/orders/checkout", post(orders::checkout))
        .route("/orders/{id}", get(orders::detail))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/orders/{id}/status", post(orders::set_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
