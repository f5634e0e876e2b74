//! # Routes
//!
//! Axum router for the trusted backend boundary.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - POST /api/v1/gateway-token - Issue a widget client token
/// - POST /api/v1/orders - Create a redirect order
/// - POST /api/v1/confirm - Confirm a payment artifact (idempotent)
/// - POST /webhook/processor - Processor settlement webhook
/// - GET  /health - Health check
pub fn create_router(state: AppState) -> Router {
    // The checkout runs in the payer's browser, so the API endpoints
    // need CORS; the webhook route stays outside the CORS layer and
    // accepts a raw body for signature verification.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/gateway-token", post(handlers::issue_gateway_token))
        .route("/orders", post(handlers::create_order))
        .route("/confirm", post(handlers::confirm_payment))
        .layer(cors);

    let webhook_routes = Router::new().route("/processor", post(handlers::processor_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
