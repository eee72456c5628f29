//! # Routes
//!
//! Axum router configuration for the booking API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Search:
///   - POST /api/v1/flights/search - Aggregated flight offers
///   - POST /api/v1/hotels/search - Aggregated hotel offers
///
/// - Checkout:
///   - POST /api/v1/pricing/quote - Price breakdown for a quote
///   - POST /api/v1/payments/intent - Payment intent for a quote
///   - POST /api/v1/bookings/confirm - Confirm a paid booking
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/flights/search", post(handlers::search_flights))
        .route("/hotels/search", post(handlers::search_hotels))
        .route("/pricing/quote", post(handlers::quote))
        .route("/payments/intent", post(handlers::create_payment_intent))
        .route("/bookings/confirm", post(handlers::confirm_booking));

    // Raw body, signature checked in the handler
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
