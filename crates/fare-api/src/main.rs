//! # tripfare
//!
//! Travel booking API: search, quote, pay, confirm.
//!
//! ## Usage
//!
//! ```bash
//! # Offer providers (each optional)
//! export DUFFEL_ACCESS_TOKEN=duffel_test_...
//! export AMADEUS_CLIENT_ID=...
//! export AMADEUS_CLIENT_SECRET=...
//!
//! # Payments
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # LOG_FORMAT=json for one JSON object per line
//! tripfare
//! ```

use fare_api::{routes, AppConfig, AppState};
use fare_providers::REQUIRED_WEBHOOK_EVENTS;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "tripfare booting"
    );

    let state = AppState::new(config)?;
    log_startup(&state);

    let addr = state.config.socket_addr()?;
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tripfare stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn log_startup(state: &AppState) {
    let pricing = &state.pricing;
    info!(
        markup = %pricing.markup_per_passenger,
        service = %pricing.service_per_passenger,
        currency = %pricing.default_currency,
        "Fee schedule per passenger"
    );

    let offers = state.offers.providers();
    if offers.is_empty() {
        warn!("No offer providers configured, search routes will answer 503");
    } else {
        info!("Offer providers: {}", offers.join(", "));
    }

    let payments = state.payments.providers();
    info!("Payment providers: {:?}", payments);
    if payments.contains(&"stripe") {
        info!(
            "Stripe webhook at {}/webhook/stripe must send: {}",
            state.config.base_url,
            REQUIRED_WEBHOOK_EVENTS.join(", ")
        );
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
