//! # fare-providers
//!
//! Upstream integrations for tripfare:
//!
//! 1. **DuffelProvider** - flight offers with bookable ancillaries
//! 2. **AmadeusProvider** - flight and hotel offers (OAuth2, cached token)
//! 3. **StripePaymentStrategy** - payment intents and signed webhooks
//!
//! Each provider's JSON is normalized by a pure function in [`adapters`],
//! so adapters can be tested against recorded payloads without a network.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fare_core::{OfferProviderRegistry, OfferKind};
//! use fare_providers::{AmadeusProvider, DuffelProvider};
//! use std::sync::Arc;
//!
//! let registry = OfferProviderRegistry::new()
//!     .with_provider(Arc::new(DuffelProvider::from_env()?))
//!     .with_provider(Arc::new(AmadeusProvider::from_env()?));
//!
//! for provider in registry.supporting(OfferKind::Flight) {
//!     let offers = provider.search_flights(&request).await?;
//! }
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use fare_providers::webhook::{dispatch_webhook_event, LoggingWebhookHandler};
//!
//! let event = stripe.verify_webhook(payload, signature).await?;
//! dispatch_webhook_event(&LoggingWebhookHandler, event)?;
//! ```

pub mod adapters;
pub mod amadeus;
pub mod config;
pub mod duffel;
mod http;
pub mod stripe;
pub mod webhook;

// Re-exports
pub use amadeus::AmadeusProvider;
pub use config::{AmadeusConfig, DuffelConfig, StripeConfig};
pub use duffel::DuffelProvider;
pub use http::error_message;
pub use stripe::StripePaymentStrategy;
pub use webhook::{
    dispatch_webhook_event, LoggingWebhookHandler, PaymentSucceededData, WebhookHandler,
    REQUIRED_WEBHOOK_EVENTS,
};
