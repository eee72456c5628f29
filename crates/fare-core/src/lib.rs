//! # fare-core
//!
//! Pricing engine and booking domain types for tripfare.
//!
//! This crate provides:
//! - [`compute_pricing`], the one place a booking price is computed
//! - lenient money/currency coercion for upstream and client input
//! - `NormalizedOffer` and search requests shared by all providers
//! - `OfferProvider` and `PaymentStrategy` traits for upstream APIs
//! - `TokenCache` for provider bearer tokens
//! - booking confirmation that re-validates the charge against the breakdown
//! - `BookingError` for typed error handling
//!
//! ## Example
//!
//! ```rust
//! use fare_core::{compute_pricing, Currency, PricingConfig, PricingInput};
//! use rust_decimal::Decimal;
//!
//! let config = PricingConfig::default();
//! let input = PricingInput::new(Decimal::from(200), 2, Currency::new("EUR"), &config);
//! let breakdown = compute_pricing(&input);
//!
//! assert_eq!(breakdown.total_string(), "206.00");
//! ```

pub mod ancillary;
pub mod booking;
pub mod error;
pub mod money;
pub mod offer;
pub mod payment;
pub mod pricing;
pub mod strategy;
pub mod token;

// Re-exports for convenience
pub use ancillary::{selected_total, AncillaryRow};
pub use booking::{confirm_payment, verify_charge, BookingConfirmation};
pub use error::{BookingError, BookingResult};
pub use money::{format_amount, parse_amount, round_money, Currency};
pub use offer::{
    sort_by_price, CabinClass, FlightSearchRequest, HotelSearchRequest, HotelStay,
    NormalizedOffer, OfferKind, Segment,
};
pub use payment::{
    new_booking_ref, PaymentIntent, PaymentIntentRequest, PaymentIntentStatus, WebhookEvent,
    WebhookEventType,
};
pub use pricing::{
    compute_pricing, BreakdownDisplay, PricingBreakdown, PricingConfig, PricingInput,
    QuoteRequest,
};
pub use strategy::{
    BoxedOfferProvider, BoxedPaymentStrategy, OfferProvider, OfferProviderRegistry,
    PaymentStrategy, PaymentStrategySelector,
};
pub use token::{CachedToken, TokenCache};
