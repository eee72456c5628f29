//! # Provider Strategy Traits
//!
//! Strategy pattern traits for the upstream APIs tripfare composes.
//!
//! ```text
//! ┌──────────────────────────────┐    ┌──────────────────────────────┐
//! │     OfferProvider (trait)    │    │   PaymentStrategy (trait)    │
//! │  ├── search_flights()        │    │  ├── create_payment_intent() │
//! │  ├── search_hotels()         │    │  ├── retrieve_payment_intent()│
//! │  └── provider_name()         │    │  ├── verify_webhook()        │
//! └──────────────┬───────────────┘    │  └── provider_name()         │
//!        ┌───────┴───────┐            └──────────────┬───────────────┘
//!  ┌─────┴─────┐   ┌─────┴─────┐              ┌──────┴──────┐
//!  │  Duffel   │   │  Amadeus  │              │   Stripe    │
//!  └───────────┘   └───────────┘              └─────────────┘
//! ```

use crate::error::{BookingError, BookingResult};
use crate::offer::{FlightSearchRequest, HotelSearchRequest, NormalizedOffer, OfferKind};
use crate::payment::{PaymentIntent, PaymentIntentRequest, WebhookEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// An upstream source of flight and/or hotel offers.
///
/// Implementations normalize their provider's JSON into [`NormalizedOffer`].
#[async_trait]
pub trait OfferProvider: Send + Sync {
    /// Search flight offers
    async fn search_flights(
        &self,
        request: &FlightSearchRequest,
    ) -> BookingResult<Vec<NormalizedOffer>> {
        let _ = request;
        Err(BookingError::InvalidRequest(format!(
            "{} does not sell flights",
            self.provider_name()
        )))
    }

    /// Search hotel offers
    async fn search_hotels(
        &self,
        request: &HotelSearchRequest,
    ) -> BookingResult<Vec<NormalizedOffer>> {
        let _ = request;
        Err(BookingError::InvalidRequest(format!(
            "{} does not sell hotels",
            self.provider_name()
        )))
    }

    /// Offer kinds this provider can search
    fn supports(&self, kind: OfferKind) -> bool;

    /// Get the provider name (for logging and routing)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared offer provider (dynamic dispatch)
pub type BoxedOfferProvider = Arc<dyn OfferProvider>;

/// All configured offer providers
#[derive(Clone, Default)]
pub struct OfferProviderRegistry {
    providers: Vec<BoxedOfferProvider>,
}

impl OfferProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider (a provider with the same name is replaced)
    pub fn register(&mut self, provider: BoxedOfferProvider) {
        self.providers
            .retain(|p| p.provider_name() != provider.provider_name());
        self.providers.push(provider);
    }

    /// Register with builder pattern
    pub fn with_provider(mut self, provider: BoxedOfferProvider) -> Self {
        self.register(provider);
        self
    }

    /// Providers able to search `kind`, in registration order
    pub fn supporting(&self, kind: OfferKind) -> Vec<BoxedOfferProvider> {
        self.providers
            .iter()
            .filter(|p| p.supports(kind))
            .cloned()
            .collect()
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<&BoxedOfferProvider> {
        self.providers.iter().find(|p| p.provider_name() == name)
    }

    /// List all registered provider names
    pub fn providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Create a payment intent for the exact amount in `request`.
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> BookingResult<PaymentIntent>;

    /// Fetch the current state of an intent.
    async fn retrieve_payment_intent(&self, intent_id: &str) -> BookingResult<PaymentIntent>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str)
        -> BookingResult<WebhookEvent>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;

    /// Public key the browser initializes the provider's SDK with, if any
    fn client_key(&self) -> Option<&str> {
        None
    }
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Strategy selector for multiple payment providers
#[derive(Clone)]
pub struct PaymentStrategySelector {
    strategies: HashMap<String, BoxedPaymentStrategy>,
    default_provider: String,
}

impl PaymentStrategySelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a payment strategy
    pub fn register(&mut self, strategy: BoxedPaymentStrategy) {
        let name = strategy.provider_name().to_string();
        self.strategies.insert(name, strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedPaymentStrategy) -> Self {
        self.register(strategy);
        self
    }

    /// Get the default strategy
    pub fn default_strategy(&self) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(&self.default_provider)
    }

    /// Get a strategy by provider name
    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(provider)
    }

    /// Get strategy or fall back to default
    pub fn get_or_default(&self, provider: Option<&str>) -> Option<&BoxedPaymentStrategy> {
        match provider {
            Some(p) => self.get(p).or_else(|| self.default_strategy()),
            None => self.default_strategy(),
        }
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider is registered
    pub fn has_provider(&self, provider: &str) -> bool {
        self.strategies.contains_key(provider)
    }
}

impl Default for PaymentStrategySelector {
    fn default() -> Self {
        Self::new("stripe")
    }
}
