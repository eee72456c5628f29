//! # Application State
//!
//! Shared state for the Axum application: offer providers, payment
//! strategies, the fee schedule and server configuration.

use anyhow::Context;
use fare_core::{
    BoxedPaymentStrategy, Currency, OfferProviderRegistry, PaymentStrategySelector, PricingConfig,
};
use fare_providers::{AmadeusProvider, DuffelProvider, StripePaymentStrategy};
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Emit JSON log lines (`LOG_FORMAT=json`)
    pub log_json: bool,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_json: std::env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            log_json: false,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Flight and hotel offer sources
    pub offers: OfferProviderRegistry,
    /// Payment strategy selector
    pub payments: PaymentStrategySelector,
    /// Fee schedule applied to every quote, intent and confirmation
    pub pricing: Arc<PricingConfig>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the environment. Providers whose credentials are
    /// missing are skipped with a warning.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pricing = load_pricing_config()?;

        let mut offers = OfferProviderRegistry::new();
        match DuffelProvider::from_env() {
            Ok(provider) => offers.register(Arc::new(provider)),
            Err(e) => warn!("Duffel disabled: {}", e),
        }
        match AmadeusProvider::from_env() {
            Ok(provider) => offers.register(Arc::new(provider)),
            Err(e) => warn!("Amadeus disabled: {}", e),
        }

        let mut payments = PaymentStrategySelector::new("stripe");
        match StripePaymentStrategy::from_env() {
            Ok(strategy) => payments.register(Arc::new(strategy) as BoxedPaymentStrategy),
            Err(e) => warn!("Stripe disabled, payment routes will answer 503: {}", e),
        }

        Ok(Self::from_parts(config, pricing, offers, payments))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: AppConfig,
        pricing: PricingConfig,
        offers: OfferProviderRegistry,
        payments: PaymentStrategySelector,
    ) -> Self {
        Self {
            offers,
            payments,
            pricing: Arc::new(pricing),
            config,
        }
    }
}

/// Load the fee schedule from `config/pricing.toml`, then apply
/// `FARE_*` environment overrides.
pub fn load_pricing_config() -> anyhow::Result<PricingConfig> {
    let config_paths = [
        "config/pricing.toml",
        "../config/pricing.toml",
        "../../config/pricing.toml",
    ];

    let mut config = None;
    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let parsed = PricingConfig::from_toml(&content)
                .with_context(|| format!("Failed to parse {}", path))?;
            info!("Loaded fee schedule from {}", path);
            config = Some(parsed);
            break;
        }
    }

    let config = config.unwrap_or_else(|| {
        warn!("No pricing config found, using built-in fee schedule");
        PricingConfig::default()
    });

    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Apply `FARE_MARKUP_PER_PASSENGER`, `FARE_SERVICE_PER_PASSENGER` and
/// `FARE_DEFAULT_CURRENCY` as returned by `lookup`
pub fn apply_env_overrides(
    mut config: PricingConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PricingConfig> {
    let fee = |name: &str| -> anyhow::Result<Option<Decimal>> {
        let Some(raw) = lookup(name).filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let value = Decimal::from_str(raw.trim())
            .with_context(|| format!("{} must be a decimal amount, got {:?}", name, raw))?;
        anyhow::ensure!(!value.is_sign_negative(), "{} must not be negative", name);
        Ok(Some(value))
    };

    if let Some(markup) = fee("FARE_MARKUP_PER_PASSENGER")? {
        config.markup_per_passenger = markup;
    }
    if let Some(service) = fee("FARE_SERVICE_PER_PASSENGER")? {
        config.service_per_passenger = service;
    }
    if let Some(code) = lookup("FARE_DEFAULT_CURRENCY").filter(|v| !v.trim().is_empty()) {
        config.default_currency = Currency::new(code);
    }

    Ok(config)
}
