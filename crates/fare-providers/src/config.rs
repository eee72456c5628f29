//! # Provider Configuration
//!
//! Credentials and endpoints for every upstream API.
//! All secrets are loaded from environment variables.

use fare_core::{BookingError, BookingResult};
use std::env;

fn require_env(name: &str) -> BookingResult<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BookingError::Configuration(format!("{} not set", name)))
}

fn require_prefix(name: &str, value: &str, prefixes: &[&str]) -> BookingResult<()> {
    if prefixes.iter().any(|p| value.starts_with(p)) {
        Ok(())
    } else {
        Err(BookingError::Configuration(format!(
            "{} must start with {}",
            name,
            prefixes.join(" or ")
        )))
    }
}

/// Duffel flights API configuration
#[derive(Debug, Clone)]
pub struct DuffelConfig {
    /// Access token (duffel_test_... or duffel_live_...)
    pub access_token: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// Value of the `Duffel-Version` header
    pub api_version: String,
}

impl DuffelConfig {
    /// Load from `DUFFEL_ACCESS_TOKEN`
    pub fn from_env() -> BookingResult<Self> {
        dotenvy::dotenv().ok();

        let access_token = require_env("DUFFEL_ACCESS_TOKEN")?;
        require_prefix(
            "DUFFEL_ACCESS_TOKEN",
            &access_token,
            &["duffel_test_", "duffel_live_"],
        )?;

        Ok(Self::new(access_token))
    }

    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base_url: "https://api.duffel.com".to_string(),
            api_version: "v2".to_string(),
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Amadeus self-service API configuration (OAuth2 client credentials)
#[derive(Debug, Clone)]
pub struct AmadeusConfig {
    pub client_id: String,
    pub client_secret: String,

    /// `https://test.api.amadeus.com` or `https://api.amadeus.com`
    pub api_base_url: String,
}

impl AmadeusConfig {
    /// Load from `AMADEUS_CLIENT_ID`, `AMADEUS_CLIENT_SECRET` and optional
    /// `AMADEUS_API_BASE_URL`
    pub fn from_env() -> BookingResult<Self> {
        dotenvy::dotenv().ok();

        let client_id = require_env("AMADEUS_CLIENT_ID")?;
        let client_secret = require_env("AMADEUS_CLIENT_SECRET")?;

        let mut config = Self::new(client_id, client_secret);
        if let Ok(url) = env::var("AMADEUS_API_BASE_URL") {
            config.api_base_url = url;
        }
        Ok(config)
    }

    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: "https://test.api.amadeus.com".to_string(),
        }
    }

    /// Check if pointed at the Amadeus test environment
    pub fn is_test_mode(&self) -> bool {
        self.api_base_url.contains("test.api.amadeus.com")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Publishable key (pk_test_... or pk_live_...), handed to the browser
    pub publishable_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_PUBLISHABLE_KEY`
    /// - `STRIPE_WEBHOOK_SECRET`
    pub fn from_env() -> BookingResult<Self> {
        dotenvy::dotenv().ok();

        let secret_key = require_env("STRIPE_SECRET_KEY")?;
        let publishable_key = require_env("STRIPE_PUBLISHABLE_KEY")?;
        let webhook_secret = require_env("STRIPE_WEBHOOK_SECRET")?;

        require_prefix("STRIPE_SECRET_KEY", &secret_key, &["sk_test_", "sk_live_"])?;
        require_prefix(
            "STRIPE_PUBLISHABLE_KEY",
            &publishable_key,
            &["pk_test_", "pk_live_"],
        )?;
        require_prefix("STRIPE_WEBHOOK_SECRET", &webhook_secret, &["whsec_"])?;

        Ok(Self::new(secret_key, publishable_key, webhook_secret))
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        secret_key: impl Into<String>,
        publishable_key: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            webhook_secret: webhook_secret.into(),
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: "2024-12-18.acacia".to_string(),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_modes() {
        let config = StripeConfig::new("sk_test_abc123", "pk_test_xyz789", "whsec_secret");
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let config = StripeConfig::new("sk_live_abc123", "pk_live_xyz789", "whsec_secret");
        assert!(!config.is_test_mode());
        assert!(config.is_live_mode());
    }

    #[test]
    fn test_auth_headers() {
        let stripe = StripeConfig::new("sk_test_abc123", "pk_test_xyz789", "whsec_secret");
        assert_eq!(stripe.auth_header(), "Bearer sk_test_abc123");

        let duffel = DuffelConfig::new("duffel_test_tok");
        assert_eq!(duffel.auth_header(), "Bearer duffel_test_tok");
        assert_eq!(duffel.api_version, "v2");
    }

    #[test]
    fn test_amadeus_defaults_to_test_environment() {
        let config = AmadeusConfig::new("id", "secret");
        assert!(config.is_test_mode());
        assert!(!config
            .with_api_base_url("https://api.amadeus.com")
            .is_test_mode());
    }

    #[test]
    fn test_prefix_validation() {
        assert!(require_prefix("X", "sk_test_1", &["sk_test_", "sk_live_"]).is_ok());
        let err = require_prefix("X", "pk_test_1", &["sk_test_", "sk_live_"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: X must start with sk_test_ or sk_live_"
        );
    }
}
