//! # Booking Error Types
//!
//! Typed error handling for the tripfare booking flow.
//! Search, payment and confirmation operations return `Result<T, BookingError>`.
//! The pricing engine itself never fails; see [`crate::pricing`].

use thiserror::Error;

/// Core error type for all booking operations
#[derive(Debug, Error)]
pub enum BookingError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Amount that cannot be charged (too large for minor units, etc.)
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Charged amount differs from the computed breakdown
    #[error("Amount mismatch: expected {expected}, payment carries {actual}")]
    AmountMismatch { expected: String, actual: String },

    /// Charged currency differs from the computed breakdown
    #[error("Currency mismatch: expected {expected}, payment carries {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Upstream provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with a provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Could not obtain an access token from a provider
    #[error("Authentication with {provider} failed: {message}")]
    AuthenticationFailed { provider: String, message: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Payment intent creation failed
    #[error("Payment intent creation failed: {0}")]
    PaymentIntentFailed(String),

    /// Payment intent exists but has not been paid
    #[error("Payment {payment_intent_id} not completed (status: {status})")]
    PaymentNotCompleted {
        payment_intent_id: String,
        status: String,
    },

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BookingError {
    /// Shorthand for a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        BookingError::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::NetworkError(_)
                | BookingError::RateLimited { .. }
                | BookingError::ProviderError { .. }
                | BookingError::AuthenticationFailed { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::Configuration(_) => 500,
            BookingError::InvalidRequest(_) => 400,
            BookingError::InvalidAmount { .. } => 400,
            BookingError::AmountMismatch { .. } => 409,
            BookingError::CurrencyMismatch { .. } => 409,
            BookingError::ProviderError { .. } => 502,
            BookingError::NetworkError(_) => 503,
            BookingError::AuthenticationFailed { .. } => 502,
            BookingError::WebhookVerificationFailed(_) => 401,
            BookingError::WebhookParseError(_) => 400,
            BookingError::PaymentIntentFailed(_) => 502,
            BookingError::PaymentNotCompleted { .. } => 402,
            BookingError::RateLimited { .. } => 429,
            BookingError::Internal(_) => 500,
            BookingError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::Serialization(err.to_string())
    }
}

/// Result type alias for booking operations
pub type BookingResult<T> = Result<T, BookingError>;
