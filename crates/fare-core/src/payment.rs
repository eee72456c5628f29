//! # Payment Types
//!
//! Payment intents and webhook events exchanged with payment providers.
//! A payment intent is always created from a [`PricingBreakdown`], never from
//! a loose amount, so what is charged is what was quoted.

use crate::error::{BookingError, BookingResult};
use crate::money::{format_amount, Currency};
use crate::pricing::PricingBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata key holding the formatted breakdown total
pub const METADATA_TOTAL: &str = "pricing_total";
/// Metadata key holding our booking reference
pub const METADATA_BOOKING_REF: &str = "booking_ref";

/// Generate a new booking reference (e.g., "TF-3F2A9C1B")
pub fn new_booking_ref() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("TF-{}", id[..8].to_uppercase())
}

/// Request to create a payment intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    /// Our booking reference
    pub booking_ref: String,

    /// Amount in smallest currency unit
    pub amount_minor: i64,

    pub currency: Currency,

    /// Customer email (optional, for receipts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Statement/receipt description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Idempotency key (prevents duplicate intents)
    pub idempotency_key: String,

    /// Breakdown components and caller metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentRequest {
    /// Build a request charging exactly the breakdown total.
    ///
    /// The breakdown components are recorded in metadata so the confirmation
    /// step can compare against them.
    pub fn from_breakdown(
        breakdown: &PricingBreakdown,
        booking_ref: impl Into<String>,
    ) -> BookingResult<Self> {
        let booking_ref = booking_ref.into();
        let amount_minor = breakdown
            .total_minor_units()
            .ok_or_else(|| BookingError::InvalidAmount {
                message: format!("total {} cannot be charged", breakdown.total()),
            })?;

        if amount_minor <= 0 {
            return Err(BookingError::InvalidAmount {
                message: "total must be greater than zero".to_string(),
            });
        }

        let currency = breakdown.currency();
        let fmt = |amount| format_amount(amount, currency);

        let mut metadata = HashMap::new();
        metadata.insert(METADATA_BOOKING_REF.to_string(), booking_ref.clone());
        metadata.insert(METADATA_TOTAL.to_string(), breakdown.total_string());
        metadata.insert("pricing_base".to_string(), fmt(breakdown.base()));
        metadata.insert(
            "pricing_markup_total".to_string(),
            fmt(breakdown.markup_total()),
        );
        metadata.insert(
            "pricing_service_total".to_string(),
            fmt(breakdown.service_total()),
        );
        metadata.insert(
            "pricing_ancillary_total".to_string(),
            fmt(breakdown.ancillary_total()),
        );
        metadata.insert(
            "passengers".to_string(),
            breakdown.passengers().to_string(),
        );

        Ok(Self {
            idempotency_key: format!("{}-{}", booking_ref, amount_minor),
            booking_ref,
            amount_minor,
            currency: currency.clone(),
            customer_email: None,
            description: None,
            metadata,
        })
    }

    /// Set customer email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add metadata (breakdown keys cannot be overwritten)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.entry(key.into()).or_insert_with(|| value.into());
        self
    }
}

/// Status of a payment intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    /// Authorized, funds held
    RequiresCapture,
    Canceled,
    Succeeded,
}

impl PaymentIntentStatus {
    /// Funds are secured (captured or held for capture)
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Succeeded | PaymentIntentStatus::RequiresCapture
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentIntentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentIntentStatus::RequiresAction => "requires_action",
            PaymentIntentStatus::Processing => "processing",
            PaymentIntentStatus::RequiresCapture => "requires_capture",
            PaymentIntentStatus::Canceled => "canceled",
            PaymentIntentStatus::Succeeded => "succeeded",
        }
    }
}

impl Default for PaymentIntentStatus {
    fn default() -> Self {
        PaymentIntentStatus::RequiresPaymentMethod
    }
}

/// A payment intent as reported by a payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent ID
    pub id: String,

    /// Provider name (e.g., "stripe")
    pub provider: String,

    /// Secret the browser uses to confirm the payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Amount in smallest currency unit
    pub amount_minor: i64,

    pub currency: Currency,

    #[serde(default)]
    pub status: PaymentIntentStatus,

    /// Metadata stored on the intent
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    pub created_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Our booking reference, if the intent carries one
    pub fn booking_ref(&self) -> Option<&str> {
        self.metadata.get(METADATA_BOOKING_REF).map(|s| s.as_str())
    }

    /// The breakdown total recorded when the intent was created
    pub fn recorded_total(&self) -> Option<&str> {
        self.metadata.get(METADATA_TOTAL).map(|s| s.as_str())
    }

    /// Amount formatted in major units
    pub fn amount_string(&self) -> String {
        format_amount(
            self.currency.from_minor_units(self.amount_minor),
            &self.currency,
        )
    }
}

/// Webhook event types we care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    /// Payment succeeded
    PaymentSucceeded,
    /// Payment failed
    PaymentFailed,
    /// Payment intent canceled
    PaymentCanceled,
    /// Funds authorized, awaiting capture
    PaymentAuthorized,
    /// Refund issued
    RefundIssued,
    /// Unknown event (passthrough)
    Unknown(String),
}

/// A parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider
    pub event_id: String,

    pub event_type: WebhookEventType,

    /// Provider name
    pub provider: String,

    /// Related payment intent ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    /// Amount (in smallest unit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_minor: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Raw event object (for handlers and debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{compute_pricing, PricingConfig, PricingInput};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn breakdown(base: Decimal) -> PricingBreakdown {
        compute_pricing(&PricingInput::new(
            base,
            2,
            Currency::new("EUR"),
            &PricingConfig::default(),
        ))
    }

    #[test]
    fn test_intent_request_from_breakdown() {
        let req = PaymentIntentRequest::from_breakdown(&breakdown(dec!(200)), "TF-1234").unwrap();

        assert_eq!(req.amount_minor, 20600);
        assert_eq!(req.currency.as_str(), "EUR");
        assert_eq!(req.metadata.get(METADATA_TOTAL).unwrap(), "206.00");
        assert_eq!(req.metadata.get("pricing_markup_total").unwrap(), "2.00");
        assert_eq!(req.metadata.get(METADATA_BOOKING_REF).unwrap(), "TF-1234");
        assert_eq!(req.idempotency_key, "TF-1234-20600");
    }

    #[test]
    fn test_metadata_cannot_override_breakdown() {
        let req = PaymentIntentRequest::from_breakdown(&breakdown(dec!(200)), "TF-1")
            .unwrap()
            .with_metadata(METADATA_TOTAL, "1.00")
            .with_metadata("offer_id", "off_1");

        assert_eq!(req.metadata.get(METADATA_TOTAL).unwrap(), "206.00");
        assert_eq!(req.metadata.get("offer_id").unwrap(), "off_1");
    }

    #[test]
    fn test_uncharged_total_rejected() {
        let free = compute_pricing(
            &PricingInput::new(
                Decimal::ZERO,
                1,
                Currency::new("EUR"),
                &PricingConfig::new(Decimal::ZERO, Decimal::ZERO, Currency::new("EUR")),
            ),
        );
        let err = PaymentIntentRequest::from_breakdown(&free, "TF-1").unwrap_err();
        assert!(matches!(err, BookingError::InvalidAmount { .. }));
    }

    #[test]
    fn test_status_is_paid() {
        assert!(PaymentIntentStatus::Succeeded.is_paid());
        assert!(PaymentIntentStatus::RequiresCapture.is_paid());
        assert!(!PaymentIntentStatus::Processing.is_paid());
        assert!(!PaymentIntentStatus::Canceled.is_paid());
    }

    #[test]
    fn test_booking_ref_format() {
        let r = new_booking_ref();
        assert!(r.starts_with("TF-"));
        assert_eq!(r.len(), 11);
        assert_ne!(r, new_booking_ref());
    }
}
