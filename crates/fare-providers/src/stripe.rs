//! # Stripe Payment Intents
//!
//! Payment strategy backed by the Stripe Payment Intents API. The browser
//! confirms the intent with its `client_secret`; the server only creates,
//! retrieves and verifies.

use crate::config::StripeConfig;
use crate::http::{build_client, network_error, read_json};
use crate::webhook::{verify_signature, SIGNATURE_TOLERANCE_SECS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fare_core::{
    BookingError, BookingResult, Currency, PaymentIntent, PaymentIntentRequest,
    PaymentIntentStatus, PaymentStrategy, WebhookEvent, WebhookEventType,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe Payment Intents strategy
pub struct StripePaymentStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripePaymentStrategy {
    pub fn new(config: StripeConfig) -> BookingResult<Self> {
        Ok(Self {
            config,
            client: build_client()?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> BookingResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    /// Publishable key for the browser
    pub fn publishable_key(&self) -> &str {
        &self.config.publishable_key
    }

    /// Form body for `POST /v1/payment_intents`
    fn build_form(request: &PaymentIntentRequest) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            (
                "currency".to_string(),
                request.currency.as_str().to_lowercase(),
            ),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        if let Some(ref email) = request.customer_email {
            form.push(("receipt_email".to_string(), email.clone()));
        }
        if let Some(ref description) = request.description {
            form.push(("description".to_string(), description.clone()));
        }

        // sorted so the body is stable for a given request
        let mut keys: Vec<_> = request.metadata.keys().collect();
        keys.sort();
        for key in keys {
            form.push((format!("metadata[{}]", key), request.metadata[key].clone()));
        }

        form
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.config.api_base_url)
    }
}

#[async_trait]
impl PaymentStrategy for StripePaymentStrategy {
    #[instrument(skip(self, request), fields(booking_ref = %request.booking_ref))]
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> BookingResult<PaymentIntent> {
        if request.amount_minor <= 0 {
            return Err(BookingError::InvalidAmount {
                message: "amount must be greater than zero".to_string(),
            });
        }

        debug!(
            "Creating Stripe payment intent: amount={} {}",
            request.amount_minor,
            request.currency.as_str()
        );

        let response = self
            .client
            .post(self.intents_url())
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&Self::build_form(request))
            .send()
            .await
            .map_err(network_error)?;

        // Declines and invalid parameters surface as a failed intent
        let body = read_json(PROVIDER, response)
            .await
            .map_err(|err| match err {
                BookingError::ProviderError { message, .. } => {
                    BookingError::PaymentIntentFailed(message)
                }
                other => other,
            })?;
        let intent = parse_intent(body)?;

        info!(
            "Created Stripe payment intent: id={}, amount={} {}",
            intent.id,
            intent.amount_string(),
            intent.currency.as_str()
        );

        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(&self, intent_id: &str) -> BookingResult<PaymentIntent> {
        if intent_id.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "payment_intent_id is required".to_string(),
            ));
        }

        let response = self
            .client
            .get(format!("{}/{}", self.intents_url(), intent_id))
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(network_error)?;

        let intent = parse_intent(read_json(PROVIDER, response).await?)?;
        debug!(
            "Retrieved Stripe payment intent: id={}, status={}",
            intent.id,
            intent.status.as_str()
        );
        Ok(intent)
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> BookingResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            Utc::now(),
            SIGNATURE_TOLERANCE_SECS,
        )?;

        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            BookingError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        Ok(webhook_event(event))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn client_key(&self) -> Option<&str> {
        Some(self.publishable_key())
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    created: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, Value>,
}

fn parse_status(status: Option<&str>) -> PaymentIntentStatus {
    status
        .and_then(|s| serde_json::from_value(Value::String(s.to_string())).ok())
        .unwrap_or_default()
}

fn parse_intent(body: Value) -> BookingResult<PaymentIntent> {
    let raw: StripePaymentIntent = serde_json::from_value(body).map_err(|e| {
        BookingError::Serialization(format!("Failed to parse Stripe payment intent: {}", e))
    })?;

    Ok(PaymentIntent {
        status: parse_status(raw.status.as_deref()),
        id: raw.id,
        provider: PROVIDER.to_string(),
        client_secret: raw.client_secret,
        amount_minor: raw.amount,
        currency: Currency::new(raw.currency.to_uppercase()),
        metadata: raw.metadata,
        created_at: raw
            .created
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now),
    })
}

fn webhook_event(event: StripeWebhookEvent) -> WebhookEvent {
    let event_type = match event.event_type.as_str() {
        "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
        "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
        "payment_intent.canceled" => WebhookEventType::PaymentCanceled,
        "payment_intent.amount_capturable_updated" => WebhookEventType::PaymentAuthorized,
        "charge.refunded" => WebhookEventType::RefundIssued,
        other => WebhookEventType::Unknown(other.to_string()),
    };

    let object = &event.data.object;

    // payment_intent.* objects are intents; charge.* objects point at one
    let payment_intent_id = if event.event_type.starts_with("payment_intent.") {
        object.get("id")
    } else {
        object.get("payment_intent")
    }
    .and_then(Value::as_str)
    .map(String::from);

    let amount_minor = object
        .get("amount_received")
        .filter(|v| v.as_i64().unwrap_or(0) > 0)
        .or_else(|| object.get("amount"))
        .and_then(Value::as_i64);

    let currency = object
        .get("currency")
        .and_then(Value::as_str)
        .map(|c| Currency::new(c.to_uppercase()));

    WebhookEvent {
        event_id: event.id,
        event_type,
        provider: PROVIDER.to_string(),
        payment_intent_id,
        amount_minor,
        currency,
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        raw_data: Some(Value::Object(event.data.object)),
    }
}
