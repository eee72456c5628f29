//! # Payment Webhooks
//!
//! Signature verification for Stripe-style signed payloads
//! (`Stripe-Signature: t=<unix>,v1=<hex hmac>`) and dispatch of parsed
//! events to a [`WebhookHandler`].

use chrono::{DateTime, Utc};
use fare_core::{BookingError, BookingResult, Currency, WebhookEvent, WebhookEventType};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Maximum age (and clock skew) of a signed webhook
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Events to enable on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.canceled",
    "payment_intent.amount_capturable_updated",
    "charge.refunded",
];

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> BookingResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        BookingError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(BookingError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &[u8]) -> BookingResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| BookingError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify `header` signs `payload` with `secret` and is no older than
/// `tolerance_secs` at `now`.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> BookingResult<()> {
    let parsed = parse_signature_header(header)?;

    if (now.timestamp() - parsed.timestamp).abs() > tolerance_secs {
        return Err(BookingError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let mut signed_payload = format!("{}.", parsed.timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);
    let expected = compute_hmac_sha256(secret, &signed_payload)?;

    if parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        Ok(())
    } else {
        Err(BookingError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ))
    }
}

/// Build a valid signature header (for tests and local tooling)
pub fn signature_header(secret: &str, payload: &[u8], timestamp: i64) -> BookingResult<String> {
    let mut signed_payload = format!("{}.", timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_hmac_sha256(secret, &signed_payload)?
    ))
}

/// Data carried by a `payment_intent.succeeded` event
#[derive(Debug, Clone)]
pub struct PaymentSucceededData {
    pub payment_intent_id: String,
    pub amount_received: i64,
    pub currency: Currency,
    pub metadata: HashMap<String, String>,
}

impl PaymentSucceededData {
    /// Parse from a webhook event
    pub fn from_event(event: &WebhookEvent) -> BookingResult<Self> {
        let obj = event
            .raw_data
            .as_ref()
            .and_then(|raw| raw.as_object())
            .ok_or_else(|| BookingError::WebhookParseError("Missing event object".to_string()))?;

        let payment_intent_id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| event.payment_intent_id.clone())
            .ok_or_else(|| {
                BookingError::WebhookParseError("Missing payment intent id".to_string())
            })?;

        let amount_received = obj
            .get("amount_received")
            .or_else(|| obj.get("amount"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let currency = obj
            .get("currency")
            .and_then(|v| v.as_str())
            .map(|c| Currency::new(c.to_uppercase()))
            .ok_or_else(|| BookingError::WebhookParseError("Missing currency".to_string()))?;

        let metadata = obj
            .get("metadata")
            .and_then(|m| m.as_object())
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            payment_intent_id,
            amount_received,
            currency,
            metadata,
        })
    }

    /// Our booking reference from metadata
    pub fn booking_ref(&self) -> Option<&str> {
        self.metadata
            .get(fare_core::payment::METADATA_BOOKING_REF)
            .map(|s| s.as_str())
    }
}

/// Webhook event handler.
///
/// Every method defaults to logging the event.
#[allow(unused_variables)]
pub trait WebhookHandler: Send + Sync {
    fn on_payment_succeeded(&self, data: PaymentSucceededData) -> BookingResult<()> {
        info!(
            "Payment succeeded: intent={}, booking_ref={:?}, amount={}",
            data.payment_intent_id,
            data.booking_ref(),
            data.amount_received
        );
        Ok(())
    }

    fn on_payment_authorized(&self, event: &WebhookEvent) -> BookingResult<()> {
        info!("Payment authorized: {:?}", event.payment_intent_id);
        Ok(())
    }

    fn on_payment_failed(&self, event: &WebhookEvent) -> BookingResult<()> {
        warn!("Payment failed: {:?}", event.payment_intent_id);
        Ok(())
    }

    fn on_payment_canceled(&self, event: &WebhookEvent) -> BookingResult<()> {
        warn!("Payment canceled: {:?}", event.payment_intent_id);
        Ok(())
    }

    fn on_refund_issued(&self, event: &WebhookEvent) -> BookingResult<()> {
        info!("Refund issued: {:?}", event.payment_intent_id);
        Ok(())
    }

    fn on_unknown_event(&self, event: &WebhookEvent) -> BookingResult<()> {
        debug!("Unhandled webhook event: {:?}", event.event_type);
        Ok(())
    }
}

/// Handler that only logs
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the matching handler method
pub fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: WebhookEvent,
) -> BookingResult<()> {
    match &event.event_type {
        WebhookEventType::PaymentSucceeded => {
            let data = PaymentSucceededData::from_event(&event)?;
            handler.on_payment_succeeded(data)
        }
        WebhookEventType::PaymentAuthorized => handler.on_payment_authorized(&event),
        WebhookEventType::PaymentFailed => handler.on_payment_failed(&event),
        WebhookEventType::PaymentCanceled => handler.on_payment_canceled(&event),
        WebhookEventType::RefundIssued => handler.on_refund_issued(&event),
        WebhookEventType::Unknown(_) => handler.on_unknown_event(&event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    const SECRET: &str = "whsec_test";

    fn succeeded_event() -> WebhookEvent {
        WebhookEvent {
            event_id: "evt_test".to_string(),
            event_type: WebhookEventType::PaymentSucceeded,
            provider: "stripe".to_string(),
            payment_intent_id: Some("pi_test_456".to_string()),
            amount_minor: Some(20600),
            currency: Some(Currency::new("EUR")),
            raw_data: Some(json!({
                "id": "pi_test_456",
                "object": "payment_intent",
                "amount": 20600,
                "amount_received": 20600,
                "currency": "eur",
                "status": "succeeded",
                "metadata": {"booking_ref": "TF-ABCD1234", "pricing_total": "206.00"}
            })),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("t=1234567890,v1=abc123,v0=old,v1=def456").unwrap();
        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures, vec!["abc123", "def456"]);

        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("t=1").is_err());
    }

    #[test]
    fn test_verify_signature_roundtrip() {
        let now = Utc::now();
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(SECRET, payload, now.timestamp()).unwrap();

        assert!(verify_signature(SECRET, payload, &header, now, SIGNATURE_TOLERANCE_SECS).is_ok());
        assert!(
            verify_signature("whsec_other", payload, &header, now, SIGNATURE_TOLERANCE_SECS)
                .is_err()
        );
        assert!(verify_signature(SECRET, b"{}", &header, now, SIGNATURE_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn test_stale_signature_rejected() {
        let now = Utc::now();
        let payload = b"{}";
        let header = signature_header(SECRET, payload, now.timestamp() - 301).unwrap();

        let err = verify_signature(SECRET, payload, &header, now, SIGNATURE_TOLERANCE_SECS)
            .unwrap_err();
        assert!(matches!(err, BookingError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_parse_payment_succeeded() {
        let data = PaymentSucceededData::from_event(&succeeded_event()).unwrap();
        assert_eq!(data.payment_intent_id, "pi_test_456");
        assert_eq!(data.amount_received, 20600);
        assert_eq!(data.currency.as_str(), "EUR");
        assert_eq!(data.booking_ref(), Some("TF-ABCD1234"));
    }

    #[test]
    fn test_dispatch_webhook() {
        struct TestHandler {
            called: AtomicBool,
        }

        impl WebhookHandler for TestHandler {
            fn on_payment_succeeded(&self, _data: PaymentSucceededData) -> BookingResult<()> {
                self.called.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let handler = TestHandler {
            called: AtomicBool::new(false),
        };
        dispatch_webhook_event(&handler, succeeded_event()).unwrap();
        assert!(handler.called.load(Ordering::SeqCst));
    }
}
