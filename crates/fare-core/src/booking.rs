//! # Booking Confirmation
//!
//! The last step of checkout: before a booking is finalized, the payment
//! intent must carry exactly the amount and currency of the breakdown the
//! traveller was quoted, and the funds must be secured.

use crate::error::{BookingError, BookingResult};
use crate::payment::{PaymentIntent, PaymentIntentStatus};
use crate::pricing::{BreakdownDisplay, PricingBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub booking_ref: String,
    pub payment_intent_id: String,
    pub payment_provider: String,
    pub status: PaymentIntentStatus,
    /// The breakdown that was charged
    pub pricing: BreakdownDisplay,
    pub confirmed_at: DateTime<Utc>,
}

/// Check that `intent` charges exactly `breakdown`.
///
/// Order of checks: currency, minor-unit amount, recorded total metadata,
/// then payment status.
pub fn verify_charge(breakdown: &PricingBreakdown, intent: &PaymentIntent) -> BookingResult<()> {
    let currency = breakdown.currency();
    if !currency.matches(intent.currency.as_str()) {
        return Err(BookingError::CurrencyMismatch {
            expected: currency.to_string(),
            actual: intent.currency.to_string(),
        });
    }

    let expected_minor = breakdown
        .total_minor_units()
        .ok_or_else(|| BookingError::InvalidAmount {
            message: format!("total {} cannot be charged", breakdown.total()),
        })?;

    if expected_minor != intent.amount_minor {
        return Err(BookingError::AmountMismatch {
            expected: breakdown.total_string(),
            actual: intent.amount_string(),
        });
    }

    if let Some(recorded) = intent.recorded_total() {
        if recorded != breakdown.total_string() {
            return Err(BookingError::AmountMismatch {
                expected: breakdown.total_string(),
                actual: recorded.to_string(),
            });
        }
    }

    if !intent.status.is_paid() {
        return Err(BookingError::PaymentNotCompleted {
            payment_intent_id: intent.id.clone(),
            status: intent.status.as_str().to_string(),
        });
    }

    Ok(())
}

/// Verify the charge and produce the confirmation
pub fn confirm_payment(
    breakdown: &PricingBreakdown,
    intent: &PaymentIntent,
) -> BookingResult<BookingConfirmation> {
    verify_charge(breakdown, intent)?;

    let booking_ref = intent
        .booking_ref()
        .map(String::from)
        .ok_or_else(|| {
            BookingError::InvalidRequest(format!(
                "payment {} carries no booking reference",
                intent.id
            ))
        })?;

    Ok(BookingConfirmation {
        booking_ref,
        payment_intent_id: intent.id.clone(),
        payment_provider: intent.provider.clone(),
        status: intent.status,
        pricing: breakdown.display(),
        confirmed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use crate::payment::PaymentIntentRequest;
    use crate::pricing::{compute_pricing, PricingConfig, PricingInput};
    use rust_decimal_macros::dec;

    fn quoted() -> PricingBreakdown {
        compute_pricing(
            &PricingInput::new(dec!(200), 2, Currency::new("EUR"), &PricingConfig::default())
                .with_ancillary_total(dec!(50)),
        )
    }

    fn intent_for(breakdown: &PricingBreakdown, status: PaymentIntentStatus) -> PaymentIntent {
        let req = PaymentIntentRequest::from_breakdown(breakdown, "TF-ABCD1234").unwrap();
        PaymentIntent {
            id: "pi_123".to_string(),
            provider: "stripe".to_string(),
            client_secret: None,
            amount_minor: req.amount_minor,
            currency: req.currency,
            status,
            metadata: req.metadata,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirm_matching_payment() {
        let breakdown = quoted();
        let intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);

        let confirmation = confirm_payment(&breakdown, &intent).unwrap();
        assert_eq!(confirmation.booking_ref, "TF-ABCD1234");
        assert_eq!(confirmation.pricing.total, "256.00");
        assert_eq!(confirmation.payment_provider, "stripe");
    }

    #[test]
    fn test_provider_lowercase_currency_accepted() {
        let breakdown = quoted();
        let mut intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);
        intent.currency = Currency::new("eur");

        assert!(verify_charge(&breakdown, &intent).is_ok());
    }

    #[test]
    fn test_amount_mismatch() {
        let breakdown = quoted();
        let mut intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);
        intent.amount_minor = 20600;

        let err = verify_charge(&breakdown, &intent).unwrap_err();
        match err {
            BookingError::AmountMismatch { expected, actual } => {
                assert_eq!(expected, "256.00");
                assert_eq!(actual, "206.00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_recorded_total_mismatch() {
        let breakdown = quoted();
        let mut intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);
        intent
            .metadata
            .insert(crate::payment::METADATA_TOTAL.to_string(), "255.99".into());

        assert!(matches!(
            verify_charge(&breakdown, &intent),
            Err(BookingError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_currency_mismatch() {
        let breakdown = quoted();
        let mut intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);
        intent.currency = Currency::new("USD");

        assert!(matches!(
            verify_charge(&breakdown, &intent),
            Err(BookingError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_unpaid_intent() {
        let breakdown = quoted();
        let intent = intent_for(&breakdown, PaymentIntentStatus::RequiresAction);

        let err = confirm_payment(&breakdown, &intent).unwrap_err();
        assert_eq!(err.status_code(), 402);
    }

    #[test]
    fn test_missing_booking_ref() {
        let breakdown = quoted();
        let mut intent = intent_for(&breakdown, PaymentIntentStatus::Succeeded);
        intent.metadata.remove(crate::payment::METADATA_BOOKING_REF);

        assert!(matches!(
            confirm_payment(&breakdown, &intent),
            Err(BookingError::InvalidRequest(_))
        ));
    }
}
