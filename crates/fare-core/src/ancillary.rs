//! # Ancillaries
//!
//! Optional paid add-ons (bags, seats, cancellation protection) attached to an
//! offer. Providers list what is available; the client sends back only the
//! rows the traveller selected.

use crate::money::{lenient, non_negative, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One ancillary line, as offered by a provider or selected by a traveller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncillaryRow {
    /// Display title (e.g., "Checked bag 23kg")
    pub title: String,

    /// Price of this row
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: Decimal,

    /// Currency of `amount` (usually the offer currency)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Passenger this row applies to
    #[serde(default, alias = "passengerRef", skip_serializing_if = "Option::is_none")]
    pub passenger_ref: Option<String>,

    /// Segment this row applies to
    #[serde(default, alias = "segmentRef", skip_serializing_if = "Option::is_none")]
    pub segment_ref: Option<String>,

    /// Free-form details (weight, seat designator, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Provider's service ID, needed to book the add-on
    #[serde(default, alias = "serviceId", skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

impl AncillaryRow {
    pub fn new(title: impl Into<String>, amount: Decimal) -> Self {
        Self {
            title: title.into(),
            amount,
            currency: None,
            passenger_ref: None,
            segment_ref: None,
            details: None,
            service_id: None,
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_passenger(mut self, passenger_ref: impl Into<String>) -> Self {
        self.passenger_ref = Some(passenger_ref.into());
        self
    }

    pub fn with_segment(mut self, segment_ref: impl Into<String>) -> Self {
        self.segment_ref = Some(segment_ref.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }
}

/// Sum of the given rows. Callers pass only selected rows; nothing is filtered here.
pub fn selected_total(rows: &[AncillaryRow]) -> Decimal {
    rows.iter()
        .map(|row| non_negative(row.amount))
        .fold(Decimal::ZERO, |acc, amount| acc.saturating_add(amount))
}
