//! # Pricing Engine
//!
//! The single place a booking price is computed. The quote page, the
//! payment-intent request and the confirmation check all call
//! [`compute_pricing`] with the same input and get the same breakdown.
//!
//! ```text
//! total = base
//!       + markup_per_passenger  × passengers
//!       + service_per_passenger × passengers
//!       + ancillary_total
//! ```
//!
//! Amounts are exact decimals and are never rounded here. Rounding to the
//! currency's minor unit happens in [`PricingBreakdown::display`],
//! [`PricingBreakdown::total_string`] and [`PricingBreakdown::total_minor_units`].
//!
//! The engine never fails: negative amounts clamp to zero, passenger counts
//! below one become one, and arithmetic saturates instead of overflowing.

use crate::ancillary::{selected_total, AncillaryRow};
use crate::money::{format_amount, lenient, non_negative, round_money, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee schedule and defaults supplied by the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Platform markup charged per passenger
    pub markup_per_passenger: Decimal,

    /// Service fee charged per passenger
    pub service_per_passenger: Decimal,

    /// Currency used when an input carries none
    pub default_currency: Currency,
}

impl PricingConfig {
    pub fn new(
        markup_per_passenger: Decimal,
        service_per_passenger: Decimal,
        default_currency: Currency,
    ) -> Self {
        Self {
            markup_per_passenger,
            service_per_passenger,
            default_currency,
        }
    }

    /// Load from TOML (missing keys keep their default)
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl Default for PricingConfig {
    /// 1 markup + 2 service per passenger, EUR
    fn default() -> Self {
        Self {
            markup_per_passenger: Decimal::ONE,
            service_per_passenger: Decimal::TWO,
            default_currency: Currency::new("EUR"),
        }
    }
}

/// Input to [`compute_pricing`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingInput {
    /// Upstream fare for all passengers
    pub base_amount: Decimal,
    pub passengers: u32,
    pub currency: Currency,
    /// Sum of the selected ancillary rows
    pub ancillary_total: Decimal,
    pub markup_per_passenger: Decimal,
    pub service_per_passenger: Decimal,
    /// Selected rows, carried through to the breakdown for display
    pub ancillary_rows: Vec<AncillaryRow>,
}

impl PricingInput {
    /// Create an input with the fee schedule from `config`
    pub fn new(
        base_amount: Decimal,
        passengers: u32,
        currency: Currency,
        config: &PricingConfig,
    ) -> Self {
        Self {
            base_amount,
            passengers,
            currency,
            ancillary_total: Decimal::ZERO,
            markup_per_passenger: config.markup_per_passenger,
            service_per_passenger: config.service_per_passenger,
            ancillary_rows: Vec::new(),
        }
    }

    /// Builder: set the ancillary total without rows
    pub fn with_ancillary_total(mut self, total: Decimal) -> Self {
        self.ancillary_total = total;
        self
    }

    /// Builder: attach selected rows and set the ancillary total to their sum
    pub fn with_ancillaries(mut self, rows: Vec<AncillaryRow>) -> Self {
        self.ancillary_total = selected_total(&rows);
        self.ancillary_rows = rows;
        self
    }

    /// Builder: override the per-passenger markup
    pub fn with_markup_per_passenger(mut self, markup: Decimal) -> Self {
        self.markup_per_passenger = markup;
        self
    }

    /// Builder: override the per-passenger service fee
    pub fn with_service_per_passenger(mut self, service: Decimal) -> Self {
        self.service_per_passenger = service;
        self
    }
}

/// Itemized price. Fields are read-only; recompute rather than patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingBreakdown {
    passengers: u32,
    base: Decimal,
    markup_per_passenger: Decimal,
    service_per_passenger: Decimal,
    markup_total: Decimal,
    service_total: Decimal,
    ancillary_total: Decimal,
    total: Decimal,
    currency: Currency,
    ancillary_rows: Vec<AncillaryRow>,
}

impl PricingBreakdown {
    pub fn passengers(&self) -> u32 {
        self.passengers
    }

    pub fn base(&self) -> Decimal {
        self.base
    }

    pub fn markup_per_passenger(&self) -> Decimal {
        self.markup_per_passenger
    }

    pub fn service_per_passenger(&self) -> Decimal {
        self.service_per_passenger
    }

    pub fn markup_total(&self) -> Decimal {
        self.markup_total
    }

    pub fn service_total(&self) -> Decimal {
        self.service_total
    }

    pub fn ancillary_total(&self) -> Decimal {
        self.ancillary_total
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn ancillary_rows(&self) -> &[AncillaryRow] {
        &self.ancillary_rows
    }

    /// True when the upstream fare resolved to zero (missing or malformed price)
    pub fn has_zero_base(&self) -> bool {
        self.base.is_zero()
    }

    /// Total formatted for a payment provider or a receipt (e.g. "206.00")
    pub fn total_string(&self) -> String {
        format_amount(self.total, &self.currency)
    }

    /// Total in the currency's smallest unit, `None` if it does not fit an `i64`
    pub fn total_minor_units(&self) -> Option<i64> {
        self.currency.to_minor_units(self.total)
    }

    /// Rounded, string-formatted view for clients
    pub fn display(&self) -> BreakdownDisplay {
        let fmt = |amount: Decimal| format_amount(amount, &self.currency);
        let places = self.currency.decimal_places();

        BreakdownDisplay {
            passengers: self.passengers,
            base: fmt(self.base),
            markup_per_passenger: fmt(self.markup_per_passenger),
            service_per_passenger: fmt(self.service_per_passenger),
            markup_total: fmt(self.markup_total),
            service_total: fmt(self.service_total),
            ancillary_total: fmt(self.ancillary_total),
            total: fmt(self.total),
            currency: self.currency.clone(),
            ancillary_rows: self
                .ancillary_rows
                .iter()
                .cloned()
                .map(|mut row| {
                    row.amount = round_money(row.amount, places);
                    row
                })
                .collect(),
        }
    }
}

/// Presentation form of a [`PricingBreakdown`]: every amount rounded and formatted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownDisplay {
    pub passengers: u32,
    pub base: String,
    pub markup_per_passenger: String,
    pub service_per_passenger: String,
    pub markup_total: String,
    pub service_total: String,
    pub ancillary_total: String,
    pub total: String,
    pub currency: Currency,
    pub ancillary_rows: Vec<AncillaryRow>,
}

/// Compute the breakdown for an input. Pure and total.
pub fn compute_pricing(input: &PricingInput) -> PricingBreakdown {
    let passengers = input.passengers.max(1);
    let pax = Decimal::from(passengers);

    let base = non_negative(input.base_amount);
    let markup_per_passenger = non_negative(input.markup_per_passenger);
    let service_per_passenger = non_negative(input.service_per_passenger);
    let ancillary_total = non_negative(input.ancillary_total);

    let markup_total = markup_per_passenger.saturating_mul(pax);
    let service_total = service_per_passenger.saturating_mul(pax);

    let total = base
        .saturating_add(markup_total)
        .saturating_add(service_total)
        .saturating_add(ancillary_total);

    PricingBreakdown {
        passengers,
        base,
        markup_per_passenger,
        service_per_passenger,
        markup_total,
        service_total,
        ancillary_total,
        total,
        currency: input.currency.clone(),
        ancillary_rows: input.ancillary_rows.clone(),
    }
}

fn default_passengers() -> u32 {
    1
}

/// Lenient quote body as sent by clients and checkout steps.
///
/// Fees are not part of the body; they always come from [`PricingConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Offer this quote is for (informational)
    #[serde(default, alias = "offerId", skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,

    #[serde(default, alias = "baseAmount", deserialize_with = "lenient::amount")]
    pub base_amount: Decimal,

    #[serde(
        default = "default_passengers",
        deserialize_with = "lenient::passengers"
    )]
    pub passengers: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Explicit ancillary total; when absent the selected rows are summed
    #[serde(
        default,
        alias = "ancillaryTotal",
        deserialize_with = "lenient::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub ancillary_total: Option<Decimal>,

    #[serde(default, alias = "ancillaryRows")]
    pub ancillary_rows: Vec<AncillaryRow>,
}

impl QuoteRequest {
    pub fn new(base_amount: Decimal, passengers: u32, currency: impl Into<String>) -> Self {
        Self {
            offer_id: None,
            base_amount,
            passengers,
            currency: Some(currency.into()),
            ancillary_total: None,
            ancillary_rows: Vec::new(),
        }
    }

    /// Resolve defaults against the host's fee schedule
    pub fn to_input(&self, config: &PricingConfig) -> PricingInput {
        let currency = Currency::resolve(self.currency.as_deref(), &config.default_currency);
        let ancillary_total = self
            .ancillary_total
            .unwrap_or_else(|| selected_total(&self.ancillary_rows));

        PricingInput {
            base_amount: self.base_amount,
            passengers: self.passengers,
            currency,
            ancillary_total,
            markup_per_passenger: config.markup_per_passenger,
            service_per_passenger: config.service_per_passenger,
            ancillary_rows: self.ancillary_rows.clone(),
        }
    }

    /// Shorthand for `compute_pricing(&self.to_input(config))`
    pub fn price(&self, config: &PricingConfig) -> PricingBreakdown {
        compute_pricing(&self.to_input(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn eur() -> Currency {
        Currency::new("EUR")
    }

    fn input(base: Decimal, passengers: u32) -> PricingInput {
        PricingInput::new(base, passengers, eur(), &PricingConfig::default())
    }

    // ==================== scenarios ====================

    #[test]
    fn test_two_passengers_no_ancillaries() {
        let b = compute_pricing(&input(dec!(200), 2));

        assert_eq!(b.base(), dec!(200));
        assert_eq!(b.markup_total(), dec!(2));
        assert_eq!(b.service_total(), dec!(4));
        assert_eq!(b.ancillary_total(), dec!(0));
        assert_eq!(b.total(), dec!(206));
        assert_eq!(b.currency().as_str(), "EUR");
    }

    #[test]
    fn test_ancillary_total_added() {
        let b = compute_pricing(&input(dec!(200), 2).with_ancillary_total(dec!(50)));
        assert_eq!(b.total(), dec!(256));
    }

    #[test]
    fn test_negative_base_clamped() {
        let b = compute_pricing(&input(dec!(-10), 2));
        assert_eq!(b.base(), Decimal::ZERO);
        assert_eq!(b.total(), dec!(6));
        assert!(b.has_zero_base());
    }

    #[test]
    fn test_custom_fees_three_passengers() {
        let i = input(dec!(300), 3)
            .with_markup_per_passenger(dec!(5))
            .with_service_per_passenger(dec!(3));
        let b = compute_pricing(&i);

        assert_eq!(b.markup_total(), dec!(15));
        assert_eq!(b.service_total(), dec!(9));
        assert_eq!(b.total(), dec!(324));
    }

    // ==================== properties ====================

    #[test]
    fn test_total_is_sum_of_components() {
        let bases = [dec!(0), dec!(0.01), dec!(99.99), dec!(1234.567), dec!(1000000)];
        let fees = [dec!(0), dec!(1), dec!(2.5), dec!(7.333)];

        for base in bases {
            for pax in 1..=6 {
                for markup in fees {
                    for service in fees {
                        let b = compute_pricing(
                            &input(base, pax)
                                .with_markup_per_passenger(markup)
                                .with_service_per_passenger(service)
                                .with_ancillary_total(dec!(12.34)),
                        );
                        let expected = base
                            + markup * Decimal::from(pax)
                            + service * Decimal::from(pax)
                            + dec!(12.34);
                        assert_eq!(b.total(), expected);
                        assert_eq!(
                            b.total(),
                            b.base() + b.markup_total() + b.service_total() + b.ancillary_total()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let i = input(dec!(187.45), 3).with_ancillaries(vec![
            AncillaryRow::new("Checked bag", dec!(30)).with_passenger("pas_1"),
        ]);
        assert_eq!(compute_pricing(&i), compute_pricing(&i));
    }

    #[test]
    fn test_one_more_passenger_adds_per_passenger_fees() {
        let config = PricingConfig::new(dec!(1.25), dec!(2.10), eur());
        for pax in 1..10 {
            let a = compute_pricing(&PricingInput::new(dec!(500), pax, eur(), &config));
            let b = compute_pricing(&PricingInput::new(dec!(500), pax + 1, eur(), &config));
            assert_eq!(b.total() - a.total(), dec!(3.35));
        }
    }

    #[test]
    fn test_zero_passengers_treated_as_one() {
        let b = compute_pricing(&input(dec!(100), 0));
        assert_eq!(b.passengers(), 1);
        assert_eq!(b.total(), dec!(103));
    }

    #[test]
    fn test_currency_carried_unchanged() {
        let i = PricingInput::new(dec!(10), 1, Currency::new("gbp"), &PricingConfig::default());
        assert_eq!(compute_pricing(&i).currency().as_str(), "gbp");
    }

    #[test]
    fn test_full_precision_until_display() {
        let i = input(dec!(100.004), 1).with_ancillary_total(dec!(0.004));
        let b = compute_pricing(&i);

        assert_eq!(b.total(), dec!(103.008));
        assert_eq!(b.total_string(), "103.01");
        assert_eq!(b.total_minor_units(), Some(10301));
        assert_eq!(b.display().base, "100.00");
    }

    #[test]
    fn test_huge_amounts_saturate() {
        let i = input(Decimal::MAX, u32::MAX).with_ancillary_total(Decimal::MAX);
        let b = compute_pricing(&i);
        assert_eq!(b.total(), Decimal::MAX);
        assert_eq!(b.total_minor_units(), None);
    }

    // ==================== quote requests ====================

    #[test]
    fn test_quote_unparseable_base_is_zero() {
        let quote: QuoteRequest = serde_json::from_value(json!({
            "baseAmount": "abc",
            "passengers": 1,
            "currency": "EUR"
        }))
        .unwrap();

        let b = quote.price(&PricingConfig::default());
        assert_eq!(b.base(), Decimal::ZERO);
        assert_eq!(b.total(), dec!(3));
    }

    #[test]
    fn test_quote_negative_passengers_and_missing_currency() {
        let quote: QuoteRequest = serde_json::from_value(json!({
            "base_amount": "200.00",
            "passengers": -2
        }))
        .unwrap();

        let b = quote.price(&PricingConfig::default());
        assert_eq!(b.passengers(), 1);
        assert_eq!(b.currency().as_str(), "EUR");
        assert_eq!(b.total(), dec!(203));
    }

    #[test]
    fn test_quote_sums_rows_when_total_absent() {
        let quote: QuoteRequest = serde_json::from_value(json!({
            "base_amount": 200,
            "passengers": 2,
            "currency": "EUR",
            "ancillary_rows": [
                {"title": "Checked bag", "amount": "35.00"},
                {"title": "Seat 3C", "amount": 15}
            ]
        }))
        .unwrap();

        let b = quote.price(&PricingConfig::default());
        assert_eq!(b.ancillary_total(), dec!(50));
        assert_eq!(b.total(), dec!(256));
        assert_eq!(b.ancillary_rows().len(), 2);
    }

    #[test]
    fn test_quote_explicit_total_wins_over_rows() {
        let mut quote = QuoteRequest::new(dec!(200), 2, "EUR");
        quote.ancillary_total = Some(dec!(10));
        quote.ancillary_rows = vec![AncillaryRow::new("Checked bag", dec!(35))];

        assert_eq!(quote.price(&PricingConfig::default()).total(), dec!(216));
    }

    #[test]
    fn test_config_from_toml() {
        let config = PricingConfig::from_toml(
            r#"
            markup_per_passenger = "1.50"
            service_per_passenger = 3
            default_currency = "USD"
            "#,
        )
        .unwrap();

        assert_eq!(config.markup_per_passenger, dec!(1.50));
        assert_eq!(config.service_per_passenger, dec!(3));
        assert_eq!(config.default_currency.as_str(), "USD");

        let partial = PricingConfig::from_toml("service_per_passenger = 4").unwrap();
        assert_eq!(partial.markup_per_passenger, dec!(1));
        assert_eq!(partial.default_currency.as_str(), "EUR");
    }

    #[test]
    fn test_display_serializes_strings() {
        let b = compute_pricing(&input(dec!(200), 2).with_ancillary_total(dec!(50)));
        let value = serde_json::to_value(b.display()).unwrap();

        assert_eq!(value["total"], "256.00");
        assert_eq!(value["markup_total"], "2.00");
        assert_eq!(value["currency"], "EUR");
        assert_eq!(value["passengers"], 2);
    }
}
