//! # Money
//!
//! Currency codes and lenient amount coercion.
//!
//! Upstream providers and browser clients hand us prices as JSON numbers,
//! numeric strings, or not at all. Everything that feeds the pricing engine
//! goes through the coercions here: malformed, missing, non-finite or
//! negative amounts become zero, and a missing passenger count becomes one.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ISO 4217 currency codes without a minor unit
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "ISK", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND",
    "VUV", "XAF", "XOF", "XPF",
];

/// Currencies whose minor unit is a thousandth
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "JOD", "KWD", "OMR", "TND"];

/// ISO 4217 currency code, carried through the booking flow unchanged
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a code (surrounding whitespace is dropped)
    pub fn new(code: impl Into<String>) -> Self {
        let code: String = code.into();
        Self(code.trim().to_string())
    }

    /// Use `code` when present and non-blank, otherwise the configured default
    pub fn resolve(code: Option<&str>, default: &Currency) -> Self {
        match code.map(str::trim) {
            Some(c) if !c.is_empty() => Self::new(c),
            _ => default.clone(),
        }
    }

    /// The code as given
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against another code
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }

    /// Number of decimal places of the minor unit (0 for JPY, 3 for KWD, 2 for most others)
    pub fn decimal_places(&self) -> u32 {
        let upper = self.0.to_ascii_uppercase();
        if ZERO_DECIMAL_CURRENCIES.contains(&upper.as_str()) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&upper.as_str()) {
            3
        } else {
            2
        }
    }

    /// Convert an amount to the smallest currency unit (cents, etc.).
    ///
    /// Returns `None` if the rounded amount does not fit in an `i64`.
    pub fn to_minor_units(&self, amount: Decimal) -> Option<i64> {
        let places = self.decimal_places();
        let rounded = round_money(amount, places);
        rounded
            .checked_mul(Decimal::from(10_i64.pow(places)))
            .and_then(|minor| minor.to_i64())
    }

    /// Convert from smallest unit back to a decimal amount
    pub fn from_minor_units(&self, amount: i64) -> Decimal {
        Decimal::new(amount, self.decimal_places())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round half away from zero to `places` decimal places.
///
/// Only used at presentation and charge boundaries, never inside the engine.
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount with the currency's number of decimal places (e.g. "206.00")
pub fn format_amount(amount: Decimal, currency: &Currency) -> String {
    let places = currency.decimal_places();
    format!("{:.*}", places as usize, round_money(amount, places))
}

/// Clamp negative amounts to zero
pub fn non_negative(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        Decimal::ZERO
    } else {
        amount
    }
}

/// Parse a price string leniently.
///
/// Accepts plain ("355.34") and scientific ("1.5e2") notation. Anything that
/// does not describe a finite, non-negative number resolves to zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    let parsed = trimmed
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
        .or_else(|| {
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(Decimal::from_f64)
        });

    parsed.map(non_negative).unwrap_or(Decimal::ZERO)
}

/// Coerce a JSON value (number, numeric string, null, ...) into an amount
pub fn coerce_amount(value: &Value) -> Decimal {
    match value {
        // serde_json renders floats in their shortest round-trip form
        Value::Number(n) => parse_amount(&n.to_string()),
        Value::String(s) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

/// Coerce a JSON value into a passenger count; anything below one becomes one
pub fn coerce_passengers(value: &Value) -> u32 {
    let count = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };

    match count {
        Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}

/// Serde helpers for lenient request bodies and upstream payloads.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Quote {
///     #[serde(default, deserialize_with = "lenient::amount")]
///     base_amount: Decimal,
/// }
/// ```
pub mod lenient {
    use super::*;
    use serde::Deserializer;

    /// Any JSON value; null, absent or malformed becomes zero
    pub fn amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().map(coerce_amount).unwrap_or(Decimal::ZERO))
    }

    /// Like [`amount`], but keeps "not supplied" (null) distinct from zero
    pub fn optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(v) => Some(coerce_amount(&v)),
        })
    }

    /// Passenger count; null, zero, negative or malformed becomes one
    pub fn passengers<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().map(coerce_passengers).unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_amount_plain_and_scientific() {
        assert_eq!(parse_amount("355.34"), dec!(355.34));
        assert_eq!(parse_amount("  12.5 "), dec!(12.5));
        assert_eq!(parse_amount("200"), dec!(200));
        assert_eq!(parse_amount("1.5e2"), dec!(150));
    }

    #[test]
    fn test_parse_amount_malformed_is_zero() {
        assert_eq!(parse_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("NaN"), Decimal::ZERO);
        assert_eq!(parse_amount("inf"), Decimal::ZERO);
        assert_eq!(parse_amount("12,50 EUR"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_negative_is_zero() {
        assert_eq!(parse_amount("-10"), Decimal::ZERO);
        assert_eq!(parse_amount("-0.01"), Decimal::ZERO);
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(&json!(200)), dec!(200));
        assert_eq!(coerce_amount(&json!(19.99)), dec!(19.99));
        assert_eq!(coerce_amount(&json!("42.10")), dec!(42.10));
        assert_eq!(coerce_amount(&json!(-10)), Decimal::ZERO);
        assert_eq!(coerce_amount(&json!(null)), Decimal::ZERO);
        assert_eq!(coerce_amount(&json!({"amount": 3})), Decimal::ZERO);
        assert_eq!(coerce_amount(&json!(true)), Decimal::ZERO);
    }

    #[test]
    fn test_coerce_passengers() {
        assert_eq!(coerce_passengers(&json!(3)), 3);
        assert_eq!(coerce_passengers(&json!("2")), 2);
        assert_eq!(coerce_passengers(&json!(2.9)), 2);
        assert_eq!(coerce_passengers(&json!(0)), 1);
        assert_eq!(coerce_passengers(&json!(-4)), 1);
        assert_eq!(coerce_passengers(&json!("many")), 1);
        assert_eq!(coerce_passengers(&json!(null)), 1);
    }

    #[test]
    fn test_currency_resolve() {
        let default = Currency::new("EUR");
        assert_eq!(Currency::resolve(Some("usd"), &default).as_str(), "usd");
        assert_eq!(Currency::resolve(Some("  "), &default), default);
        assert_eq!(Currency::resolve(None, &default), default);
    }

    #[test]
    fn test_currency_minor_units() {
        let eur = Currency::new("EUR");
        assert_eq!(eur.to_minor_units(dec!(206)), Some(20600));
        assert_eq!(eur.to_minor_units(dec!(10.995)), Some(1100));
        assert_eq!(eur.from_minor_units(1099), dec!(10.99));

        let jpy = Currency::new("jpy");
        assert_eq!(jpy.decimal_places(), 0);
        assert_eq!(jpy.to_minor_units(dec!(1000)), Some(1000));
        assert_eq!(jpy.from_minor_units(1000), dec!(1000));

        assert_eq!(eur.to_minor_units(Decimal::MAX), None);
    }

    #[test]
    fn test_three_decimal_currency() {
        let kwd = Currency::new("KWD");
        assert_eq!(kwd.decimal_places(), 3);
        assert_eq!(kwd.to_minor_units(dec!(13.5)), Some(13500));
        assert_eq!(kwd.from_minor_units(13500), dec!(13.5));
        assert_eq!(format_amount(dec!(13.5), &kwd), "13.500");
        assert_eq!(Currency::new("bhd").to_minor_units(dec!(0.0005)), Some(1));
    }

    #[test]
    fn test_format_amount() {
        let eur = Currency::new("EUR");
        assert_eq!(format_amount(dec!(206), &eur), "206.00");
        assert_eq!(format_amount(dec!(0.125), &eur), "0.13");
        assert_eq!(format_amount(dec!(1234.5), &Currency::new("JPY")), "1235");
    }

    #[test]
    fn test_lenient_deserialize() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "lenient::amount")]
            amount: Decimal,
            #[serde(default, deserialize_with = "lenient::optional_amount")]
            markup: Option<Decimal>,
            #[serde(default = "one", deserialize_with = "lenient::passengers")]
            passengers: u32,
        }

        fn one() -> u32 {
            1
        }

        let body: Body =
            serde_json::from_value(json!({"amount": "abc", "passengers": "0"})).unwrap();
        assert_eq!(body.amount, Decimal::ZERO);
        assert_eq!(body.markup, None);
        assert_eq!(body.passengers, 1);

        let body: Body =
            serde_json::from_value(json!({"amount": 12.5, "markup": "4", "passengers": 3}))
                .unwrap();
        assert_eq!(body.amount, dec!(12.5));
        assert_eq!(body.markup, Some(dec!(4)));
        assert_eq!(body.passengers, 3);

        let body: Body = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.amount, Decimal::ZERO);
        assert_eq!(body.passengers, 1);
    }
}
