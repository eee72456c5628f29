//! # fare-wasm
//!
//! WebAssembly bindings of the tripfare pricing engine, so the booking
//! summary page renders the same breakdown the server charges.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { compute_pricing, format_amount } from 'fare-wasm';
//!
//! await init();
//!
//! const breakdown = compute_pricing(
//!   { base_amount: offer.total_amount, passengers: 2, currency: 'EUR', ancillary_rows: selected },
//!   { markup_per_passenger: '1', service_per_passenger: '2', default_currency: 'EUR' },
//! );
//!
//! console.log('Total:', breakdown.total); // "256.00"
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build crates/fare-wasm --target web
//! ```

use fare_core::{parse_amount, BreakdownDisplay, Currency, PricingConfig, QuoteRequest};
use wasm_bindgen::prelude::*;

/// Price a quote against a fee schedule (the default schedule when absent)
pub fn price_quote(quote: &QuoteRequest, config: Option<&PricingConfig>) -> BreakdownDisplay {
    let default_config = PricingConfig::default();
    quote.price(config.unwrap_or(&default_config)).display()
}

/// JSON in, JSON out form of [`price_quote`]
pub fn price_quote_json(quote_json: &str, config_json: Option<&str>) -> Result<String, String> {
    let quote: QuoteRequest =
        serde_json::from_str(quote_json).map_err(|e| format!("Invalid quote: {}", e))?;
    let config: Option<PricingConfig> = config_json
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| format!("Invalid fee schedule: {}", e))?;

    serde_json::to_string(&price_quote(&quote, config.as_ref()))
        .map_err(|e| format!("Failed to encode breakdown: {}", e))
}

/// Compute a breakdown from a quote object.
///
/// `config` may be `undefined`, in which case the default fee schedule applies.
#[wasm_bindgen]
pub fn compute_pricing(quote: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let quote: QuoteRequest = serde_wasm_bindgen::from_value(quote)
        .map_err(|e| JsValue::from_str(&format!("Invalid quote: {}", e)))?;
    let config: Option<PricingConfig> = serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid fee schedule: {}", e)))?;

    let default_config = PricingConfig::default();
    let breakdown = quote.price(config.as_ref().unwrap_or(&default_config));
    if breakdown.has_zero_base() {
        web_sys::console::warn_1(&JsValue::from_str(
            "tripfare: quote has a zero base amount; only fees are shown",
        ));
    }

    serde_wasm_bindgen::to_value(&breakdown.display())
        .map_err(|e| JsValue::from_str(&format!("Failed to encode breakdown: {}", e)))
}

/// Format an amount for display in `currency` ("12.5", "EUR" → "12.50").
/// Malformed amounts format as zero.
#[wasm_bindgen]
pub fn format_amount(amount: &str, currency: &str) -> String {
    fare_core::format_amount(parse_amount(amount), &Currency::new(currency))
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_quote_default_schedule() {
        let quote: QuoteRequest = serde_json::from_str(
            r#"{"base_amount": "200", "passengers": 2, "currency": "EUR", "ancillary_total": 50}"#,
        )
        .unwrap();
        let breakdown = price_quote(&quote, None);

        assert_eq!(breakdown.total, "256.00");
        assert_eq!(breakdown.markup_total, "2.00");
        assert_eq!(breakdown.service_total, "4.00");
    }

    #[test]
    fn test_price_quote_json_with_schedule() {
        let out = price_quote_json(
            r#"{"baseAmount": 300, "passengers": 3}"#,
            Some(r#"{"markup_per_passenger": "5", "service_per_passenger": "3", "default_currency": "GBP"}"#),
        )
        .unwrap();
        let breakdown: BreakdownDisplay = serde_json::from_str(&out).unwrap();

        assert_eq!(breakdown.markup_total, "15.00");
        assert_eq!(breakdown.service_total, "9.00");
        assert_eq!(breakdown.total, "324.00");
        assert_eq!(breakdown.currency.as_str(), "GBP");
    }

    #[test]
    fn test_price_quote_json_rejects_non_json() {
        assert!(price_quote_json("not json", None).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount("12.5", "EUR"), "12.50");
        assert_eq!(format_amount("1234.5", "JPY"), "1235");
        assert_eq!(format_amount("abc", "EUR"), "0.00");
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
