//! # Offer Adapters
//!
//! One set of pure functions per upstream JSON shape, each producing
//! [`fare_core::NormalizedOffer`]. Adapters never fail: an entry without an
//! ID is skipped, and a missing or malformed price becomes zero so the
//! checkout flow degrades instead of aborting.

pub mod amadeus;
pub mod duffel;

use serde_json::Value;

/// String at a nested path (`["origin", "iata_code"]`)
pub(crate) fn str_at(value: &Value, path: &[&str]) -> Option<String> {
    value_at(value, path)
        .and_then(Value::as_str)
        .map(String::from)
}

/// Value at a nested path
pub(crate) fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// Array at a nested path, empty if absent
pub(crate) fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    value_at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
