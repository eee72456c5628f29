//! Duffel offer shape (`/air/offer_requests`, `/air/offers`).

use super::{array_at, str_at, value_at};
use chrono::{DateTime, Utc};
use fare_core::money::coerce_amount;
use fare_core::{AncillaryRow, Currency, NormalizedOffer, OfferKind, Segment};
use rust_decimal::Decimal;
use serde_json::Value;

pub const PROVIDER: &str = "duffel";

/// All offers in an offer request response (`{"data": {"offers": [...]}}`)
pub fn normalize_offer_request(response: &Value) -> Vec<NormalizedOffer> {
    array_at(response, &["data", "offers"])
        .iter()
        .filter_map(normalize_offer)
        .collect()
}

/// A single Duffel offer; `None` if it has no ID
pub fn normalize_offer(offer: &Value) -> Option<NormalizedOffer> {
    let id = str_at(offer, &["id"])?;

    let base_amount = offer
        .get("total_amount")
        .map(coerce_amount)
        .unwrap_or(Decimal::ZERO);
    let currency = Currency::new(str_at(offer, &["total_currency"]).unwrap_or_default());
    let passengers = array_at(offer, &["passengers"]).len().max(1) as u32;

    let segments = array_at(offer, &["slices"])
        .iter()
        .flat_map(|slice| array_at(slice, &["segments"]))
        .map(normalize_segment)
        .collect();

    let ancillaries = array_at(offer, &["available_services"])
        .iter()
        .map(normalize_service)
        .collect();

    let expires_at = str_at(offer, &["expires_at"])
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(NormalizedOffer {
        id,
        provider: PROVIDER.to_string(),
        kind: OfferKind::Flight,
        base_amount,
        currency,
        passengers,
        segments,
        stay: None,
        ancillaries,
        expires_at,
    })
}

fn normalize_segment(segment: &Value) -> Segment {
    Segment {
        id: str_at(segment, &["id"]),
        origin: str_at(segment, &["origin", "iata_code"]).unwrap_or_default(),
        destination: str_at(segment, &["destination", "iata_code"]).unwrap_or_default(),
        departing_at: str_at(segment, &["departing_at"]).unwrap_or_default(),
        arriving_at: str_at(segment, &["arriving_at"]).unwrap_or_default(),
        carrier: str_at(segment, &["marketing_carrier", "iata_code"]),
        flight_number: str_at(segment, &["marketing_carrier_flight_number"]),
        duration: str_at(segment, &["duration"]),
    }
}

/// `available_services` entry → ancillary row (not selected)
fn normalize_service(service: &Value) -> AncillaryRow {
    let kind = str_at(service, &["type"]).unwrap_or_default();
    let sub_kind = str_at(service, &["metadata", "type"]);

    let title = match (kind.as_str(), sub_kind.as_deref()) {
        ("baggage", Some("checked")) => "Checked bag".to_string(),
        ("baggage", Some("carry_on")) => "Carry-on bag".to_string(),
        ("baggage", _) => "Bag".to_string(),
        ("seat", _) => "Seat selection".to_string(),
        ("cancel_for_any_reason", _) => "Cancel for any reason".to_string(),
        (other, _) => other.replace('_', " "),
    };

    let mut row = AncillaryRow::new(
        title,
        service
            .get("total_amount")
            .map(coerce_amount)
            .unwrap_or(Decimal::ZERO),
    );

    if let Some(currency) = str_at(service, &["total_currency"]) {
        row = row.with_currency(Currency::new(currency));
    }
    if let Some(id) = str_at(service, &["id"]) {
        row = row.with_service_id(id);
    }
    if let Some(pas) = array_at(service, &["passenger_ids"]).first().and_then(Value::as_str) {
        row = row.with_passenger(pas);
    }
    if let Some(seg) = array_at(service, &["segment_ids"]).first().and_then(Value::as_str) {
        row = row.with_segment(seg);
    }
    if let Some(kg) = value_at(service, &["metadata", "maximum_weight_kg"]).and_then(Value::as_f64) {
        row = row.with_details(format!("Up to {}kg", kg));
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_offer() -> Value {
        json!({
            "id": "off_0000AEdGRhtp5AUUdJqMxo",
            "total_amount": "455.32",
            "total_currency": "GBP",
            "base_amount": "380.00",
            "expires_at": "2026-11-01T10:42:14.545Z",
            "owner": {"iata_code": "BA"},
            "passengers": [
                {"id": "pas_001", "type": "adult"},
                {"id": "pas_002", "type": "adult"}
            ],
            "slices": [
                {
                    "segments": [
                        {
                            "id": "seg_001",
                            "origin": {"iata_code": "LHR"},
                            "destination": {"iata_code": "JFK"},
                            "departing_at": "2026-11-02T09:40:00",
                            "arriving_at": "2026-11-02T12:45:00",
                            "marketing_carrier": {"iata_code": "BA"},
                            "marketing_carrier_flight_number": "117",
                            "duration": "PT8H05M"
                        }
                    ]
                }
            ],
            "available_services": [
                {
                    "id": "ase_001",
                    "type": "baggage",
                    "total_amount": "35.00",
                    "total_currency": "GBP",
                    "passenger_ids": ["pas_001"],
                    "segment_ids": ["seg_001"],
                    "metadata": {"type": "checked", "maximum_weight_kg": 23}
                }
            ]
        })
    }

    #[test]
    fn test_normalize_offer() {
        let offer = normalize_offer(&sample_offer()).unwrap();

        assert_eq!(offer.id, "off_0000AEdGRhtp5AUUdJqMxo");
        assert_eq!(offer.provider, "duffel");
        assert_eq!(offer.kind, OfferKind::Flight);
        assert_eq!(offer.base_amount, dec!(455.32));
        assert_eq!(offer.currency.as_str(), "GBP");
        assert_eq!(offer.passengers, 2);
        assert_eq!(offer.segments.len(), 1);
        assert_eq!(offer.segments[0].origin, "LHR");
        assert_eq!(offer.segments[0].carrier.as_deref(), Some("BA"));
        assert_eq!(offer.segments[0].flight_number.as_deref(), Some("117"));
        assert!(offer.expires_at.is_some());
    }

    #[test]
    fn test_available_services_become_ancillaries() {
        let offer = normalize_offer(&sample_offer()).unwrap();
        let bag = &offer.ancillaries[0];

        assert_eq!(bag.title, "Checked bag");
        assert_eq!(bag.amount, dec!(35.00));
        assert_eq!(bag.passenger_ref.as_deref(), Some("pas_001"));
        assert_eq!(bag.segment_ref.as_deref(), Some("seg_001"));
        assert_eq!(bag.service_id.as_deref(), Some("ase_001"));
        assert_eq!(bag.details.as_deref(), Some("Up to 23kg"));
    }

    #[test]
    fn test_missing_price_degrades_to_zero() {
        let mut raw = sample_offer();
        raw["total_amount"] = json!("n/a");
        let offer = normalize_offer(&raw).unwrap();
        assert_eq!(offer.base_amount, Decimal::ZERO);
    }

    #[test]
    fn test_offer_without_id_skipped() {
        let response = json!({
            "data": {
                "id": "orq_001",
                "offers": [sample_offer(), {"total_amount": "10.00"}]
            }
        });
        assert_eq!(normalize_offer_request(&response).len(), 1);
    }

    #[test]
    fn test_empty_response() {
        assert!(normalize_offer_request(&json!({"data": {}})).is_empty());
    }
}
