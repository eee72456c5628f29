//! Amadeus self-service shapes (flight-offers v2, hotel list v1, hotel-offers v3).

use super::{array_at, str_at, value_at};
use fare_core::money::{coerce_amount, coerce_passengers};
use fare_core::{Currency, HotelStay, NormalizedOffer, OfferKind, Segment};
use rust_decimal::Decimal;
use serde_json::Value;

pub const PROVIDER: &str = "amadeus";

/// Amadeus IDs are sometimes numbers ("1" vs 1)
fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First usable price of `price.grandTotal`, `price.total`, `price.base`.
/// Blank or malformed fields fall through to the next one.
fn price_of(value: &Value) -> Decimal {
    ["grandTotal", "total", "base"]
        .iter()
        .filter_map(|key| value_at(value, &["price", key]))
        .map(coerce_amount)
        .find(|amount| !amount.is_zero())
        .unwrap_or(Decimal::ZERO)
}

/// All offers in a `/v2/shopping/flight-offers` response
pub fn normalize_flight_offers(response: &Value, fallback_passengers: u32) -> Vec<NormalizedOffer> {
    array_at(response, &["data"])
        .iter()
        .filter_map(|offer| normalize_flight_offer(offer, fallback_passengers))
        .collect()
}

pub fn normalize_flight_offer(offer: &Value, fallback_passengers: u32) -> Option<NormalizedOffer> {
    let id = id_of(offer)?;

    let travelers = array_at(offer, &["travelerPricings"]).len() as u32;
    let passengers = if travelers > 0 {
        travelers
    } else {
        fallback_passengers.max(1)
    };

    let segments = array_at(offer, &["itineraries"])
        .iter()
        .flat_map(|itinerary| array_at(itinerary, &["segments"]))
        .map(|segment| Segment {
            id: id_of(segment),
            origin: str_at(segment, &["departure", "iataCode"]).unwrap_or_default(),
            destination: str_at(segment, &["arrival", "iataCode"]).unwrap_or_default(),
            departing_at: str_at(segment, &["departure", "at"]).unwrap_or_default(),
            arriving_at: str_at(segment, &["arrival", "at"]).unwrap_or_default(),
            carrier: str_at(segment, &["carrierCode"]),
            flight_number: str_at(segment, &["number"]),
            duration: str_at(segment, &["duration"]),
        })
        .collect();

    Some(NormalizedOffer {
        id,
        provider: PROVIDER.to_string(),
        kind: OfferKind::Flight,
        base_amount: price_of(offer),
        currency: Currency::new(str_at(offer, &["price", "currency"]).unwrap_or_default()),
        passengers,
        segments,
        stay: None,
        ancillaries: Vec::new(),
        expires_at: None,
    })
}

/// Hotel IDs from a `/v1/reference-data/locations/hotels/by-city` response
pub fn hotel_ids(response: &Value, limit: usize) -> Vec<String> {
    array_at(response, &["data"])
        .iter()
        .filter_map(|hotel| str_at(hotel, &["hotelId"]))
        .take(limit)
        .collect()
}

/// One offer per room rate in a `/v3/shopping/hotel-offers` response.
/// Hotels flagged `available: false` are skipped.
pub fn normalize_hotel_offers(response: &Value) -> Vec<NormalizedOffer> {
    let mut offers = Vec::new();

    for entry in array_at(response, &["data"]) {
        if entry.get("available").and_then(Value::as_bool) == Some(false) {
            continue;
        }

        let Some(hotel_id) = str_at(entry, &["hotel", "hotelId"]) else {
            continue;
        };
        let name = str_at(entry, &["hotel", "name"]).unwrap_or_else(|| hotel_id.clone());
        let city_code = str_at(entry, &["hotel", "cityCode"]);

        for offer in array_at(entry, &["offers"]) {
            let Some(id) = id_of(offer) else {
                continue;
            };

            let passengers = value_at(offer, &["guests", "adults"])
                .map(coerce_passengers)
                .unwrap_or(1);

            let stay = HotelStay {
                hotel_id: hotel_id.clone(),
                name: name.clone(),
                city_code: city_code.clone(),
                check_in: str_at(offer, &["checkInDate"]).unwrap_or_default(),
                check_out: str_at(offer, &["checkOutDate"]).unwrap_or_default(),
                room_description: str_at(offer, &["room", "description", "text"]),
                cancellation: cancellation_summary(offer),
            };

            offers.push(NormalizedOffer {
                id,
                provider: PROVIDER.to_string(),
                kind: OfferKind::Hotel,
                base_amount: price_of(offer),
                currency: Currency::new(str_at(offer, &["price", "currency"]).unwrap_or_default()),
                passengers,
                segments: Vec::new(),
                stay: Some(stay),
                ancillaries: Vec::new(),
                expires_at: None,
            });
        }
    }

    offers
}

fn cancellation_summary(offer: &Value) -> Option<String> {
    if let Some(deadline) = array_at(offer, &["policies", "cancellations"])
        .first()
        .and_then(|c| str_at(c, &["deadline"]))
    {
        return Some(format!("Free cancellation until {}", deadline));
    }

    match str_at(offer, &["policies", "refundable", "cancellationRefund"]).as_deref() {
        Some("NON_REFUNDABLE") => Some("Non-refundable".to_string()),
        Some("REFUNDABLE_UP_TO_DEADLINE") => Some("Refundable up to deadline".to_string()),
        _ => None,
    }
}
