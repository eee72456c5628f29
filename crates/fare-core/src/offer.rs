//! # Offer Types
//!
//! The normalized shape every provider adapter produces, plus the search
//! requests sent to providers.

use crate::ancillary::AncillaryRow;
use crate::error::{BookingError, BookingResult};
use crate::money::Currency;
use crate::pricing::{PricingConfig, PricingInput};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What an offer books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Flight,
    Hotel,
}

impl std::fmt::Display for OfferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferKind::Flight => f.write_str("flight"),
            OfferKind::Hotel => f.write_str("hotel"),
        }
    }
}

/// Cabin class for flight searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::PremiumEconomy => "premium_economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl Default for CabinClass {
    fn default() -> Self {
        CabinClass::Economy
    }
}

/// A single flown leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Provider segment ID (used as ancillary segment reference)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Origin IATA code
    pub origin: String,

    /// Destination IATA code
    pub destination: String,

    /// Local departure time as given by the provider
    pub departing_at: String,

    /// Local arrival time as given by the provider
    pub arriving_at: String,

    /// Marketing carrier IATA code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,

    /// Flight number without carrier prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,

    /// ISO 8601 duration (e.g., "PT2H35M")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Hotel stay details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelStay {
    /// Provider hotel ID
    pub hotel_id: String,

    /// Hotel name
    pub name: String,

    /// IATA city code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,

    pub check_in: String,
    pub check_out: String,

    /// Room description from the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_description: Option<String>,

    /// Cancellation policy summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<String>,
}

/// A priced, bookable option in one internal shape regardless of provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOffer {
    /// Provider offer ID
    pub id: String,

    /// Provider name (e.g., "duffel", "amadeus")
    pub provider: String,

    pub kind: OfferKind,

    /// Upstream price for all passengers, before platform fees
    pub base_amount: Decimal,

    pub currency: Currency,

    /// Passengers (or guests) the price covers
    pub passengers: u32,

    /// Flight segments, outbound first (empty for hotels)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,

    /// Stay details (hotels only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stay: Option<HotelStay>,

    /// Ancillaries the traveller may add
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancillaries: Vec<AncillaryRow>,

    /// When the provider stops honouring the price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NormalizedOffer {
    /// Pricing input for this offer with no ancillaries selected.
    /// A blank provider currency falls back to the configured default.
    pub fn pricing_input(&self, config: &PricingConfig) -> PricingInput {
        PricingInput::new(
            self.base_amount,
            self.passengers,
            Currency::resolve(Some(self.currency.as_str()), &config.default_currency),
            config,
        )
    }
}

fn default_count() -> u32 {
    1
}

/// Flight search criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSearchRequest {
    /// Origin IATA code
    pub origin: String,

    /// Destination IATA code
    pub destination: String,

    pub departure_date: NaiveDate,

    /// Present for round trips
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,

    /// Adult passengers
    #[serde(default = "default_count")]
    pub passengers: u32,

    #[serde(default)]
    pub cabin_class: CabinClass,

    /// Preferred currency for returned prices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl FlightSearchRequest {
    pub fn one_way(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
        passengers: u32,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date,
            return_date: None,
            passengers,
            cabin_class: CabinClass::Economy,
            currency: None,
        }
    }

    /// Builder: make this a round trip
    pub fn returning(mut self, date: NaiveDate) -> Self {
        self.return_date = Some(date);
        self
    }

    /// Reject malformed searches before calling any provider
    pub fn validate(&self) -> BookingResult<()> {
        validate_iata(&self.origin, "origin")?;
        validate_iata(&self.destination, "destination")?;

        if self.origin.eq_ignore_ascii_case(&self.destination) {
            return Err(BookingError::InvalidRequest(
                "origin and destination must differ".to_string(),
            ));
        }
        if self.passengers == 0 || self.passengers > 9 {
            return Err(BookingError::InvalidRequest(
                "passengers must be between 1 and 9".to_string(),
            ));
        }
        if let Some(ret) = self.return_date {
            if ret < self.departure_date {
                return Err(BookingError::InvalidRequest(
                    "return_date is before departure_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Hotel search criteria
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelSearchRequest {
    /// IATA city code (e.g., "PAR")
    pub city_code: String,

    pub check_in: NaiveDate,

    pub check_out: NaiveDate,

    /// Adult guests
    #[serde(default = "default_count")]
    pub guests: u32,

    #[serde(default = "default_count")]
    pub rooms: u32,

    /// Preferred currency for returned prices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl HotelSearchRequest {
    pub fn new(
        city_code: impl Into<String>,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
    ) -> Self {
        Self {
            city_code: city_code.into(),
            check_in,
            check_out,
            guests,
            rooms: 1,
            currency: None,
        }
    }

    /// Number of nights
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn validate(&self) -> BookingResult<()> {
        validate_iata(&self.city_code, "city_code")?;

        if self.nights() < 1 {
            return Err(BookingError::InvalidRequest(
                "check_out must be after check_in".to_string(),
            ));
        }
        if self.guests == 0 || self.rooms == 0 {
            return Err(BookingError::InvalidRequest(
                "guests and rooms must be at least 1".to_string(),
            ));
        }
        if self.rooms > self.guests {
            return Err(BookingError::InvalidRequest(
                "more rooms than guests".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_iata(code: &str, field: &str) -> BookingResult<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(BookingError::InvalidRequest(format!(
            "{} must be a 3-letter IATA code, got {:?}",
            field, code
        )))
    }
}

/// Sort offers cheapest first (stable, so provider order breaks ties)
pub fn sort_by_price(offers: &mut [NormalizedOffer]) {
    offers.sort_by(|a, b| a.base_amount.cmp(&b.base_amount));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::compute_pricing;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn offer(id: &str, amount: Decimal) -> NormalizedOffer {
        NormalizedOffer {
            id: id.to_string(),
            provider: "duffel".to_string(),
            kind: OfferKind::Flight,
            base_amount: amount,
            currency: Currency::new("EUR"),
            passengers: 2,
            segments: vec![],
            stay: None,
            ancillaries: vec![],
            expires_at: None,
        }
    }

    #[test]
    fn test_offer_pricing_input() {
        let o = offer("off_1", dec!(200));
        let b = compute_pricing(&o.pricing_input(&PricingConfig::default()));
        assert_eq!(b.total(), dec!(206));
    }

    #[test]
    fn test_sort_by_price() {
        let mut offers = vec![
            offer("b", dec!(300)),
            offer("a", dec!(120.50)),
            offer("c", dec!(120.50)),
        ];
        sort_by_price(&mut offers);
        let ids: Vec<_> = offers.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_flight_search_validation() {
        let ok = FlightSearchRequest::one_way("LHR", "JFK", date("2026-11-02"), 2);
        assert!(ok.validate().is_ok());

        let bad_code = FlightSearchRequest::one_way("London", "JFK", date("2026-11-02"), 1);
        assert!(bad_code.validate().is_err());

        let same = FlightSearchRequest::one_way("LHR", "lhr", date("2026-11-02"), 1);
        assert!(same.validate().is_err());

        let back_in_time = FlightSearchRequest::one_way("LHR", "JFK", date("2026-11-02"), 1)
            .returning(date("2026-11-01"));
        assert!(back_in_time.validate().is_err());

        let nobody = FlightSearchRequest::one_way("LHR", "JFK", date("2026-11-02"), 0);
        assert!(nobody.validate().is_err());
    }

    #[test]
    fn test_hotel_search_validation() {
        let ok = HotelSearchRequest::new("PAR", date("2026-11-02"), date("2026-11-05"), 2);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.nights(), 3);

        let zero_nights = HotelSearchRequest::new("PAR", date("2026-11-02"), date("2026-11-02"), 2);
        assert!(zero_nights.validate().is_err());
    }

    #[test]
    fn test_flight_search_deserialize_defaults() {
        let req: FlightSearchRequest = serde_json::from_str(
            r#"{"origin":"MAD","destination":"CDG","departure_date":"2026-12-01"}"#,
        )
        .unwrap();
        assert_eq!(req.passengers, 1);
        assert_eq!(req.cabin_class, CabinClass::Economy);
        assert!(req.return_date.is_none());
    }
}
