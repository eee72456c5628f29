//! # Amadeus Flights and Hotels
//!
//! Amadeus self-service APIs authenticate with an OAuth2 client-credentials
//! token that lives about 30 minutes. The token is cached in a
//! [`TokenCache`] and refetched once if a request comes back 401.

use crate::adapters::amadeus::{hotel_ids, normalize_flight_offers, normalize_hotel_offers, PROVIDER};
use crate::config::AmadeusConfig;
use crate::http::{build_client, network_error, read_json};
use async_trait::async_trait;
use fare_core::{
    BookingError, BookingResult, CachedToken, FlightSearchRequest, HotelSearchRequest,
    NormalizedOffer, OfferKind, OfferProvider, TokenCache,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Hotels priced per search (hotel-offers takes a list of IDs)
const MAX_HOTELS: usize = 20;

/// Flight offers requested per search
const MAX_FLIGHT_OFFERS: u32 = 50;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    1799
}

/// Amadeus offer provider
pub struct AmadeusProvider {
    config: AmadeusConfig,
    client: Client,
    token: TokenCache,
}

impl AmadeusProvider {
    pub fn new(config: AmadeusConfig) -> BookingResult<Self> {
        Ok(Self {
            config,
            client: build_client()?,
            token: TokenCache::new(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> BookingResult<Self> {
        Self::new(AmadeusConfig::from_env()?)
    }

    async fn fetch_token(&self) -> BookingResult<CachedToken> {
        debug!("Fetching Amadeus access token");

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.config.api_base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let body = read_json(PROVIDER, response).await?;
        let token: TokenResponse = serde_json::from_value(body).map_err(|e| {
            BookingError::AuthenticationFailed {
                provider: PROVIDER.to_string(),
                message: format!("Malformed token response: {}", e),
            }
        })?;

        Ok(CachedToken::expiring_in_secs(
            token.access_token,
            token.expires_in,
        ))
    }

    async fn send_get(&self, path: &str, query: &[(&str, String)]) -> BookingResult<Value> {
        let token = self.token.get_or_refresh(|| self.fetch_token()).await?;

        let response = self
            .client
            .get(format!("{}{}", self.config.api_base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;

        read_json(PROVIDER, response).await
    }

    /// GET with the cached token, retrying once with a fresh token on 401
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> BookingResult<Value> {
        match self.send_get(path, query).await {
            Err(BookingError::AuthenticationFailed { message, .. }) => {
                warn!("Amadeus rejected cached token ({}), refreshing", message);
                self.token.invalidate();
                self.send_get(path, query).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl OfferProvider for AmadeusProvider {
    #[instrument(skip(self, request), fields(origin = %request.origin, destination = %request.destination))]
    async fn search_flights(
        &self,
        request: &FlightSearchRequest,
    ) -> BookingResult<Vec<NormalizedOffer>> {
        request.validate()?;

        let mut query = vec![
            ("originLocationCode", request.origin.to_uppercase()),
            ("destinationLocationCode", request.destination.to_uppercase()),
            ("departureDate", request.departure_date.to_string()),
            ("adults", request.passengers.to_string()),
            ("travelClass", request.cabin_class.as_str().to_uppercase()),
            ("max", MAX_FLIGHT_OFFERS.to_string()),
        ];
        if let Some(return_date) = request.return_date {
            query.push(("returnDate", return_date.to_string()));
        }
        if let Some(ref currency) = request.currency {
            query.push(("currencyCode", currency.to_uppercase()));
        }

        let body = self.get_json("/v2/shopping/flight-offers", &query).await?;
        let offers = normalize_flight_offers(&body, request.passengers);

        info!("Amadeus returned {} flight offers", offers.len());
        Ok(offers)
    }

    #[instrument(skip(self, request), fields(city = %request.city_code))]
    async fn search_hotels(
        &self,
        request: &HotelSearchRequest,
    ) -> BookingResult<Vec<NormalizedOffer>> {
        request.validate()?;

        let hotels = self
            .get_json(
                "/v1/reference-data/locations/hotels/by-city",
                &[("cityCode", request.city_code.to_uppercase())],
            )
            .await?;

        let ids = hotel_ids(&hotels, MAX_HOTELS);
        if ids.is_empty() {
            info!("Amadeus has no hotels in {}", request.city_code);
            return Ok(Vec::new());
        }

        let mut query = vec![
            ("hotelIds", ids.join(",")),
            ("adults", request.guests.to_string()),
            ("checkInDate", request.check_in.to_string()),
            ("checkOutDate", request.check_out.to_string()),
            ("roomQuantity", request.rooms.to_string()),
        ];
        if let Some(ref currency) = request.currency {
            query.push(("currency", currency.to_uppercase()));
        }

        let body = self.get_json("/v3/shopping/hotel-offers", &query).await?;
        let offers = normalize_hotel_offers(&body);

        info!(
            "Amadeus returned {} hotel offers across {} hotels",
            offers.len(),
            ids.len()
        );
        Ok(offers)
    }

    fn supports(&self, kind: OfferKind) -> bool {
        matches!(kind, OfferKind::Flight | OfferKind::Hotel)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
