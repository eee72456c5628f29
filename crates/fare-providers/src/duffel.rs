//! # Duffel Flights
//!
//! Flight offers from the Duffel API. One offer request returns every
//! offer for the search; offers carry their own `available_services`.

use crate::adapters::duffel::{normalize_offer_request, PROVIDER};
use crate::config::DuffelConfig;
use crate::http::{build_client, network_error, read_json};
use async_trait::async_trait;
use fare_core::{BookingResult, FlightSearchRequest, NormalizedOffer, OfferKind, OfferProvider};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Duffel offer provider
pub struct DuffelProvider {
    config: DuffelConfig,
    client: Client,
}

impl DuffelProvider {
    pub fn new(config: DuffelConfig) -> BookingResult<Self> {
        Ok(Self {
            config,
            client: build_client()?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> BookingResult<Self> {
        Self::new(DuffelConfig::from_env()?)
    }

    /// Body for `POST /air/offer_requests`
    fn offer_request_body(request: &FlightSearchRequest) -> Value {
        let mut slices = vec![json!({
            "origin": request.origin.to_uppercase(),
            "destination": request.destination.to_uppercase(),
            "departure_date": request.departure_date.to_string(),
        })];

        if let Some(return_date) = request.return_date {
            slices.push(json!({
                "origin": request.destination.to_uppercase(),
                "destination": request.origin.to_uppercase(),
                "departure_date": return_date.to_string(),
            }));
        }

        let passengers: Vec<Value> = (0..request.passengers.max(1))
            .map(|_| json!({"type": "adult"}))
            .collect();

        json!({
            "data": {
                "slices": slices,
                "passengers": passengers,
                "cabin_class": request.cabin_class.as_str(),
            }
        })
    }
}

#[async_trait]
impl OfferProvider for DuffelProvider {
    #[instrument(skip(self, request), fields(origin = %request.origin, destination = %request.destination))]
    async fn search_flights(
        &self,
        request: &FlightSearchRequest,
    ) -> BookingResult<Vec<NormalizedOffer>> {
        request.validate()?;

        let url = format!(
            "{}/air/offer_requests?return_offers=true",
            self.config.api_base_url
        );
        debug!("Creating Duffel offer request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Duffel-Version", &self.config.api_version)
            .header("Accept", "application/json")
            .json(&Self::offer_request_body(request))
            .send()
            .await
            .map_err(network_error)?;

        let body = read_json(PROVIDER, response).await?;
        let offers = normalize_offer_request(&body);

        info!("Duffel returned {} offers", offers.len());
        Ok(offers)
    }

    fn supports(&self, kind: OfferKind) -> bool {
        kind == OfferKind::Flight
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
