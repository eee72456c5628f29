//! # Request Handlers
//!
//! Axum request handlers for search, quoting, payment and confirmation.
//! Every amount shown or charged here comes from [`QuoteRequest::price`]
//! against the shared fee schedule.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use fare_core::{
    confirm_payment, new_booking_ref, sort_by_price, BookingConfirmation, BookingError,
    BoxedOfferProvider, BoxedPaymentStrategy, BreakdownDisplay, BookingResult,
    FlightSearchRequest, HotelSearchRequest, NormalizedOffer, OfferKind, PaymentIntentRequest,
    PricingConfig, QuoteRequest,
};
use fare_providers::{dispatch_webhook_event, LoggingWebhookHandler};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// An offer with the breakdown a traveller would pay for it
#[derive(Debug, Serialize)]
pub struct PricedOffer {
    #[serde(flatten)]
    pub offer: NormalizedOffer,
    pub pricing: BreakdownDisplay,
}

impl PricedOffer {
    fn new(offer: NormalizedOffer, config: &PricingConfig) -> Self {
        let pricing = fare_core::compute_pricing(&offer.pricing_input(config)).display();
        Self { offer, pricing }
    }
}

/// A provider that failed during an aggregated search
#[derive(Debug, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub offers: Vec<PricedOffer>,
    pub count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_providers: Vec<ProviderFailure>,
}

/// Quote response
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
    pub pricing: BreakdownDisplay,
}

/// Create payment intent request: a quote plus checkout details.
///
/// The base fare is taken from the caller as sent; `offer_id` is recorded
/// on the intent but not re-fetched from the provider. Fees always come
/// from the server's fee schedule.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    #[serde(flatten)]
    pub quote: QuoteRequest,
    /// Customer email (optional, for receipts)
    #[serde(default, alias = "customerEmail")]
    pub customer_email: Option<String>,
    /// Payment provider (optional, defaults to "stripe")
    #[serde(default)]
    pub provider: Option<String>,
    /// Reuse a booking reference (retries); a new one is generated otherwise
    #[serde(default, alias = "bookingRef")]
    pub booking_ref: Option<String>,
}

/// Create payment intent response
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub booking_ref: String,
    pub payment_intent_id: String,
    pub provider: String,
    /// Secret the browser confirms the payment with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Public key the browser initializes the payment SDK with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,
    pub amount_minor: i64,
    pub pricing: BreakdownDisplay,
}

/// Confirm booking request: the intent plus the same quote that created it
#[derive(Debug, Deserialize)]
pub struct ConfirmBookingRequest {
    #[serde(alias = "paymentIntentId")]
    pub payment_intent_id: String,
    #[serde(flatten)]
    pub quote: QuoteRequest,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn booking_error_to_response(err: BookingError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.to_string(), code);
    if let BookingError::RateLimited {
        retry_after_secs, ..
    } = err
    {
        response = response.with_details(format!("retry after {} seconds", retry_after_secs));
    }
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn unavailable(message: impl Into<String>) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new(message, 503)),
    )
}

fn payment_strategy<'a>(
    state: &'a AppState,
    provider: Option<&str>,
) -> Result<&'a BoxedPaymentStrategy, ApiError> {
    if state.payments.providers().is_empty() {
        return Err(unavailable("No payment provider configured"));
    }
    state.payments.get_or_default(provider).ok_or_else(|| {
        booking_error_to_response(BookingError::InvalidRequest(format!(
            "Unknown payment provider: {:?}",
            provider
        )))
    })
}

// =============================================================================
// Search aggregation
// =============================================================================

/// Run `search` against every provider concurrently. Failed providers are
/// logged and reported, not fatal, unless all of them fail.
async fn aggregate<F, Fut>(
    providers: Vec<BoxedOfferProvider>,
    search: F,
) -> BookingResult<(Vec<NormalizedOffer>, Vec<ProviderFailure>)>
where
    F: Fn(BoxedOfferProvider) -> Fut,
    Fut: Future<Output = BookingResult<Vec<NormalizedOffer>>> + Send + 'static,
{
    let total = providers.len();
    let mut set = JoinSet::new();
    for provider in providers {
        let name = provider.provider_name();
        let fut = search(provider);
        set.spawn(async move { (name, fut.await) });
    }

    let mut offers = Vec::new();
    let mut failures = Vec::new();
    let mut last_error = None;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((name, Ok(found))) => {
                info!("{} returned {} offers", name, found.len());
                offers.extend(found);
            }
            Ok((name, Err(e))) => {
                warn!("{} search failed: {}", name, e);
                failures.push(ProviderFailure {
                    provider: name.to_string(),
                    error: e.to_string(),
                });
                last_error = Some(e);
            }
            Err(e) => {
                error!("Provider search task failed: {}", e);
                failures.push(ProviderFailure {
                    provider: "unknown".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    if failures.len() == total {
        return Err(last_error
            .unwrap_or_else(|| BookingError::Internal("every provider search failed".to_string())));
    }

    sort_by_price(&mut offers);
    Ok((offers, failures))
}

fn search_response(
    offers: Vec<NormalizedOffer>,
    failed_providers: Vec<ProviderFailure>,
    config: &PricingConfig,
) -> SearchResponse {
    let offers: Vec<PricedOffer> = offers
        .into_iter()
        .map(|offer| PricedOffer::new(offer, config))
        .collect();
    SearchResponse {
        count: offers.len(),
        offers,
        failed_providers,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tripfare",
        "version": env!("CARGO_PKG_VERSION"),
        "offer_providers": state.offers.providers(),
        "payment_providers": state.payments.providers(),
    }))
}

/// Search flights across every flight provider
#[instrument(skip(state, request), fields(origin = %request.origin, destination = %request.destination))]
pub async fn search_flights(
    State(state): State<AppState>,
    Json(request): Json<FlightSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    request.validate().map_err(booking_error_to_response)?;

    let providers = state.offers.supporting(OfferKind::Flight);
    if providers.is_empty() {
        return Err(unavailable("No flight provider configured"));
    }

    let request = Arc::new(request);
    let (offers, failures) = aggregate(providers, |provider| {
        let request = Arc::clone(&request);
        async move { provider.search_flights(&request).await }
    })
    .await
    .map_err(booking_error_to_response)?;

    Ok(Json(search_response(offers, failures, &state.pricing)))
}

/// Search hotels across every hotel provider
#[instrument(skip(state, request), fields(city = %request.city_code))]
pub async fn search_hotels(
    State(state): State<AppState>,
    Json(request): Json<HotelSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    request.validate().map_err(booking_error_to_response)?;

    let providers = state.offers.supporting(OfferKind::Hotel);
    if providers.is_empty() {
        return Err(unavailable("No hotel provider configured"));
    }

    let request = Arc::new(request);
    let (offers, failures) = aggregate(providers, |provider| {
        let request = Arc::clone(&request);
        async move { provider.search_hotels(&request).await }
    })
    .await
    .map_err(booking_error_to_response)?;

    Ok(Json(search_response(offers, failures, &state.pricing)))
}

/// Price a quote. Never fails on malformed numbers; they count as zero.
#[instrument(skip(state, quote))]
pub async fn quote(
    State(state): State<AppState>,
    Json(quote): Json<QuoteRequest>,
) -> Json<QuoteResponse> {
    let breakdown = quote.price(&state.pricing);

    if breakdown.has_zero_base() {
        warn!(
            "Quote for offer {:?} has a zero base amount; only fees are charged",
            quote.offer_id
        );
    }

    Json(QuoteResponse {
        offer_id: quote.offer_id,
        pricing: breakdown.display(),
    })
}

/// Create a payment intent for exactly the quoted total
#[instrument(skip(state, request), fields(offer_id = ?request.quote.offer_id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let strategy = payment_strategy(&state, request.provider.as_deref())?;

    let breakdown = request.quote.price(&state.pricing);
    if breakdown.has_zero_base() {
        warn!("Payment intent requested with a zero base amount");
    }

    let booking_ref = request.booking_ref.clone().unwrap_or_else(new_booking_ref);
    let mut intent_request = PaymentIntentRequest::from_breakdown(&breakdown, &booking_ref)
        .map_err(booking_error_to_response)?;
    if let Some(ref email) = request.customer_email {
        intent_request = intent_request.with_email(email);
    }
    if let Some(ref offer_id) = request.quote.offer_id {
        intent_request = intent_request
            .with_description(format!("Booking {} ({})", booking_ref, offer_id))
            .with_metadata("offer_id", offer_id);
    }

    info!(
        "Creating payment intent: booking_ref={}, total={} {}",
        booking_ref,
        breakdown.total_string(),
        breakdown.currency()
    );

    let intent = strategy
        .create_payment_intent(&intent_request)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            booking_error_to_response(e)
        })?;

    Ok(Json(PaymentIntentResponse {
        booking_ref,
        payment_intent_id: intent.id,
        provider: intent.provider,
        client_secret: intent.client_secret,
        publishable_key: strategy.client_key().map(String::from),
        amount_minor: intent.amount_minor,
        pricing: breakdown.display(),
    }))
}

/// Confirm a booking once its payment intent is paid and matches the quote
#[instrument(skip(state, request), fields(payment_intent_id = %request.payment_intent_id))]
pub async fn confirm_booking(
    State(state): State<AppState>,
    Json(request): Json<ConfirmBookingRequest>,
) -> Result<Json<BookingConfirmation>, ApiError> {
    let strategy = payment_strategy(&state, request.provider.as_deref())?;

    let intent = strategy
        .retrieve_payment_intent(&request.payment_intent_id)
        .await
        .map_err(booking_error_to_response)?;

    let breakdown = request.quote.price(&state.pricing);
    let confirmation = confirm_payment(&breakdown, &intent).map_err(|e| {
        warn!("Booking confirmation rejected: {}", e);
        booking_error_to_response(e)
    })?;

    info!(
        "Booking confirmed: booking_ref={}, total={} {}",
        confirmation.booking_ref,
        confirmation.pricing.total,
        confirmation.pricing.currency
    );

    Ok(Json(confirmation))
}

/// Handle Stripe webhook
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing Stripe-Signature header", 400)),
            )
        })?;

    let strategy = state
        .payments
        .get("stripe")
        .ok_or_else(|| unavailable("Stripe not configured"))?;

    let event = strategy
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            booking_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    dispatch_webhook_event(&LoggingWebhookHandler, event).map_err(|e| {
        error!("Webhook handler error: {}", e);
        booking_error_to_response(e)
    })?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_booking_error_conversion() {
        let (status, _json) =
            booking_error_to_response(BookingError::InvalidRequest("Bad data".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _json) = booking_error_to_response(BookingError::AmountMismatch {
            expected: "206.00".to_string(),
            actual: "200.00".to_string(),
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, Json(body)) = booking_error_to_response(BookingError::RateLimited {
            provider: "amadeus".to_string(),
            retry_after_secs: 3,
        });
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.details.as_deref(), Some("retry after 3 seconds"));
    }

    #[test]
    fn test_payment_request_flattens_quote() {
        let request: CreatePaymentIntentRequest = serde_json::from_value(serde_json::json!({
            "offerId": "off_1",
            "baseAmount": "200",
            "passengers": 2,
            "currency": "EUR",
            "customerEmail": "traveller@example.com"
        }))
        .unwrap();

        assert_eq!(request.quote.offer_id.as_deref(), Some("off_1"));
        assert_eq!(request.quote.passengers, 2);
        assert_eq!(
            request.quote.price(&PricingConfig::default()).total_string(),
            "206.00"
        );
        assert_eq!(request.customer_email.as_deref(), Some("traveller@example.com"));
    }
}
