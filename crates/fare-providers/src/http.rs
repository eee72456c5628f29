//! Shared HTTP plumbing for provider clients.

use fare_core::{BookingError, BookingResult};
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::error;

pub(crate) fn build_client() -> BookingResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BookingError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn network_error(err: reqwest::Error) -> BookingError {
    BookingError::NetworkError(err.to_string())
}

/// Read a provider response as JSON, mapping non-2xx statuses to typed errors
pub(crate) async fn read_json(provider: &str, response: Response) -> BookingResult<Value> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response.text().await.map_err(network_error)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| {
            BookingError::Serialization(format!("Failed to parse {} response: {}", provider, e))
        });
    }

    error!("{} API error: status={}, body={}", provider, status, body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BookingError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs: retry_after.unwrap_or(1),
        });
    }

    let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    if status == StatusCode::UNAUTHORIZED {
        return Err(BookingError::AuthenticationFailed {
            provider: provider.to_string(),
            message,
        });
    }

    Err(BookingError::provider(provider, message))
}

/// Pull a human-readable message out of the error shapes our providers use
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    // Stripe: {"error": {"message": ...}}
    if let Some(msg) = value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(msg.to_string());
    }

    // OAuth: {"error": "invalid_client", "error_description": ...}
    if let Some(msg) = value.get("error_description").and_then(Value::as_str) {
        return Some(msg.to_string());
    }

    // Duffel {"errors": [{"message"}]}, Amadeus {"errors": [{"title", "detail"}]}
    let first = value.get("errors")?.as_array()?.first()?;
    first
        .get("message")
        .or_else(|| first.get("detail"))
        .or_else(|| first.get("title"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Amount must be at least 50 cents"}}"#).as_deref(),
            Some("Amount must be at least 50 cents")
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_client","error_description":"Client credentials are invalid"}"#)
                .as_deref(),
            Some("Client credentials are invalid")
        );
        assert_eq!(
            error_message(r#"{"errors":[{"message":"The offer has expired","code":"offer_no_longer_available"}]}"#)
                .as_deref(),
            Some("The offer has expired")
        );
        assert_eq!(
            error_message(r#"{"errors":[{"status":400,"code":477,"title":"INVALID FORMAT","detail":"departureDate is in the past"}]}"#)
                .as_deref(),
            Some("departureDate is in the past")
        );
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
    }
}
