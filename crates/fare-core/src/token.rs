//! # Bearer Token Cache
//!
//! Holds one OAuth access token with its expiry and refetches it when it
//! expires. Two tasks refreshing at the same time both fetch a token and the
//! last one stored wins; the provider accepts either.

use crate::error::BookingResult;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::RwLock;

/// Tokens are treated as expired this long before their real expiry
const DEFAULT_SKEW_SECS: i64 = 30;

/// A bearer token and the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token valid for `expires_in` starting at `now`
    pub fn new(value: impl Into<String>, expires_in: Duration, now: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at: now + expires_in,
        }
    }

    /// Token expiring `expires_in_secs` seconds from now (OAuth `expires_in`)
    pub fn expiring_in_secs(value: impl Into<String>, expires_in_secs: i64) -> Self {
        Self::new(value, Duration::seconds(expires_in_secs), Utc::now())
    }
}

/// Single-slot token cache
#[derive(Debug)]
pub struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
    skew: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_skew(Duration::seconds(DEFAULT_SKEW_SECS))
    }

    /// Cache that refreshes `skew` before the token's expiry
    pub fn with_skew(skew: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            skew,
        }
    }

    /// The cached token if still valid now
    pub fn get(&self) -> Option<String> {
        self.get_at(Utc::now())
    }

    /// The cached token if still valid at `now`
    pub fn get_at(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|token| now + self.skew < token.expires_at)
            .map(|token| token.value.clone())
    }

    /// Replace the cached token
    pub fn store(&self, token: CachedToken) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(token);
    }

    /// Drop the cached token (e.g., after the provider answered 401)
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Return the cached token, fetching and storing a new one if expired
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> BookingResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BookingResult<CachedToken>>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let token = fetch().await?;
        let value = token.value.clone();
        self.store(token);
        Ok(value)
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
