//! # fare-api
//!
//! HTTP API layer for tripfare.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Aggregated flight and hotel search
//! - Quote, payment intent and booking confirmation endpoints, all priced by
//!   the same engine
//! - Webhook handler for payment events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/flights/search` | Search flights |
//! | POST | `/api/v1/hotels/search` | Search hotels |
//! | POST | `/api/v1/pricing/quote` | Price a quote |
//! | POST | `/api/v1/payments/intent` | Create payment intent |
//! | POST | `/api/v1/bookings/confirm` | Confirm booking |
//! | POST | `/webhook/stripe` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
