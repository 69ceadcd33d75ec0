//! Response DTOs for the quote API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One side of a quote: an amount of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub amount: f64,
    pub token: String,
}

impl TokenAmount {
    pub fn new(amount: f64, token: impl Into<String>) -> Self {
        Self {
            amount,
            token: token.into(),
        }
    }
}

/// Response body for the quote endpoint (GET /).
///
/// A quote is immutable once built; cached copies are cloned out of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub input: TokenAmount,
    pub output: TokenAmount,
    /// Output amount divided by input amount
    pub exchange_rate: f64,
    /// Capture time in RFC 3339
    pub timestamp: String,
}

impl Quote {
    /// Creates a quote captured at `captured_at`.
    pub fn new(
        input: TokenAmount,
        output: TokenAmount,
        exchange_rate: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            input,
            output,
            exchange_rate,
            timestamp: captured_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status, always "ok" while the server answers
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
