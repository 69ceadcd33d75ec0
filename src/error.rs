//! Error types for the quote server
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chromiumoxide::error::CdpError;
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error Enum ==
/// Failure of a single scrape. The handler does not tell these apart: every
/// variant becomes a 500 carrying the display text.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Browser process could not be started
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Navigation, selector or DevTools protocol failure
    #[error("browser error: {0}")]
    Browser(String),

    /// Overall deadline elapsed
    #[error("quote fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Scraped text is not a decimal number
    #[error("failed to parse {field} amount {value:?}")]
    Parse { field: &'static str, value: String },

    /// Page read back a zero input, no rate can be derived
    #[error("swap page reported a zero input amount")]
    ZeroInput,
}

impl From<CdpError> for FetchError {
    fn from(err: CdpError) -> Self {
        FetchError::Browser(err.to_string())
    }
}

// == Quote Error Enum ==
/// Unified error type for the quote endpoint.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// One of input, output or amount is absent or empty
    #[error("input, output, and amount parameters are required")]
    MissingParameters,

    /// Symbol not present in the token registry
    #[error("unsupported {side} token: {symbol}")]
    UnsupportedToken { side: &'static str, symbol: String },

    /// Amount is not a positive decimal
    #[error("invalid amount: {0} (must be a positive decimal number)")]
    InvalidAmount(String),

    /// Scrape failed, message passed through as is
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl QuoteError {
    pub fn unsupported_input(symbol: impl Into<String>) -> Self {
        QuoteError::UnsupportedToken {
            side: "input",
            symbol: symbol.into(),
        }
    }

    pub fn unsupported_output(symbol: impl Into<String>) -> Self {
        QuoteError::UnsupportedToken {
            side: "output",
            symbol: symbol.into(),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            QuoteError::MissingParameters
            | QuoteError::UnsupportedToken { .. }
            | QuoteError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            QuoteError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for QuoteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the quote server.
pub type Result<T> = std::result::Result<T, QuoteError>;
