//! Request DTOs for the quote API
//!
//! Defines the query string of the quote endpoint and its validated form.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{QuoteError, Result};

/// Raw query string of GET /?input=&output=&amount=
///
/// Every field is optional at the extractor level so that a missing
/// parameter surfaces as our own 400 body rather than axum's rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteQuery {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// A validated quote request.
///
/// `amount` keeps the text exactly as submitted: it is both the value typed
/// into the swap page and part of the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub input: String,
    pub output: String,
    pub amount: String,
}

impl QuoteRequest {
    pub fn new(
        input: impl Into<String>,
        output: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            amount: amount.into(),
        }
    }
}

impl QuoteQuery {
    /// Checks that all three parameters are present and non-empty.
    pub fn into_request(self) -> Result<QuoteRequest> {
        match (non_empty(self.input), non_empty(self.output), non_empty(self.amount)) {
            (Some(input), Some(output), Some(amount)) => Ok(QuoteRequest {
                input,
                output,
                amount,
            }),
            _ => Err(QuoteError::MissingParameters),
        }
    }
}

/// Rejects amounts that are not a positive decimal number.
pub fn validate_amount(amount: &str) -> Result<Decimal> {
    let value: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| QuoteError::InvalidAmount(amount.to_string()))?;
    if value <= Decimal::ZERO {
        return Err(QuoteError::InvalidAmount(amount.to_string()));
    }
    Ok(value)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
