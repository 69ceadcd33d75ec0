//! Scrape Normalization
//!
//! Turns the raw text read from the swap page into a validated quote:
//! output probe selection, decimal parsing, per-token flooring and the
//! exchange rate.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::FetchError;
use crate::models::{Quote, QuoteRequest, TokenAmount};

/// Decimal places kept for tokens without an entry in the precision table
pub const DEFAULT_DECIMALS: u32 = 2;

/// Value the primary probe yields when it finds nothing
const EMPTY_OUTPUT: &str = "0";

// == Output Probes ==
/// One way of locating the output amount on the page.
#[derive(Debug, Clone, Copy)]
pub struct OutputProbe {
    pub name: &'static str,
    /// Expression evaluating to the output field's value
    pub script: &'static str,
    /// A failed evaluation is skipped instead of failing the fetch
    pub lenient: bool,
}

/// Output lookup order. The page markup is not stable, so the positional
/// query over placeholder inputs is tried first and the structural
/// `SwapInput` query second.
pub const OUTPUT_PROBES: &[OutputProbe] = &[
    OutputProbe {
        name: "placeholder",
        script: r#"Array.from(document.querySelectorAll('input[data-sentry-element="Input"]')).filter(el => el.placeholder === "0.00")[1]?.value || "0""#,
        lenient: false,
    },
    OutputProbe {
        name: "swap-input",
        script: r#"document.querySelector('div[data-sentry-component="SwapInput"]:nth-of-type(2) input[data-sentry-element="Input"]')?.value ?? """#,
        lenient: true,
    },
];

/// True for a reading that carries an actual amount.
pub fn is_meaningful(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0"
}

/// Runs `probes` in order and returns the first meaningful reading, or "0"
/// when every probe comes back empty or zero.
///
/// An evaluation error from a strict probe ends the search with that error;
/// one from a lenient probe is logged and treated as an empty reading.
pub async fn first_meaningful<F, Fut>(
    probes: &'static [OutputProbe],
    mut read: F,
) -> Result<String, FetchError>
where
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = Result<String, FetchError>>,
{
    for probe in probes {
        match read(probe.script).await {
            Ok(value) if is_meaningful(&value) => {
                tracing::debug!(probe = probe.name, value = %value, "output amount found");
                return Ok(value);
            }
            Ok(value) => {
                tracing::debug!(probe = probe.name, value = %value, "output probe gave no amount");
            }
            Err(err) if probe.lenient => {
                tracing::debug!(probe = probe.name, error = %err, "output probe failed, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(EMPTY_OUTPUT.to_string())
}

// == Precision ==
/// Decimal places kept for an output token.
pub fn decimals_for(symbol: &str) -> u32 {
    match symbol {
        "lbtc" | "wbtc" => 8,
        "eth" => 5,
        "usdc" | "usdt" => 2,
        _ => DEFAULT_DECIMALS,
    }
}

/// Floors `value` to `decimals` places. Never rounds up, so a quote never
/// overstates what the swap would return.
pub fn floor_to(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToNegativeInfinity)
}

// == Parsing ==
/// Parses scraped text as a decimal number.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<Decimal, FetchError> {
    raw.trim().parse::<Decimal>().map_err(|_| FetchError::Parse {
        field,
        value: raw.to_string(),
    })
}

fn to_f64(field: &'static str, value: Decimal) -> Result<f64, FetchError> {
    value.to_f64().ok_or_else(|| FetchError::Parse {
        field,
        value: value.to_string(),
    })
}

// == Quote Assembly ==
/// Builds a quote from the input and output text read back from the page.
pub fn build_quote(
    request: &QuoteRequest,
    raw_input: &str,
    raw_output: &str,
    captured_at: DateTime<Utc>,
) -> Result<Quote, FetchError> {
    let input_amount = parse_amount("input", raw_input)?;
    let output_amount = parse_amount("output", raw_output)?;

    let output_amount = floor_to(output_amount, decimals_for(&request.output));
    let exchange_rate = output_amount
        .checked_div(input_amount)
        .ok_or(FetchError::ZeroInput)?;

    Ok(Quote::new(
        TokenAmount::new(to_f64("input", input_amount)?, request.input.as_str()),
        TokenAmount::new(to_f64("output", output_amount)?, request.output.as_str()),
        to_f64("exchange rate", exchange_rate)?,
        captured_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_precision_table() {
        assert_eq!(decimals_for("lbtc"), 8);
        assert_eq!(decimals_for("wbtc"), 8);
        assert_eq!(decimals_for("eth"), 5);
        assert_eq!(decimals_for("usdc"), 2);
        assert_eq!(decimals_for("usdt"), 2);
        assert_eq!(decimals_for("mon"), 2);
        assert_eq!(decimals_for("dak"), 2);
    }

    #[test]
    fn test_floor_eight_decimals() {
        assert_eq!(floor_to(dec("0.123456789"), decimals_for("wbtc")), dec("0.12345678"));
    }

    #[test]
    fn test_floor_two_decimals_never_rounds_up() {
        assert_eq!(floor_to(dec("99.999"), decimals_for("usdc")), dec("99.99"));
        assert_eq!(floor_to(dec("0.29"), 2), dec("0.29"));
        assert_eq!(floor_to(dec("1.5"), 5), dec("1.5"));
    }

    #[test]
    fn test_parse_amount_trims_whitespace() {
        assert_eq!(parse_amount("input", "  12.5\n").unwrap(), dec("12.5"));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        let err = parse_amount("output", "1,234.5").unwrap_err();
        assert!(matches!(err, FetchError::Parse { field: "output", .. }));
        assert!(parse_amount("output", "").is_err());
    }

    #[test]
    fn test_build_quote() {
        let request = QuoteRequest::new("mon", "wbtc", "10");
        let quote = build_quote(&request, "10", "0.123456789", Utc::now()).unwrap();

        assert_eq!(quote.input.token, "mon");
        assert_eq!(quote.input.amount, 10.0);
        assert_eq!(quote.output.token, "wbtc");
        assert!((quote.output.amount - 0.12345678).abs() < 1e-12);
        assert!((quote.exchange_rate - 0.012345678).abs() < 1e-12);
        assert!(quote.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_build_quote_uses_read_back_input() {
        // The page may reformat the typed amount
        let request = QuoteRequest::new("usdc", "eth", "1.");
        let quote = build_quote(&request, "1.0", "0.000341239", Utc::now()).unwrap();

        assert_eq!(quote.input.amount, 1.0);
        assert!((quote.output.amount - 0.00034).abs() < 1e-12);
    }

    #[test]
    fn test_build_quote_zero_input() {
        let request = QuoteRequest::new("mon", "usdc", "1");
        let err = build_quote(&request, "0", "3.5", Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::ZeroInput));
    }

    #[test]
    fn test_build_quote_unparseable_output() {
        let request = QuoteRequest::new("mon", "usdc", "1");
        let err = build_quote(&request, "1", "Loading...", Utc::now()).unwrap_err();
        assert!(matches!(err, FetchError::Parse { field: "output", .. }));
    }

    #[test]
    fn test_is_meaningful() {
        assert!(is_meaningful("0.5"));
        assert!(is_meaningful("0.0"));
        assert!(!is_meaningful("0"));
        assert!(!is_meaningful(" "));
        assert!(!is_meaningful(""));
    }

    /// Page state keyed by probe script. `Err` text becomes a browser error.
    fn readings(
        values: &[(usize, std::result::Result<&str, &str>)],
    ) -> HashMap<&'static str, Result<String, FetchError>> {
        values
            .iter()
            .map(|(i, v)| {
                let reading = v
                    .map(String::from)
                    .map_err(|msg| FetchError::Browser(msg.to_string()));
                (OUTPUT_PROBES[*i].script, reading)
            })
            .collect()
    }

    #[test]
    fn test_only_fallback_is_lenient() {
        assert!(!OUTPUT_PROBES[0].lenient);
        assert!(OUTPUT_PROBES[1].lenient);
    }

    #[tokio::test]
    async fn test_primary_probe_wins() {
        let map = readings(&[(0, Ok("3.52")), (1, Ok("9.99"))]);
        let mut calls = 0;
        let value = first_meaningful(OUTPUT_PROBES, |script| {
            calls += 1;
            let reading = map[script].clone();
            async move { reading }
        })
        .await
        .unwrap();

        assert_eq!(value, "3.52");
        assert_eq!(calls, 1, "Fallback should not run when primary succeeds");
    }

    #[tokio::test]
    async fn test_fallback_probe_on_zero() {
        let map = readings(&[(0, Ok("0")), (1, Ok("3.52"))]);
        let value = first_meaningful(OUTPUT_PROBES, |script| {
            let reading = map[script].clone();
            async move { reading }
        })
        .await
        .unwrap();

        assert_eq!(value, "3.52");
    }

    #[tokio::test]
    async fn test_all_probes_empty_yields_zero() {
        let map = readings(&[(0, Ok("0")), (1, Ok(""))]);
        let value = first_meaningful(OUTPUT_PROBES, |script| {
            let reading = map[script].clone();
            async move { reading }
        })
        .await
        .unwrap();

        assert_eq!(value, "0");
    }

    #[tokio::test]
    async fn test_primary_error_is_propagated() {
        let map = readings(&[(0, Err("Execution context was destroyed")), (1, Ok("3.52"))]);
        let mut calls = 0;
        let err = first_meaningful(OUTPUT_PROBES, |script| {
            calls += 1;
            let reading = map[script].clone();
            async move { reading }
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "browser error: Execution context was destroyed");
        assert_eq!(calls, 1, "Fallback must not mask a failed primary read");
    }

    #[tokio::test]
    async fn test_fallback_error_is_skipped() {
        let map = readings(&[(0, Ok("0")), (1, Err("selector is not valid"))]);
        let value = first_meaningful(OUTPUT_PROBES, |script| {
            let reading = map[script].clone();
            async move { reading }
        })
        .await
        .unwrap();

        assert_eq!(value, "0");
    }

    proptest! {
        // Flooring never increases the value and loses less than one unit
        // in the last kept place.
        #[test]
        fn prop_floor_is_conservative(
            mantissa in 0i64..1_000_000_000_000,
            scale in 0u32..12,
            symbol in prop::sample::select(vec!["lbtc", "wbtc", "eth", "usdc", "usdt", "mon", "dak"])
        ) {
            let value = Decimal::new(mantissa, scale);
            let decimals = decimals_for(symbol);
            let floored = floor_to(value, decimals);

            prop_assert!(floored <= value);
            prop_assert!(value - floored < Decimal::new(1, decimals));
            prop_assert!(floored.scale() <= decimals);
        }
    }
}
