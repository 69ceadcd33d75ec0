//! Kuru Quote - token swap quotes scraped from a swap page
//!
//! Drives a headless browser against the swap page, normalizes the scraped
//! amounts into a quote and caches it for two hours per
//! (input, output, amount) triple.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod registry;

pub use api::AppState;
pub use config::Config;
