//! Cache Module
//!
//! Provides the in-memory quote cache with lazy TTL expiration, plus the
//! in-flight table used to coalesce concurrent misses.

mod entry;
mod inflight;
mod store;


use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use inflight::InFlight;
pub use store::QuoteCache;

// == Public Constants ==
/// Lifetime of a cached quote
pub const QUOTE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
