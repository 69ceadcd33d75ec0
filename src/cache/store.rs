//! Cache Store Module
//!
//! Three-level quote store keyed by input symbol, output symbol and the
//! amount text as submitted, with lazy TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::CacheEntry;
use crate::models::Quote;

type AmountLevel = HashMap<String, CacheEntry>;
type OutputLevel = HashMap<String, AmountLevel>;

// == Quote Cache ==
/// Nested quote storage. Holds no lock itself; the server shares it as
/// `Arc<RwLock<QuoteCache>>` so lookups run concurrently and stores are
/// exclusive.
///
/// Expired entries are never removed. They stay in the map and are reported
/// as misses until the next `set` overwrites them.
#[derive(Debug)]
pub struct QuoteCache {
    /// input symbol -> output symbol -> amount text -> entry
    entries: HashMap<String, OutputLevel>,
    /// Lifetime stamped on every stored quote
    ttl: Duration,
}

impl QuoteCache {
    // == Constructor ==
    /// Creates an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    // == Get ==
    /// Returns the quote stored under the exact key triple, if it has not
    /// expired. The amount is compared as text, so "1" and "1.0" differ.
    pub fn get(&self, input: &str, output: &str, amount: &str) -> Option<Quote> {
        self.entries
            .get(input)?
            .get(output)?
            .get(amount)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.quote.clone())
    }

    // == Set ==
    /// Stores a quote, overwriting any previous entry for the triple and
    /// resetting its expiry to now + TTL. Missing levels are created.
    pub fn set(&mut self, input: &str, output: &str, amount: &str, quote: Quote) {
        let entry = CacheEntry::new(quote, self.ttl);
        self.entries
            .entry(input.to_string())
            .or_default()
            .entry(output.to_string())
            .or_default()
            .insert(amount.to_string(), entry);
    }

    // == Length ==
    /// Returns the number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|outputs| outputs.values())
            .map(|amounts| amounts.len())
            .sum()
    }

    // == Is Empty ==
    /// Returns true if nothing has ever been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(super::QUOTE_TTL)
    }
}
