//! Cache Entry Module
//!
//! Defines a cached quote together with its absolute expiry instant.

use std::time::{Duration, Instant};

use crate::models::Quote;

// == Cache Entry ==
/// A stored quote and the instant after which it must be treated as absent.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored quote
    pub quote: Quote,
    /// Expiration instant
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(quote: Quote, ttl: Duration) -> Self {
        Self {
            quote,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is valid strictly before `expires_at`; at the boundary
    /// instant it is already expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against an explicit instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
