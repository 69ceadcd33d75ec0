//! Token Registry Module
//!
//! Static mapping from token symbol to on-chain address, and the swap page
//! URL built from a resolved pair.

use std::collections::HashMap;

// == Token Addresses ==
pub const MON_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const DAK_ADDRESS: &str = "0x0F0BDEbF0F83cD1EE3974779Bcb7315f9808c714";
pub const LBTC_ADDRESS: &str = "0x73a58b73018c1a417534232529b57b99132b13D2";
pub const USDC_ADDRESS: &str = "0xf817257fed379853cDe0fa4F97AB987181B1E5Ea";
pub const WETH_ADDRESS: &str = "0xB5a30b0FDc5EA94A52fDc42e3E9760Cb8449Fb37";
pub const WBTC_ADDRESS: &str = "0xcf5a6076cfa32686c0Df13aBaDa2b40dec133F1d";

/// Symbol table. `wmon` quotes as `mon`, and `usdt` has no route of its own
/// so it shares the `usdc` address.
const TOKENS: &[(&str, &str)] = &[
    ("mon", MON_ADDRESS),
    ("wmon", MON_ADDRESS),
    ("dak", DAK_ADDRESS),
    ("lbtc", LBTC_ADDRESS),
    ("usdc", USDC_ADDRESS),
    ("usdt", USDC_ADDRESS),
    ("eth", WETH_ADDRESS),
    ("wbtc", WBTC_ADDRESS),
];

// == Token Registry ==
/// Read-only symbol to address lookup.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    addresses: HashMap<&'static str, &'static str>,
}

impl TokenRegistry {
    /// Builds the registry from the built-in token table.
    pub fn new() -> Self {
        Self {
            addresses: TOKENS.iter().copied().collect(),
        }
    }

    /// Returns the address for `symbol`. Matching is exact and case-sensitive.
    pub fn address_of(&self, symbol: &str) -> Option<&'static str> {
        self.addresses.get(symbol).copied()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the swap page URL for a resolved address pair.
pub fn swap_url(base_url: &str, from: &str, to: &str) -> String {
    format!("{}?from={}&to={}", base_url.trim_end_matches('/'), from, to)
}
