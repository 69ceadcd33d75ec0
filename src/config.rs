//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default swap page queried for quotes
pub const DEFAULT_SWAP_BASE_URL: &str = "https://kuru.io/swap";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Swap page URL, `?from=<addr>&to=<addr>` is appended
    pub swap_base_url: String,
    /// Hard deadline for one quote fetch, in seconds
    pub fetch_timeout: u64,
    /// Wait after typing the amount before reading the page, in milliseconds.
    /// The page signals nothing when its computation is done, so a too-short
    /// value yields stale or zero outputs.
    pub settle_delay_ms: u64,
    /// Explicit Chrome/Chromium binary, auto-detected when unset
    pub chrome_executable: Option<PathBuf>,
    /// Launch Chrome with `--no-sandbox` (needed when running as root in containers)
    pub browser_no_sandbox: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWAP_BASE_URL` - Swap page URL (default: https://kuru.io/swap)
    /// - `FETCH_TIMEOUT_SECS` - Per-fetch deadline in seconds (default: 30)
    /// - `SETTLE_DELAY_MS` - Settle delay in milliseconds (default: 5000)
    /// - `CHROME_EXECUTABLE` - Path to the browser binary (default: auto-detect)
    /// - `BROWSER_NO_SANDBOX` - Disable the Chrome sandbox (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            swap_base_url: env::var("SWAP_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.swap_base_url),
            fetch_timeout: parse_var("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout),
            settle_delay_ms: parse_var("SETTLE_DELAY_MS").unwrap_or(defaults.settle_delay_ms),
            chrome_executable: env::var_os("CHROME_EXECUTABLE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            browser_no_sandbox: parse_var("BROWSER_NO_SANDBOX")
                .unwrap_or(defaults.browser_no_sandbox),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            swap_base_url: DEFAULT_SWAP_BASE_URL.to_string(),
            fetch_timeout: 30,
            settle_delay_ms: 5000,
            chrome_executable: None,
            browser_no_sandbox: true,
        }
    }
}
