//! Browser Fetcher
//!
//! Drives a headless Chrome through the DevTools protocol: open the swap
//! page, type the amount, let the page compute, read both amounts back.
//! Every call launches its own browser and tears it down before returning.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use chrono::Utc;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, warn};

use super::normalize::{build_quote, first_meaningful, OUTPUT_PROBES};
use super::QuoteFetcher;
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{Quote, QuoteRequest};

// == Page Selectors ==
/// First amount field on the swap page, where the input amount is typed
const AMOUNT_INPUT: &str = r#"input[data-sentry-element="Input"]"#;

const AMOUNT_INPUT_VISIBLE: &str = r#"(() => {
    const el = document.querySelector('input[data-sentry-element="Input"]');
    return !!el && !el.disabled && el.offsetParent !== null;
})()"#;

const AMOUNT_INPUT_VALUE: &str =
    r#"document.querySelector('input[data-sentry-element="Input"]')?.value ?? """#;

/// Clears the field through the native setter so React sees the change
const CLEAR_INPUT_FN: &str = r#"function() {
    const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set;
    setter.call(this, '');
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Time allowed for an orderly browser shutdown before it is killed
const CLOSE_GRACE: Duration = Duration::from_secs(5);

// == Browser Settings ==
/// Knobs for one browser-driven fetch.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Hard deadline covering launch, navigation and scraping
    pub timeout: Duration,
    /// Fixed wait between typing the amount and reading the output
    pub settle_delay: Duration,
    /// Interval between visibility checks of the amount field
    pub poll_interval: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub no_sandbox: bool,
}

impl BrowserSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            chrome_executable: config.chrome_executable.clone(),
            no_sandbox: config.browser_no_sandbox,
            ..Self::default()
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            chrome_executable: None,
            no_sandbox: true,
        }
    }
}

// == Browser Session ==
/// A browser process owned by one fetch.
///
/// `close` shuts it down in order. If the session is dropped instead (deadline
/// hit mid-launch, request future cancelled) the chromiumoxide `Browser` kills
/// its child on drop and the event loop task is aborted here.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    /// Throwaway profile, removed on drop
    _profile: TempDir,
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self, FetchError> {
        let profile = tempfile::Builder::new()
            .prefix("kuru-quote-profile-")
            .tempdir()
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .request_timeout(settings.timeout)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::Launch)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser event loop stopped");
                    break;
                }
            }
        });

        debug!(profile = %profile.path().display(), "browser launched");
        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "browser did not close cleanly, killing it");
            if let Some(Err(err)) = self.browser.kill().await {
                warn!(error = %err, "failed to kill browser process");
            }
        }
        if let Err(err) = self.browser.wait().await {
            warn!(error = %err, "failed to reap browser process");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

// == Browser Fetcher ==
/// `QuoteFetcher` backed by a fresh headless Chrome per call.
#[derive(Debug, Clone, Default)]
pub struct BrowserFetcher {
    settings: BrowserSettings,
}

impl BrowserFetcher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    /// Runs the page interaction and returns the raw (input, output) texts.
    async fn scrape(
        &self,
        session: &BrowserSession,
        amount: &str,
        target_url: &str,
    ) -> Result<(String, String), FetchError> {
        debug!(url = target_url, "opening swap page");
        let page = session.browser.new_page(target_url).await?;

        self.wait_for_amount_input(&page).await?;

        let input = page.find_element(AMOUNT_INPUT).await?;
        input.click().await?;
        input.call_js_fn(CLEAR_INPUT_FN, false).await?;
        input.type_str(amount).await?;

        debug!(
            settle_ms = self.settings.settle_delay.as_millis() as u64,
            "amount typed, waiting for the page to settle"
        );
        sleep(self.settings.settle_delay).await;

        let raw_input = evaluate_string(&page, AMOUNT_INPUT_VALUE).await?;
        let raw_output =
            first_meaningful(OUTPUT_PROBES, |script| evaluate_string(&page, script)).await?;

        debug!(raw_input = %raw_input, raw_output = %raw_output, "amounts read from page");
        Ok((raw_input, raw_output))
    }

    /// Polls until the amount field is rendered and visible. Bounded only by
    /// the caller's deadline.
    async fn wait_for_amount_input(&self, page: &Page) -> Result<(), FetchError> {
        loop {
            match page.evaluate(AMOUNT_INPUT_VISIBLE).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return Ok(());
                    }
                }
                // Context is torn down while the page is still navigating
                Err(err) => debug!(error = %err, "visibility check failed, retrying"),
            }
            sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl QuoteFetcher for BrowserFetcher {
    async fn fetch(&self, request: &QuoteRequest, target_url: &str) -> Result<Quote, FetchError> {
        let limit = self.settings.timeout;
        let deadline = Instant::now() + limit;

        let session = timeout_at(deadline, BrowserSession::launch(&self.settings))
            .await
            .map_err(|_| FetchError::Timeout(limit))??;

        let scraped = timeout_at(deadline, self.scrape(&session, &request.amount, target_url)).await;

        if timeout(CLOSE_GRACE, session.close()).await.is_err() {
            warn!("browser shutdown timed out, process killed on drop");
        }

        let (raw_input, raw_output) = scraped.map_err(|_| FetchError::Timeout(limit))??;
        build_quote(request, &raw_input, &raw_output, Utc::now())
    }
}

/// Evaluates `script` and returns its string result. Protocol failures and
/// non-string results are errors carrying the browser's message.
async fn evaluate_string(page: &Page, script: &'static str) -> Result<String, FetchError> {
    page.evaluate(script)
        .await?
        .into_value::<String>()
        .map_err(|e| FetchError::Browser(e.to_string()))
}
