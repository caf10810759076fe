//! Layered content acquisition.
//!
//! Strategies run strictly in order and each later one only runs when the
//! earlier ones produced nothing usable:
//!
//! 1. direct HTTP with browser headers
//! 2. `curl` subprocess with a search-engine referer
//! 3. JS-rendering proxy (only when an API key is configured)
//! 4. newest Wayback Machine capture
//!
//! Output of every strategy passes through [`is_challenge`] before it is
//! accepted, so a bot interstitial is never handed to the extractors.

mod archive;
mod challenge;
mod proxy;

pub use archive::{latest_timestamp, DEFAULT_ARCHIVE_BASE_URL};
pub use challenge::is_challenge;
pub use proxy::DEFAULT_PROXY_BASE_URL;

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::error::{ExtractError, FetchError};
use crate::http::{
    browser_headers, CurlClient, FetchRequest, HttpClient, ReqwestClient, DEFAULT_USER_AGENT,
    SEARCH_REFERER,
};
use crate::types::{FetchAttempt, FetchStrategy};

/// Timeouts, credentials and endpoints for the fetch strategies.
#[derive(Clone, Debug)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub curl_path: String,
    pub scraper_api_key: Option<String>,
    pub proxy_base_url: String,
    pub archive_base_url: String,
    pub direct_timeout: Duration,
    pub subprocess_timeout: Duration,
    pub proxy_timeout: Duration,
    pub archive_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            curl_path: "curl".to_string(),
            scraper_api_key: None,
            proxy_base_url: DEFAULT_PROXY_BASE_URL.to_string(),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            direct_timeout: Duration::from_secs(10),
            subprocess_timeout: Duration::from_secs(15),
            proxy_timeout: Duration::from_secs(30),
            archive_timeout: Duration::from_secs(8),
        }
    }
}

impl FetcherConfig {
    /// Defaults overridden by environment variables:
    /// - `PANTRY_USER_AGENT`
    /// - `PANTRY_CURL_PATH`
    /// - `SCRAPER_API_KEY`: enables the rendering proxy
    /// - `PANTRY_ARCHIVE_BASE_URL`
    pub fn from_env() -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            user_agent: env("PANTRY_USER_AGENT").unwrap_or(defaults.user_agent),
            curl_path: env("PANTRY_CURL_PATH").unwrap_or(defaults.curl_path),
            scraper_api_key: env("SCRAPER_API_KEY"),
            archive_base_url: env("PANTRY_ARCHIVE_BASE_URL").unwrap_or(defaults.archive_base_url),
            ..defaults
        }
    }
}

/// Builder for [`ContentFetcher`].
#[derive(Default)]
pub struct FetcherBuilder {
    config: FetcherConfig,
    direct: Option<Arc<dyn HttpClient>>,
    subprocess: Option<Arc<dyn HttpClient>>,
}

impl FetcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from environment configuration.
    pub fn from_env() -> Self {
        Self {
            config: FetcherConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Client for the direct, proxy and archive strategies.
    pub fn direct_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.direct = Some(client);
        self
    }

    /// Client for the subprocess strategy.
    pub fn subprocess_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.subprocess = Some(client);
        self
    }

    pub fn scraper_api_key(mut self, key: Option<String>) -> Self {
        self.config.scraper_api_key = key;
        self
    }

    pub fn archive_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.archive_base_url = url.into();
        self
    }

    /// Build the fetcher, defaulting to reqwest and the configured curl binary.
    pub fn build(self) -> Result<ContentFetcher, FetchError> {
        let direct: Arc<dyn HttpClient> = match self.direct {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new()?),
        };
        let subprocess: Arc<dyn HttpClient> = match self.subprocess {
            Some(client) => client,
            None => Arc::new(CurlClient::new(self.config.curl_path.clone())),
        };

        Ok(ContentFetcher {
            config: self.config,
            direct,
            subprocess,
        })
    }
}

/// Usable page HTML plus how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub html: String,
    pub strategy: FetchStrategy,
    pub attempts: Vec<FetchAttempt>,
}

pub struct ContentFetcher {
    config: FetcherConfig,
    direct: Arc<dyn HttpClient>,
    subprocess: Arc<dyn HttpClient>,
}

impl ContentFetcher {
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::new()
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Client used for plain HTTP calls (oEmbed, watch pages, transcripts).
    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.direct)
    }

    /// Acquire non-empty, non-challenged HTML for `url` or fail with
    /// [`ExtractError::AcquisitionFailed`].
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, ExtractError> {
        let url = validate_url(url)?;
        let span = tracing::info_span!("fetch", url = %url);
        self.run_strategies(&url).instrument(span).await
    }

    async fn run_strategies(&self, url: &str) -> Result<FetchOutcome, ExtractError> {
        let mut attempts = Vec::new();

        let acquired = match self.fetch_direct(url).await {
            Ok(html) => Some((html, FetchStrategy::Direct)),
            Err(reason) => {
                tracing::debug!(%reason, "direct fetch failed");
                attempts.push(FetchAttempt::failed(FetchStrategy::Direct, reason));
                match self.fetch_subprocess(url).await {
                    Ok(html) => Some((html, FetchStrategy::Subprocess)),
                    Err(reason) => {
                        tracing::debug!(%reason, "subprocess fetch failed");
                        attempts.push(FetchAttempt::failed(FetchStrategy::Subprocess, reason));
                        None
                    }
                }
            }
        };

        if let Some((html, strategy)) = acquired {
            if !is_challenge(&html) {
                return Ok(accept(html, strategy, attempts));
            }
            tracing::info!(strategy = strategy.as_str(), "bot challenge detected");
            attempts.push(FetchAttempt::failed(strategy, "bot challenge detected"));
        }

        match self.fetch_proxy(url).await {
            Ok(html) => return Ok(accept(html, FetchStrategy::RenderingProxy, attempts)),
            Err(reason) => {
                tracing::debug!(%reason, "rendering proxy skipped or failed");
                attempts.push(FetchAttempt::failed(FetchStrategy::RenderingProxy, reason));
            }
        }

        match self.fetch_archive(url).await {
            Ok(html) => return Ok(accept(html, FetchStrategy::Archive, attempts)),
            Err(reason) => {
                tracing::debug!(%reason, "archive fetch failed");
                attempts.push(FetchAttempt::failed(FetchStrategy::Archive, reason));
            }
        }

        tracing::warn!(attempts = attempts.len(), "all fetch strategies exhausted");
        Err(ExtractError::AcquisitionFailed {
            url: url.to_string(),
        })
    }

    async fn fetch_direct(&self, url: &str) -> Result<String, String> {
        let request = FetchRequest::get(url, self.config.direct_timeout)
            .with_headers(browser_headers(&self.config.user_agent));
        let response = self.direct.fetch(&request).await.map_err(|e| e.to_string())?;
        usable_body(response.status, response.body)
    }

    async fn fetch_subprocess(&self, url: &str) -> Result<String, String> {
        let request = FetchRequest::get(url, self.config.subprocess_timeout)
            .with_headers(browser_headers(&self.config.user_agent))
            .header("Referer", SEARCH_REFERER);
        let response = self
            .subprocess
            .fetch(&request)
            .await
            .map_err(|e| e.to_string())?;
        usable_body(response.status, response.body)
    }

    async fn fetch_proxy(&self, url: &str) -> Result<String, String> {
        let Some(api_key) = self.config.scraper_api_key.as_deref() else {
            return Err("not configured".to_string());
        };

        let html = proxy::fetch_rendered(
            self.direct.as_ref(),
            &self.config.proxy_base_url,
            api_key,
            url,
            self.config.proxy_timeout,
        )
        .await
        .map_err(|e| redact_key(&e.to_string(), api_key))?;

        checked(html)
    }

    async fn fetch_archive(&self, url: &str) -> Result<String, String> {
        let html = archive::fetch_snapshot(
            self.direct.as_ref(),
            &self.config.archive_base_url,
            url,
            self.config.archive_timeout,
        )
        .await
        .map_err(|e| e.to_string())?;

        checked(html)
    }
}

fn accept(html: String, strategy: FetchStrategy, mut attempts: Vec<FetchAttempt>) -> FetchOutcome {
    tracing::info!(strategy = strategy.as_str(), bytes = html.len(), "page acquired");
    attempts.push(FetchAttempt::succeeded(strategy));
    FetchOutcome {
        html,
        strategy,
        attempts,
    }
}

fn usable_body(status: u16, body: String) -> Result<String, String> {
    if !(200..300).contains(&status) {
        return Err(format!("HTTP {status}"));
    }
    if body.trim().is_empty() {
        return Err("empty body".to_string());
    }
    Ok(body)
}

/// Attempt errors end up in reports, so the proxy key never appears in them.
fn redact_key(reason: &str, api_key: &str) -> String {
    if api_key.is_empty() {
        reason.to_string()
    } else {
        reason.replace(api_key, "[redacted]")
    }
}

fn checked(html: String) -> Result<String, String> {
    if html.trim().is_empty() {
        Err("empty body".to_string())
    } else if is_challenge(&html) {
        Err("bot challenge detected".to_string())
    } else {
        Ok(html)
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(url: &str) -> Result<String, ExtractError> {
    let trimmed = url.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ExtractError::InvalidInput(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ExtractError::InvalidInput(format!(
            "{trimmed}: only http and https URLs are supported"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockClient, MockResponse};

    const PAGE: &str = "https://example.com/recipes/pie";
    const RECIPE_HTML: &str = "<html><body><h1>Pie</h1></body></html>";
    const CHALLENGE_HTML: &str = "<html><title>Just a moment...</title>\
        <script src=\"/cdn-cgi/challenge-platform/scripts/jsd/main.js\"></script></html>";

    fn fetcher(direct: MockClient, subprocess: MockClient, api_key: Option<&str>) -> ContentFetcher {
        ContentFetcher::builder()
            .direct_client(Arc::new(direct))
            .subprocess_client(Arc::new(subprocess))
            .scraper_api_key(api_key.map(str::to_string))
            .build()
            .unwrap()
    }

    fn strategies(outcome: &FetchOutcome) -> Vec<(FetchStrategy, bool)> {
        outcome
            .attempts
            .iter()
            .map(|a| (a.strategy, a.success))
            .collect()
    }

    #[tokio::test]
    async fn test_direct_success() {
        let direct = MockClient::new().with_html(PAGE, RECIPE_HTML);
        let outcome = fetcher(direct, MockClient::new(), None)
            .fetch(PAGE)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, FetchStrategy::Direct);
        assert_eq!(outcome.html, RECIPE_HTML);
        assert_eq!(strategies(&outcome), vec![(FetchStrategy::Direct, true)]);
    }

    #[tokio::test]
    async fn test_direct_sends_browser_headers() {
        let direct = Arc::new(MockClient::new().with_html(PAGE, RECIPE_HTML));
        let fetcher = ContentFetcher::builder()
            .direct_client(direct.clone())
            .subprocess_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();
        fetcher.fetch(PAGE).await.unwrap();

        let request = &direct.requests()[0];
        assert_eq!(request.header_value("user-agent"), Some(DEFAULT_USER_AGENT));
        assert!(request.header_value("accept-language").is_some());
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_non_2xx_falls_back_to_subprocess() {
        let direct = MockClient::new().with_response(PAGE, MockResponse::Status(403, "nope".into()));
        let subprocess = Arc::new(MockClient::new().with_html(PAGE, RECIPE_HTML));
        let fetcher = ContentFetcher::builder()
            .direct_client(Arc::new(direct))
            .subprocess_client(subprocess.clone())
            .build()
            .unwrap();

        let outcome = fetcher.fetch(PAGE).await.unwrap();
        assert_eq!(outcome.strategy, FetchStrategy::Subprocess);
        assert_eq!(outcome.attempts[0].error.as_deref(), Some("HTTP 403"));

        let request = &subprocess.requests()[0];
        assert_eq!(request.header_value("referer"), Some(SEARCH_REFERER));
        assert_eq!(request.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_empty_body_falls_back_to_subprocess() {
        let direct = MockClient::new().with_html(PAGE, "   ");
        let subprocess = MockClient::new().with_html(PAGE, RECIPE_HTML);
        let outcome = fetcher(direct, subprocess, None).fetch(PAGE).await.unwrap();
        assert_eq!(outcome.strategy, FetchStrategy::Subprocess);
    }

    #[tokio::test]
    async fn test_challenge_with_http_200_goes_to_proxy() {
        let direct = MockClient::new()
            .with_html(PAGE, CHALLENGE_HTML)
            .with_prefix(DEFAULT_PROXY_BASE_URL, MockResponse::Html(RECIPE_HTML.into()));
        let outcome = fetcher(direct, MockClient::new(), Some("key"))
            .fetch(PAGE)
            .await
            .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::RenderingProxy);
        assert_eq!(
            strategies(&outcome),
            vec![
                (FetchStrategy::Direct, false),
                (FetchStrategy::RenderingProxy, true)
            ]
        );
        assert_eq!(
            outcome.attempts[0].error.as_deref(),
            Some("bot challenge detected")
        );
    }

    #[tokio::test]
    async fn test_challenged_proxy_result_falls_to_archive() {
        let direct = MockClient::new()
            .with_html(PAGE, CHALLENGE_HTML)
            .with_prefix(DEFAULT_PROXY_BASE_URL, MockResponse::Html(CHALLENGE_HTML.into()))
            .with_prefix(
                "https://web.archive.org/cdx/",
                MockResponse::Html(r#"[["20240101000000"]]"#.into()),
            )
            .with_html(
                "https://web.archive.org/web/20240101000000id_/https://example.com/recipes/pie",
                RECIPE_HTML,
            );
        let outcome = fetcher(direct, MockClient::new(), Some("key"))
            .fetch(PAGE)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, FetchStrategy::Archive);
        assert_eq!(outcome.html, RECIPE_HTML);
    }

    #[tokio::test]
    async fn test_proxy_skipped_without_key() {
        let direct = Arc::new(
            MockClient::new()
                .with_html(PAGE, CHALLENGE_HTML)
                .with_prefix(
                    "https://web.archive.org/cdx/",
                    MockResponse::Html(r#"[["20240101000000"]]"#.into()),
                )
                .with_prefix("https://web.archive.org/web/", MockResponse::Html(RECIPE_HTML.into())),
        );
        let fetcher = ContentFetcher::builder()
            .direct_client(direct.clone())
            .subprocess_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();

        let outcome = fetcher.fetch(PAGE).await.unwrap();
        assert_eq!(outcome.strategy, FetchStrategy::Archive);
        assert!(direct
            .requested_urls()
            .iter()
            .all(|u| !u.starts_with(DEFAULT_PROXY_BASE_URL)));
        let proxy_attempt = outcome
            .attempts
            .iter()
            .find(|a| a.strategy == FetchStrategy::RenderingProxy)
            .unwrap();
        assert_eq!(proxy_attempt.error.as_deref(), Some("not configured"));
    }

    #[tokio::test]
    async fn test_proxy_failure_does_not_leak_api_key() {
        // No mock for the proxy URL, so the failure text names the full request URL
        let direct = MockClient::new()
            .with_html(PAGE, CHALLENGE_HTML)
            .with_prefix(
                "https://web.archive.org/cdx/",
                MockResponse::Html(r#"[["20240101000000"]]"#.into()),
            )
            .with_prefix("https://web.archive.org/web/", MockResponse::Html(RECIPE_HTML.into()));
        let outcome = fetcher(direct, MockClient::new(), Some("SECRETKEY123"))
            .fetch(PAGE)
            .await
            .unwrap();

        assert_eq!(outcome.strategy, FetchStrategy::Archive);
        let proxy_error = outcome
            .attempts
            .iter()
            .find(|a| a.strategy == FetchStrategy::RenderingProxy)
            .and_then(|a| a.error.clone())
            .unwrap();
        assert!(proxy_error.contains("[redacted]"), "{proxy_error}");
        let report = serde_json::to_string(&outcome.attempts).unwrap();
        assert!(!report.contains("SECRETKEY123"));
    }

    #[tokio::test]
    async fn test_challenged_archive_is_rejected() {
        let direct = MockClient::new()
            .with_error(PAGE, "connection reset")
            .with_prefix(
                "https://web.archive.org/cdx/",
                MockResponse::Html(r#"[["20240101000000"]]"#.into()),
            )
            .with_prefix("https://web.archive.org/web/", MockResponse::Html(CHALLENGE_HTML.into()));
        let result = fetcher(direct, MockClient::new(), None).fetch(PAGE).await;
        assert!(matches!(result, Err(ExtractError::AcquisitionFailed { .. })));
    }

    #[tokio::test]
    async fn test_exhausted_strategies_fail_with_manual_entry_message() {
        let direct = MockClient::new()
            .with_response(PAGE, MockResponse::Timeout)
            .with_prefix("https://web.archive.org/", MockResponse::Html("[]".into()));
        let subprocess = MockClient::new().with_error(PAGE, "curl exited with 35");

        let err = fetcher(direct, subprocess, None)
            .fetch(PAGE)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::AcquisitionFailed { .. }));
        assert!(err.user_message().contains("manually"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_fetching() {
        let direct = Arc::new(MockClient::new());
        let fetcher = ContentFetcher::builder()
            .direct_client(direct.clone())
            .subprocess_client(Arc::new(MockClient::new()))
            .build()
            .unwrap();

        for bad in ["ftp://example.com/pie", "not a url", "file:///etc/passwd"] {
            let result = fetcher.fetch(bad).await;
            assert!(matches!(result, Err(ExtractError::InvalidInput(_))), "{bad}");
        }
        assert!(direct.requests().is_empty());
    }
}
