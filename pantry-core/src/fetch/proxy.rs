//! JS-rendering scrape proxy (ScraperAPI-style query interface).

use std::time::Duration;

use crate::error::FetchError;
use crate::http::{FetchRequest, HttpClient};

pub const DEFAULT_PROXY_BASE_URL: &str = "https://api.scraperapi.com/";

/// Build the proxy request URL for `target`.
pub fn proxy_url(base_url: &str, api_key: &str, target: &str) -> Result<String, FetchError> {
    let url = url::Url::parse_with_params(
        base_url,
        &[("api_key", api_key), ("url", target), ("render", "true")],
    )
    .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    Ok(url.to_string())
}

/// Fetch `target` through the rendering proxy. Returns the body of a 2xx
/// response; any other status is an error.
pub async fn fetch_rendered(
    client: &dyn HttpClient,
    base_url: &str,
    api_key: &str,
    target: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    let request = FetchRequest::get(proxy_url(base_url, api_key, target)?, timeout);
    let response = client.fetch(&request).await?;
    if !response.is_success() {
        return Err(FetchError::Connection(format!(
            "rendering proxy returned HTTP {}",
            response.status
        )));
    }
    Ok(response.body)
}
